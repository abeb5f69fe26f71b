//! File-level task protocol: ids, cancellation and progress/terminal events.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::foundation::error::{BitterError, BitterResult, ErrorCode};

/// Identifier correlating events with the request that started them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Shared cancel flag polled by a running task between units of work.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn check(&self) -> BitterResult<()> {
        if self.is_cancelled() {
            Err(BitterError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Event delivered to the caller of a file-level task.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    Progress {
        progress: f32,
    },
    Completed {
        output: PathBuf,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl TaskEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Receiver of task events. Implemented for any `Fn(TaskId, TaskEvent)` closure.
pub trait EventSink: Send + Sync {
    fn emit(&self, task: TaskId, event: TaskEvent);
}

impl<F> EventSink for F
where
    F: Fn(TaskId, TaskEvent) + Send + Sync,
{
    fn emit(&self, task: TaskId, event: TaskEvent) {
        self(task, event)
    }
}

#[derive(Debug, Default)]
struct ReporterState {
    last_progress: f32,
    finished: bool,
}

/// Enforces the event protocol for one task.
///
/// Progress is clamped to `[0, 1]` and regressions are dropped. Exactly one terminal event is
/// emitted: later terminal calls are ignored, and a reporter dropped without one emits an
/// `UNKNOWN` error.
pub struct TaskReporter {
    id: TaskId,
    sink: Arc<dyn EventSink>,
    state: Mutex<ReporterState>,
}

impl TaskReporter {
    pub fn new(id: TaskId, sink: Arc<dyn EventSink>) -> Self {
        Self {
            id,
            sink,
            state: Mutex::new(ReporterState::default()),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    pub fn progress(&self, fraction: f32) -> bool {
        if !fraction.is_finite() {
            return false;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        {
            let mut st = self.state.lock();
            if st.finished || fraction < st.last_progress {
                return false;
            }
            st.last_progress = fraction;
        }
        self.sink.emit(self.id, TaskEvent::Progress { progress: fraction });
        true
    }

    pub fn complete(&self, output: PathBuf) -> bool {
        self.terminal(TaskEvent::Completed { output })
    }

    pub fn fail(&self, err: &BitterError) -> bool {
        self.terminal(TaskEvent::Error {
            code: err.code(),
            message: err.to_string(),
        })
    }

    pub fn finish(&self, result: BitterResult<PathBuf>) -> bool {
        match result {
            Ok(path) => self.complete(path),
            Err(e) => self.fail(&e),
        }
    }

    fn terminal(&self, event: TaskEvent) -> bool {
        {
            let mut st = self.state.lock();
            if st.finished {
                tracing::debug!(task = %self.id, ?event, "extra terminal event suppressed");
                return false;
            }
            st.finished = true;
        }
        self.sink.emit(self.id, event);
        true
    }
}

impl Drop for TaskReporter {
    fn drop(&mut self) {
        if !self.state.get_mut().finished {
            self.terminal(TaskEvent::Error {
                code: ErrorCode::Unknown,
                message: "task ended without a result".to_string(),
            });
        }
    }
}

impl std::fmt::Debug for TaskReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskReporter")
            .field("id", &self.id)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../tests/unit/task.rs"]
mod tests;
