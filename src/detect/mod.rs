//! Landmark detection seam.
//!
//! A [`LandmarkDetector`] turns an upright RGBA8 frame into native contour groups, one
//! [`NativeContours`] per face. Detection may hang or be slow on some inputs, so callers go through
//! a [`DetectionWorker`], which treats an overrun as "no faces" and never runs more than one call at
//! a time.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;

use crate::foundation::core::Frame;
use crate::foundation::error::{BitterError, BitterResult};
use crate::landmarks::normalize::{NativeContours, normalize_contours};
use crate::landmarks::scheme::LandmarkSet;

/// Detection deadline for live capture frames.
pub const STREAM_DETECTION_TIMEOUT: Duration = Duration::from_secs(2);
/// Detection deadline for still images and decoded video frames.
pub const FILE_DETECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Finds faces in a frame.
pub trait LandmarkDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> BitterResult<Vec<NativeContours>>;
}

/// Result of one bounded detection call.
#[derive(Debug)]
pub enum DetectionOutcome {
    Faces(Vec<NativeContours>),
    TimedOut,
    Busy,
    Failed(BitterError),
}

impl DetectionOutcome {
    pub fn into_faces(self) -> Vec<NativeContours> {
        match self {
            Self::Faces(f) => f,
            Self::TimedOut | Self::Busy | Self::Failed(_) => Vec::new(),
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

type Reply = mpsc::SyncSender<BitterResult<Vec<NativeContours>>>;

struct Job {
    frame: Arc<Frame>,
    reply: Reply,
}

/// Runs a detector on one long-lived thread with at most one call in flight.
///
/// A call that overruns its deadline keeps the thread busy; frames offered meanwhile come back as
/// [`DetectionOutcome::Busy`] without being queued. The thread is spawned on first use and exits
/// once the worker is dropped and any running call returns.
pub struct DetectionWorker {
    detector: Arc<dyn LandmarkDetector>,
    jobs: Mutex<Option<mpsc::SyncSender<Job>>>,
    busy: Arc<AtomicBool>,
}

impl DetectionWorker {
    pub fn new(detector: Arc<dyn LandmarkDetector>) -> Self {
        Self {
            detector,
            jobs: Mutex::new(None),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn detect(&self, frame: Arc<Frame>, timeout: Duration) -> DetectionOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!("detector busy, frame skipped");
            return DetectionOutcome::Busy;
        }

        let (reply, rx) = mpsc::sync_channel(1);
        if let Err(e) = self.submit(Job { frame, reply }) {
            self.busy.store(false, Ordering::Release);
            return DetectionOutcome::Failed(e);
        }

        match rx.recv_timeout(timeout) {
            Ok(Ok(faces)) => DetectionOutcome::Faces(faces),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "landmark detection failed");
                DetectionOutcome::Failed(e)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::debug!(?timeout, "landmark detection timed out");
                DetectionOutcome::TimedOut
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => DetectionOutcome::Failed(
                BitterError::detection("detection thread exited without a result"),
            ),
        }
    }

    fn submit(&self, job: Job) -> BitterResult<()> {
        let mut jobs = self.jobs.lock();
        if jobs.is_none() {
            *jobs = Some(self.spawn()?);
        }
        let Some(tx) = jobs.as_ref() else {
            return Err(BitterError::detection("detection thread unavailable"));
        };
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::TrySendError::Full(_)) => {
                Err(BitterError::detection("detection queue unexpectedly full"))
            }
            Err(mpsc::TrySendError::Disconnected(_)) => {
                *jobs = None;
                Err(BitterError::detection("detection thread exited"))
            }
        }
    }

    fn spawn(&self) -> BitterResult<mpsc::SyncSender<Job>> {
        let (tx, rx) = mpsc::sync_channel::<Job>(1);
        let detector = self.detector.clone();
        let busy = self.busy.clone();
        std::thread::Builder::new()
            .name("bitterface-detect".into())
            .spawn(move || run_detection(detector.as_ref(), &rx, &busy))
            .map_err(|e| BitterError::detection(format!("failed to spawn detection thread: {e}")))?;
        tracing::debug!("detection thread started");
        Ok(tx)
    }
}

fn run_detection(detector: &dyn LandmarkDetector, jobs: &mpsc::Receiver<Job>, busy: &AtomicBool) {
    while let Ok(job) = jobs.recv() {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| detector.detect(&job.frame)))
            .unwrap_or_else(|_| Err(BitterError::detection("landmark detector panicked")));
        // Clear before the caller can observe the result.
        busy.store(false, Ordering::Release);
        let _ = job.reply.try_send(result);
    }
}

impl std::fmt::Debug for DetectionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionWorker")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

pub fn landmark_sets(faces: &[NativeContours]) -> Vec<LandmarkSet> {
    faces
        .iter()
        .enumerate()
        .filter_map(|(i, native)| {
            let set = normalize_contours(native);
            if set.is_none() {
                tracing::debug!(face = i, "incomplete contours, face skipped");
            }
            set
        })
        .collect()
}

/// Detector that replays a fixed set of faces for every frame.
///
/// Backs the CLI's `--contours` option, where contours come from a JSON export of real detector
/// output. The file holds either one face object or an array of them.
#[derive(Clone, Debug, Default)]
pub struct ContourFileDetector {
    faces: Vec<NativeContours>,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ContourFile {
    One(NativeContours),
    Many(Vec<NativeContours>),
}

impl ContourFileDetector {
    pub fn from_faces(faces: Vec<NativeContours>) -> Self {
        Self { faces }
    }

    pub fn from_json(json: &str) -> BitterResult<Self> {
        let file: ContourFile = serde_json::from_str(json)
            .map_err(|e| BitterError::validation(format!("invalid contour JSON: {e}")))?;
        Ok(Self::from_faces(match file {
            ContourFile::One(f) => vec![f],
            ContourFile::Many(f) => f,
        }))
    }

    pub fn from_path(path: &Path) -> BitterResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read contour file '{}'", path.display()))?;
        Self::from_json(&text)
    }

    pub fn faces(&self) -> &[NativeContours] {
        &self.faces
    }
}

impl LandmarkDetector for ContourFileDetector {
    fn detect(&self, _frame: &Frame) -> BitterResult<Vec<NativeContours>> {
        Ok(self.faces.clone())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/detect/mod.rs"]
mod tests;
