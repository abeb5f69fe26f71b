use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::foundation::core::Frame;

/// Monotonic session generation shared by the orchestrator, feeds and workers.
///
/// Every `start` and `stop` advances it; work stamped with an older value is stale.
#[derive(Clone, Debug, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// A frame tagged with the generation current when it was acquired.
#[derive(Debug)]
pub struct StampedFrame {
    pub generation: u64,
    pub frame: Frame,
}

#[derive(Debug, Default)]
struct SlotState {
    frame: Option<StampedFrame>,
    closed: bool,
    overwritten: u64,
}

/// Single-slot, latest-only hand-off between a capture callback and one worker.
///
/// `put` overwrites any frame the worker has not taken yet; nothing queues.
#[derive(Debug, Default)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, frame: StampedFrame) -> bool {
        let mut st = self.state.lock();
        if st.closed {
            return false;
        }
        if st.frame.replace(frame).is_some() {
            st.overwritten += 1;
        }
        self.ready.notify_one();
        true
    }

    pub fn take(&self) -> Option<StampedFrame> {
        let mut st = self.state.lock();
        loop {
            if st.closed {
                return None;
            }
            if let Some(f) = st.frame.take() {
                return Some(f);
            }
            self.ready.wait(&mut st);
        }
    }

    pub fn take_timeout(&self, timeout: Duration) -> Option<StampedFrame> {
        let mut st = self.state.lock();
        if st.frame.is_none() && !st.closed {
            self.ready.wait_for(&mut st, timeout);
        }
        if st.closed {
            return None;
        }
        st.frame.take()
    }

    pub fn close(&self) {
        let mut st = self.state.lock();
        st.closed = true;
        st.frame = None;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn overwritten(&self) -> u64 {
        self.state.lock().overwritten
    }
}

/// Handle given to a capture source for delivering frames.
#[derive(Clone, Debug)]
pub struct FrameFeed {
    slot: Arc<FrameSlot>,
    generation: Generation,
}

impl FrameFeed {
    pub(crate) fn new(slot: Arc<FrameSlot>, generation: Generation) -> Self {
        Self { slot, generation }
    }

    pub fn offer(&self, frame: Frame) -> bool {
        self.offer_stamped(self.generation.current(), frame)
    }

    pub fn offer_stamped(&self, generation: u64, frame: Frame) -> bool {
        self.slot.put(StampedFrame { generation, frame })
    }

    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/slot.rs"]
mod tests;
