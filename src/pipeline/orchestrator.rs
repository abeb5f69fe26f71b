use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{EncodeConfig, PipelineConfig, WarpSettings};
use crate::detect::{DetectionWorker, LandmarkDetector, landmark_sets};
use crate::encode::codec::{FrameRate, MediaBackend};
use crate::encode::pipeline::{EncodePipeline, EncodeState, EncodeStats};
use crate::foundation::core::{Facing, Frame};
use crate::foundation::error::{BitterError, BitterResult};
use crate::frame::orient::normalize_for_processing;
use crate::pipeline::slot::{FrameFeed, FrameSlot, Generation};
use crate::pipeline::surface::{CaptureSource, CaptureSourceFactory, RenderTarget, fill_rect};
use crate::task::TaskReporter;
use crate::warp::engine::{WarpEngine, clamp_intensity};
use crate::warp::styles::WarpStyle;

#[derive(Debug, Default)]
struct PipelineStats {
    received: AtomicU64,
    stale: AtomicU64,
    format_failures: AtomicU64,
    detection_timeouts: AtomicU64,
    detection_skipped: AtomicU64,
    warped: AtomicU64,
    rendered: AtomicU64,
    encode_failures: AtomicU64,
}

/// Point-in-time copy of the orchestrator counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: u64,
    pub stale: u64,
    pub format_failures: u64,
    pub detection_timeouts: u64,
    pub detection_skipped: u64,
    pub warped: u64,
    pub rendered: u64,
    pub encode_failures: u64,
}

fn bump(c: &AtomicU64) {
    c.fetch_add(1, Ordering::Relaxed);
}

impl PipelineStats {
    fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            received: get(&self.received),
            stale: get(&self.stale),
            format_failures: get(&self.format_failures),
            detection_timeouts: get(&self.detection_timeouts),
            detection_skipped: get(&self.detection_skipped),
            warped: get(&self.warped),
            rendered: get(&self.rendered),
            encode_failures: get(&self.encode_failures),
        }
    }
}

struct Recording {
    pipeline: EncodePipeline,
    config: EncodeConfig,
    base_ts: Option<u64>,
    last_ts: Option<u64>,
    failure: Option<BitterError>,
    reporter: TaskReporter,
}

impl Recording {
    fn push(&mut self, frame: &Frame) -> BitterResult<()> {
        let rate = FrameRate::whole(self.config.frame_rate);
        if self.pipeline.state() == EncodeState::Idle {
            self.pipeline
                .configure(frame.width, frame.height, self.config.bitrate, rate)?;
        }
        let interval = rate.timestamp_us(1).max(1);
        let base = *self.base_ts.get_or_insert(frame.timestamp_us);
        let mut ts = frame.timestamp_us.saturating_sub(base);
        if let Some(last) = self.last_ts
            && ts <= last
        {
            ts = last + interval;
        }
        self.pipeline.feed(frame, ts)?;
        self.last_ts = Some(ts);
        self.pipeline.drain(false)?;
        Ok(())
    }
}

struct Shared {
    generation: Generation,
    detector: DetectionWorker,
    engine: WarpEngine,
    warp: Mutex<WarpSettings>,
    detection_timeout: Duration,
    // Render lock: guards the surface and every draw/teardown.
    render: Mutex<Option<Box<dyn RenderTarget>>>,
    latest: Mutex<Option<Arc<Frame>>>,
    recording: Mutex<Option<Recording>>,
    stats: PipelineStats,
}

impl Shared {
    fn is_live(&self, session: u64, stamp: u64) -> bool {
        stamp == session && self.generation.is_current(session)
    }

    fn process(&self, session: u64, stamp: u64, raw: Frame) {
        bump(&self.stats.received);
        if !self.is_live(session, stamp) {
            bump(&self.stats.stale);
            return;
        }

        let frame = match normalize_for_processing(raw) {
            Ok(f) => Arc::new(f),
            Err(e) => {
                tracing::debug!(error = %e, "frame conversion failed, dropped");
                bump(&self.stats.format_failures);
                return;
            }
        };

        let outcome = self.detector.detect(frame.clone(), self.detection_timeout);
        if outcome.timed_out() {
            bump(&self.stats.detection_timeouts);
        } else if outcome.is_busy() {
            bump(&self.stats.detection_skipped);
        }
        if !self.is_live(session, stamp) {
            bump(&self.stats.stale);
            return;
        }

        let faces = landmark_sets(&outcome.into_faces());
        let out = if faces.is_empty() {
            frame
        } else {
            let settings = *self.warp.lock();
            match self
                .engine
                .apply_faces(&frame, &faces, settings.style, settings.intensity)
            {
                Ok(warped) => {
                    bump(&self.stats.warped);
                    Arc::new(warped)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "warp failed, showing unwarped frame");
                    frame
                }
            }
        };

        {
            let mut target = self.render.lock();
            if !self.is_live(session, stamp) {
                bump(&self.stats.stale);
                return;
            }
            *self.latest.lock() = Some(out.clone());
            if let Some(t) = target.as_mut() {
                let (w, h) = t.size();
                match t.draw(&out, fill_rect(out.width, out.height, w, h)) {
                    Ok(()) => bump(&self.stats.rendered),
                    Err(e) => tracing::warn!(error = %e, "draw failed"),
                }
            }
        }

        let mut recording = self.recording.lock();
        if let Some(rec) = recording.as_mut()
            && rec.failure.is_none()
            && let Err(e) = rec.push(&out)
        {
            bump(&self.stats.encode_failures);
            tracing::warn!(error = %e, "recording rejected frame");
            // The pipeline has already released its encoder and writer.
            if rec.pipeline.state() == EncodeState::Stopped {
                rec.reporter.fail(&e);
                rec.failure = Some(e);
            }
        }
    }
}

fn run_worker(shared: Arc<Shared>, slot: Arc<FrameSlot>, session: u64) {
    tracing::debug!(session, "pipeline worker started");
    while let Some(stamped) = slot.take() {
        shared.process(session, stamped.generation, stamped.frame);
    }
    tracing::debug!(session, "pipeline worker exiting");
}

struct Session {
    generation: u64,
    facing: Facing,
    slot: Arc<FrameSlot>,
    source: Box<dyn CaptureSource>,
    worker: JoinHandle<()>,
}

/// Owns one capture session at a time and the worker that turns its frames into warped,
/// rendered and optionally recorded output.
///
/// Every `start` and `stop` advances a generation counter. Frames carry the generation current at
/// acquisition and are checked against it on receipt, after detection and right before drawing,
/// so nothing from a torn-down session reaches the surface.
pub struct PipelineOrchestrator {
    shared: Arc<Shared>,
    factory: Arc<dyn CaptureSourceFactory>,
    backend: Option<Arc<dyn MediaBackend>>,
    session: Option<Session>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: &PipelineConfig,
        factory: Arc<dyn CaptureSourceFactory>,
        detector: Arc<dyn LandmarkDetector>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                generation: Generation::new(),
                detector: DetectionWorker::new(detector),
                engine: WarpEngine::new(),
                warp: Mutex::new(config.warp),
                detection_timeout: config.stream_detection_timeout(),
                render: Mutex::new(None),
                latest: Mutex::new(None),
                recording: Mutex::new(None),
                stats: PipelineStats::default(),
            }),
            factory,
            backend: None,
            session: None,
        }
    }

    pub fn with_media_backend(mut self, backend: Arc<dyn MediaBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Open capture for `facing` and start the worker. Stops a running session first.
    ///
    /// Returns the new session's generation.
    #[tracing::instrument(skip(self))]
    pub fn start(&mut self, facing: Facing) -> BitterResult<u64> {
        if self.session.is_some()
            && let Err(e) = self.stop()
        {
            tracing::warn!(error = %e, "recording ended with an error");
        }
        let generation = self.shared.generation.advance();
        let slot = Arc::new(FrameSlot::new());
        let feed = FrameFeed::new(slot.clone(), self.shared.generation.clone());
        let source = self.factory.open(facing, feed)?;

        let worker = {
            let shared = self.shared.clone();
            let slot = slot.clone();
            std::thread::Builder::new()
                .name(format!("bitterface-worker-{generation}"))
                .spawn(move || run_worker(shared, slot, generation))
        };
        let worker = match worker {
            Ok(w) => w,
            Err(e) => {
                slot.close();
                let mut source = source;
                source.stop();
                return Err(BitterError::Other(anyhow::anyhow!(
                    "failed to spawn pipeline worker: {e}"
                )));
            }
        };

        self.session = Some(Session {
            generation,
            facing,
            slot,
            source,
            worker,
        });
        tracing::info!(generation, ?facing, "pipeline started");
        Ok(generation)
    }

    /// Tear down the running session, if any.
    ///
    /// Invalidates in-flight frames, stops capture, joins the worker (bounded by one detection
    /// timeout), then releases the render target and clears the latest frame under the render
    /// lock. An active recording is finalized and its outcome returned, as with
    /// [`PipelineOrchestrator::stop_recording`].
    #[tracing::instrument(skip(self))]
    pub fn stop(&mut self) -> BitterResult<Option<EncodeStats>> {
        if let Some(session) = self.session.take() {
            self.teardown(session);
        }
        self.stop_recording()
    }

    fn teardown(&self, session: Session) {
        self.shared.generation.advance();
        session.slot.close();
        let mut source = session.source;
        source.stop();
        if session.worker.join().is_err() {
            tracing::warn!("pipeline worker panicked");
        }

        {
            let mut target = self.shared.render.lock();
            if let Some(mut t) = target.take() {
                t.release();
            }
            *self.shared.latest.lock() = None;
        }
        tracing::info!(generation = session.generation, "pipeline stopped");
    }

    /// Stop, then start with the opposite facing.
    ///
    /// A recording active at the switch is finalized; its outcome goes to the recording's reporter.
    pub fn switch(&mut self) -> BitterResult<u64> {
        let facing = self
            .session
            .as_ref()
            .map(|s| s.facing.opposite())
            .unwrap_or_default();
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "recording ended with an error");
        }
        self.start(facing)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn facing(&self) -> Option<Facing> {
        self.session.as_ref().map(|s| s.facing)
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.current()
    }

    #[cfg(test)]
    pub(crate) fn generation_counter(&self) -> Generation {
        self.shared.generation.clone()
    }

    pub fn set_style(&self, style: WarpStyle) {
        self.shared.warp.lock().style = style;
    }

    /// Change the intensity for subsequent frames. Non-finite values are rejected; others are
    /// clamped to `[0, 3]`.
    pub fn set_intensity(&self, intensity: f32) -> BitterResult<()> {
        let clamped = clamp_intensity(intensity)? as f32;
        self.shared.warp.lock().intensity = clamped;
        Ok(())
    }

    pub fn warp_settings(&self) -> WarpSettings {
        *self.shared.warp.lock()
    }

    /// Replace the render surface under the render lock, releasing the previous one.
    ///
    /// `None` detaches the surface; draws become no-ops.
    pub fn set_render_target(&self, target: Option<Box<dyn RenderTarget>>) {
        let mut slot = self.shared.render.lock();
        if let Some(mut old) = slot.take() {
            old.release();
        }
        *slot = target;
    }

    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.shared.latest.lock().clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Begin recording finished frames to `output`. The encoder is configured from the first
    /// frame's size.
    ///
    /// `reporter` receives the recording's terminal event: `ENCODE_FAILED` as soon as the encoder
    /// gives up, or `Completed` once [`PipelineOrchestrator::stop_recording`] finalizes the file.
    #[tracing::instrument(skip(self, config, reporter))]
    pub fn start_recording(
        &self,
        output: PathBuf,
        config: EncodeConfig,
        reporter: TaskReporter,
    ) -> BitterResult<()> {
        let Some(backend) = self.backend.clone() else {
            let err = BitterError::unsupported("no media backend configured");
            reporter.fail(&err);
            return Err(err);
        };
        let mut recording = self.shared.recording.lock();
        if recording.is_some() {
            let err = BitterError::validation("a recording is already active");
            reporter.fail(&err);
            return Err(err);
        }
        *recording = Some(Recording {
            pipeline: EncodePipeline::new(backend, output),
            config,
            base_ts: None,
            last_ts: None,
            failure: None,
            reporter,
        });
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.shared
            .recording
            .lock()
            .as_ref()
            .is_some_and(|r| r.failure.is_none())
    }

    /// Finalize the active recording. Returns `None` when nothing was recording.
    ///
    /// A recording whose encoder failed mid-session returns that failure here. A recording that
    /// never received a frame fails with `ENCODE_FAILED` and leaves no file.
    pub fn stop_recording(&self) -> BitterResult<Option<EncodeStats>> {
        let Some(mut rec) = self.shared.recording.lock().take() else {
            return Ok(None);
        };
        if let Some(err) = rec.failure.take() {
            return Err(err);
        }
        let result = if rec.pipeline.state() == EncodeState::Idle {
            Err(BitterError::encode("recording stopped before any frame arrived"))
        } else {
            rec.pipeline.stop()
        };
        match result {
            Ok(()) => {
                rec.reporter.complete(rec.pipeline.output().to_path_buf());
                Ok(Some(rec.pipeline.stats()))
            }
            Err(e) => {
                rec.reporter.fail(&e);
                Err(e)
            }
        }
    }
}

impl Drop for PipelineOrchestrator {
    fn drop(&mut self) {
        // The recording reporter already carries the outcome.
        let _ = self.stop();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
