use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{PipelineConfig, WarpSettings};
use crate::detect::{DetectionWorker, LandmarkDetector, landmark_sets};
use crate::effect::{ImageRequest, MediaEffect, VideoRequest};
use crate::encode::codec::{FrameRate, MediaBackend};
use crate::encode::ensure_parent_dir;
use crate::encode::pipeline::EncodePipeline;
use crate::foundation::core::Frame;
use crate::foundation::error::{BitterError, BitterResult};
use crate::init::InitState;
use crate::media::{VideoInfo, VideoSource, VideoSourceFactory};
use crate::task::{CancelToken, TaskId, TaskReporter};
use crate::warp::engine::{WarpEngine, clamp_intensity};

struct VideoStack {
    sources: Arc<dyn VideoSourceFactory>,
    backend: Arc<dyn MediaBackend>,
    // The ffmpeg stack needs the tools on PATH; injected stacks do not.
    needs_tools: bool,
}

#[cfg(feature = "media-ffmpeg")]
fn default_video_stack() -> Option<VideoStack> {
    Some(VideoStack {
        sources: Arc::new(crate::media::FfmpegVideoSourceFactory),
        backend: Arc::new(crate::encode::ffmpeg::FfmpegBackend),
        needs_tools: true,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
fn default_video_stack() -> Option<VideoStack> {
    None
}

/// Warps every detected face in still images and video files.
///
/// Detection uses the file deadline from [`PipelineConfig`]; a timed out or failed detection leaves
/// the frame unwarped. Each task runs detection on its own [`DetectionWorker`], so a hung call skips
/// that task's later frames instead of stacking threads. Video jobs poll their cancel flag before
/// every frame.
pub struct BitterFaceEffect {
    detector: Arc<dyn LandmarkDetector>,
    engine: WarpEngine,
    detection_timeout: Duration,
    init: Arc<InitState>,
    video: Option<VideoStack>,
    tasks: Mutex<HashMap<TaskId, CancelToken>>,
}

impl BitterFaceEffect {
    pub const KEY: &'static str = "bitter_face";

    pub fn new(
        config: &PipelineConfig,
        detector: Arc<dyn LandmarkDetector>,
        init: Arc<InitState>,
    ) -> Self {
        Self {
            detector,
            engine: WarpEngine::new(),
            detection_timeout: config.file_detection_timeout(),
            init,
            video: default_video_stack(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_video_stack(
        mut self,
        sources: Arc<dyn VideoSourceFactory>,
        backend: Arc<dyn MediaBackend>,
    ) -> Self {
        self.video = Some(VideoStack {
            sources,
            backend,
            needs_tools: false,
        });
        self
    }

    pub fn active_tasks(&self) -> usize {
        self.tasks.lock().len()
    }

    fn track(&self, task: TaskId) -> CancelToken {
        let token = CancelToken::new();
        if self.tasks.lock().insert(task, token.clone()).is_some() {
            tracing::warn!(%task, "task id reused while still running");
        }
        token
    }

    fn untrack(&self, task: TaskId) {
        self.tasks.lock().remove(&task);
    }

    fn warp_frame(
        &self,
        detection: &DetectionWorker,
        frame: Frame,
        warp: &WarpSettings,
    ) -> BitterResult<Frame> {
        let frame = Arc::new(frame);
        let outcome = detection.detect(frame.clone(), self.detection_timeout);
        if outcome.timed_out() {
            tracing::warn!(timeout = ?self.detection_timeout, "detection timed out; frame left as is");
        } else if outcome.is_busy() {
            tracing::debug!("detector still busy; frame left as is");
        }
        let faces = landmark_sets(&outcome.into_faces());
        self.engine.apply_faces(&frame, &faces, warp.style, warp.intensity)
    }

    fn run_image(&self, request: &ImageRequest, token: &CancelToken) -> BitterResult<PathBuf> {
        clamp_intensity(request.warp.intensity)?;
        let decoded = image::open(&request.input).map_err(|e| {
            BitterError::decode(format!(
                "failed to decode image '{}': {e}",
                request.input.display()
            ))
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let frame = Frame::rgba8(width, height, rgba.into_raw())
            .map_err(|e| BitterError::decode(e.to_string()))?;

        let detection = DetectionWorker::new(self.detector.clone());
        let out = self.warp_frame(&detection, frame, &request.warp)?;
        token.check()?;
        save_image(out, &request.output)?;
        Ok(request.output.clone())
    }

    fn run_video(
        &self,
        request: &VideoRequest,
        token: &CancelToken,
        reporter: &TaskReporter,
    ) -> BitterResult<PathBuf> {
        let Some(stack) = self.video.as_ref() else {
            return Err(BitterError::unsupported(
                "video processing requires the 'media-ffmpeg' feature",
            ));
        };
        if stack.needs_tools {
            self.init.require_video()?;
        }
        clamp_intensity(request.warp.intensity)?;
        token.check()?;

        let mut source = stack.sources.open(&request.input).map_err(into_decode)?;
        let info = source.info().clone();
        let frame_rate = info.frame_rate().unwrap_or_else(|| {
            tracing::debug!("source frame rate unknown, using the configured rate");
            FrameRate::whole(request.encode.frame_rate.max(1))
        });

        let mut encoder = EncodePipeline::new(stack.backend.clone(), &request.output);
        if request.keep_audio && info.has_audio {
            encoder = encoder.with_audio_source(&request.input);
        }
        encoder.configure(info.width, info.height, request.encode.bitrate, frame_rate)?;

        let frames = match self.encode_frames(
            source.as_mut(),
            &info,
            frame_rate,
            &mut encoder,
            request,
            token,
            reporter,
        ) {
            Ok(n) => n,
            Err(e) => {
                encoder.abort();
                return Err(e);
            }
        };
        if let Err(e) = encoder.stop() {
            encoder.abort();
            return Err(e);
        }
        tracing::info!(frames, output = %request.output.display(), "video written");
        Ok(request.output.clone())
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_frames(
        &self,
        source: &mut dyn VideoSource,
        info: &VideoInfo,
        frame_rate: FrameRate,
        encoder: &mut EncodePipeline,
        request: &VideoRequest,
        token: &CancelToken,
        reporter: &TaskReporter,
    ) -> BitterResult<u64> {
        let total = info.estimated_frames();
        let detection = DetectionWorker::new(self.detector.clone());
        let mut index = 0u64;
        loop {
            token.check()?;
            let Some(frame) = source.next_frame().map_err(into_decode)? else {
                break;
            };
            let out = self.warp_frame(&detection, frame, &request.warp)?;
            let ts = frame_rate.timestamp_us(index);
            encoder.feed(&out, ts).map_err(into_encode)?;
            encoder.drain(false).map_err(into_encode)?;
            index += 1;
            if total > 0 {
                reporter.progress(index as f32 / total as f32);
            }
        }
        token.check()?;
        if index == 0 {
            return Err(BitterError::decode(format!(
                "no frames decoded from '{}'",
                info.source_path.display()
            )));
        }
        Ok(index)
    }
}

impl MediaEffect for BitterFaceEffect {
    #[tracing::instrument(skip_all, fields(task = %reporter.id(), input = %request.input.display()))]
    fn process_image(&self, request: &ImageRequest, reporter: TaskReporter) {
        let task = reporter.id();
        let token = self.track(task);
        let result = self.run_image(request, &token);
        self.untrack(task);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "image task failed");
        }
        reporter.finish(result);
    }

    #[tracing::instrument(skip_all, fields(task = %reporter.id(), input = %request.input.display()))]
    fn process_video(&self, request: &VideoRequest, reporter: TaskReporter) {
        let task = reporter.id();
        let token = self.track(task);
        let result = self.run_video(request, &token, &reporter);
        self.untrack(task);
        match &result {
            Err(BitterError::Cancelled) => tracing::info!("video task cancelled"),
            Err(e) => tracing::warn!(error = %e, "video task failed"),
            Ok(_) => {}
        }
        reporter.finish(result);
    }

    fn cancel(&self, task: TaskId) -> bool {
        match self.tasks.lock().get(&task) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for BitterFaceEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitterFaceEffect")
            .field("detection_timeout", &self.detection_timeout)
            .field("video", &self.video.is_some())
            .field("active_tasks", &self.active_tasks())
            .finish_non_exhaustive()
    }
}

fn into_decode(e: BitterError) -> BitterError {
    match e {
        BitterError::Decode(_) | BitterError::Unsupported(_) | BitterError::Cancelled => e,
        other => BitterError::decode(other.to_string()),
    }
}

fn into_encode(e: BitterError) -> BitterError {
    match e {
        BitterError::Encode(_) | BitterError::Cancelled => e,
        other => BitterError::encode(other.to_string()),
    }
}

fn save_image(frame: Frame, path: &Path) -> BitterResult<()> {
    use image::ImageFormat;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let format = match ext.as_deref() {
        Some("png") => ImageFormat::Png,
        Some("jpg" | "jpeg") => ImageFormat::Jpeg,
        _ => {
            return Err(BitterError::encode(format!(
                "unsupported output extension for '{}' (expected .png, .jpg or .jpeg)",
                path.display()
            )));
        }
    };
    ensure_parent_dir(path).map_err(into_encode)?;
    let rgba = image::RgbaImage::from_raw(frame.width, frame.height, frame.data)
        .ok_or_else(|| BitterError::encode("output buffer does not match its dimensions"))?;
    let res = match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => image::DynamicImage::ImageRgba8(rgba)
            .to_rgb8()
            .save_with_format(path, format),
        _ => rgba.save_with_format(path, format),
    };
    res.map_err(|e| BitterError::encode(format!("failed to write '{}': {e}", path.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/effect/bitter_face.rs"]
mod tests;
