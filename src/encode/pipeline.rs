use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::encode::codec::{
    ContainerWriter, EncodedPacket, EncoderConfig, EncoderOutput, FrameRate, MediaBackend,
    VideoEncoder,
};
use crate::encode::ensure_parent_dir;
use crate::foundation::core::{Frame, PixelFormat};
use crate::foundation::error::{BitterError, BitterResult};
use crate::frame::convert::rgba8_to_yuv420;

/// Longest wait for the end-of-stream packet during [`EncodePipeline::stop`].
pub const EOS_WAIT: Duration = Duration::from_secs(3);
const DRAIN_POLL: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeState {
    Idle,
    Configured,
    Encoding,
    Draining,
    Stopped,
}

/// Counters kept by one [`EncodePipeline`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub frames_fed: u64,
    pub frames_rejected: u64,
    pub samples_written: u64,
    pub dropped_before_start: u64,
    pub codec_config_discarded: u64,
}

pub(crate) struct TempFileGuard(pub(crate) Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Encoder + container writer state machine for one output file.
///
/// `Idle -> configure -> Configured -> feed -> Encoding -> stop -> Draining -> Stopped`. A
/// configure failure or an encoder/writer error moves straight to `Stopped` with every resource
/// released.
pub struct EncodePipeline {
    backend: Arc<dyn MediaBackend>,
    output: PathBuf,
    audio_source: Option<PathBuf>,
    video_path: PathBuf,

    state: EncodeState,
    config: Option<EncoderConfig>,
    encoder: Option<Box<dyn VideoEncoder>>,
    writer: Option<Box<dyn ContainerWriter>>,
    track: Option<usize>,
    last_ts: Option<u64>,
    scratch: Vec<u8>,
    stats: EncodeStats,
}

impl EncodePipeline {
    pub fn new(backend: Arc<dyn MediaBackend>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        Self {
            backend,
            video_path: output.clone(),
            output,
            audio_source: None,
            state: EncodeState::Idle,
            config: None,
            encoder: None,
            writer: None,
            track: None,
            last_ts: None,
            scratch: Vec::new(),
            stats: EncodeStats::default(),
        }
    }

    pub fn with_audio_source(mut self, source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        self.video_path = temp_sibling(&self.output);
        self.audio_source = Some(source);
        self
    }

    pub fn state(&self) -> EncodeState {
        self.state
    }

    pub fn stats(&self) -> EncodeStats {
        self.stats
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn config(&self) -> Option<EncoderConfig> {
        self.config
    }

    /// Acquire an encoder and a writer.
    ///
    /// Any failure releases what was acquired, moves to [`EncodeState::Stopped`] and returns an
    /// [`BitterError::Encode`].
    #[tracing::instrument(skip(self), fields(output = %self.output.display()))]
    pub fn configure(
        &mut self,
        width: u32,
        height: u32,
        bitrate: u32,
        frame_rate: FrameRate,
    ) -> BitterResult<()> {
        if self.state != EncodeState::Idle {
            return Err(BitterError::validation(format!(
                "configure called in state {:?}",
                self.state
            )));
        }
        let config = EncoderConfig {
            width,
            height,
            bitrate,
            frame_rate,
        };
        let res = (|| -> BitterResult<()> {
            config.validate()?;
            ensure_parent_dir(&self.video_path)?;
            self.encoder = Some(self.backend.create_encoder(&config)?);
            self.writer = Some(self.backend.create_writer(&self.video_path)?);
            Ok(())
        })();
        if let Err(e) = res {
            tracing::warn!(error = %e, "encoder configuration failed");
            return Err(self.fail(e));
        }
        self.config = Some(config);
        self.state = EncodeState::Configured;
        Ok(())
    }

    /// Convert an RGBA8 frame to the encoder's layout and submit it.
    ///
    /// Timestamps must strictly increase. A converted frame larger than the encoder's input
    /// capacity is rejected and not submitted.
    pub fn feed(&mut self, frame: &Frame, timestamp_us: u64) -> BitterResult<()> {
        if !matches!(self.state, EncodeState::Configured | EncodeState::Encoding) {
            return Err(BitterError::validation(format!(
                "feed called in state {:?}",
                self.state
            )));
        }
        let Some(config) = self.config else {
            return Err(BitterError::validation("encode pipeline is not configured"));
        };
        if frame.format != PixelFormat::Rgba8 {
            return Err(BitterError::validation(format!(
                "encoder input must be rgba8, got {:?}",
                frame.format
            )));
        }
        if frame.width != config.width || frame.height != config.height {
            return Err(BitterError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, config.width, config.height
            )));
        }
        if let Some(last) = self.last_ts
            && timestamp_us <= last
        {
            return Err(BitterError::validation(format!(
                "timestamps must strictly increase: {timestamp_us} after {last}"
            )));
        }
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(BitterError::validation("encoder already released"));
        };

        rgba8_to_yuv420(
            &frame.data,
            frame.width,
            frame.height,
            encoder.input_layout(),
            &mut self.scratch,
        )?;
        let capacity = encoder.input_capacity();
        if self.scratch.len() > capacity {
            self.stats.frames_rejected += 1;
            return Err(BitterError::validation(format!(
                "converted frame is {} bytes but encoder input capacity is {capacity}",
                self.scratch.len()
            )));
        }

        if let Err(e) = encoder.queue_input(&self.scratch, timestamp_us) {
            return Err(self.fail(e));
        }
        self.last_ts = Some(timestamp_us);
        self.stats.frames_fed += 1;
        self.state = EncodeState::Encoding;
        Ok(())
    }

    /// Move ready encoder output into the writer.
    ///
    /// Non-blocking drains stop at the first "try again later". Blocking drains keep polling
    /// until end of stream or [`EOS_WAIT`]. Returns whether end of stream was seen.
    pub fn drain(&mut self, blocking: bool) -> BitterResult<bool> {
        if !matches!(
            self.state,
            EncodeState::Configured | EncodeState::Encoding | EncodeState::Draining
        ) {
            return Err(BitterError::validation(format!(
                "drain called in state {:?}",
                self.state
            )));
        }
        let deadline = blocking.then(|| Instant::now() + EOS_WAIT);
        match self.drain_until(deadline) {
            Ok(eos) => Ok(eos),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn drain_until(&mut self, deadline: Option<Instant>) -> BitterResult<bool> {
        loop {
            let timeout = if deadline.is_some() {
                DRAIN_POLL
            } else {
                Duration::ZERO
            };
            let Some(encoder) = self.encoder.as_mut() else {
                return Err(BitterError::encode("encoder already released"));
            };
            match encoder.dequeue_output(timeout)? {
                EncoderOutput::TryAgainLater => match deadline {
                    Some(d) if Instant::now() < d => continue,
                    _ => return Ok(false),
                },
                EncoderOutput::FormatChanged(format) => {
                    if self.track.is_some() {
                        return Err(BitterError::encode("encoder output format changed twice"));
                    }
                    let Some(writer) = self.writer.as_mut() else {
                        return Err(BitterError::encode("container writer already released"));
                    };
                    let track = writer.add_track(&format)?;
                    writer.start()?;
                    tracing::debug!(track, mime = %format.mime, "container writer started");
                    self.track = Some(track);
                }
                EncoderOutput::Packet(packet) => {
                    self.write_packet(&packet)?;
                    if packet.flags.end_of_stream {
                        return Ok(true);
                    }
                }
            }
        }
    }

    fn write_packet(&mut self, packet: &EncodedPacket) -> BitterResult<()> {
        if packet.flags.codec_config {
            self.stats.codec_config_discarded += 1;
            return Ok(());
        }
        if packet.data.is_empty() {
            return Ok(());
        }
        match (self.track, self.writer.as_mut()) {
            (Some(track), Some(writer)) => {
                writer.write_sample(track, packet)?;
                self.stats.samples_written += 1;
            }
            _ => self.stats.dropped_before_start += 1,
        }
        Ok(())
    }

    /// Flush the encoder, finalize the container and merge source audio when configured.
    ///
    /// Stopping an idle or already stopped session does nothing.
    #[tracing::instrument(skip(self), fields(output = %self.output.display()))]
    pub fn stop(&mut self) -> BitterResult<()> {
        match self.state {
            EncodeState::Idle | EncodeState::Stopped => {
                self.state = EncodeState::Stopped;
                return Ok(());
            }
            EncodeState::Configured | EncodeState::Encoding | EncodeState::Draining => {}
        }
        self.state = EncodeState::Draining;

        let res = (|| -> BitterResult<()> {
            if let Some(encoder) = self.encoder.as_mut() {
                encoder.queue_end_of_stream()?;
            }
            if !self.drain_until(Some(Instant::now() + EOS_WAIT))? {
                tracing::warn!("encoder did not signal end of stream within {EOS_WAIT:?}");
            }
            let started = self.track.is_some();
            if let Some(mut writer) = self.writer.take()
                && started
            {
                writer.finish()?;
            }
            if let Some(mut encoder) = self.encoder.take() {
                encoder.release();
            }
            if !started {
                return Err(BitterError::encode("no encoded samples were produced"));
            }
            self.merge_audio()
        })();

        match res {
            Ok(()) => {
                self.state = EncodeState::Stopped;
                tracing::info!(
                    frames = self.stats.frames_fed,
                    samples = self.stats.samples_written,
                    "recording finished"
                );
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn abort(&mut self) {
        self.release_all();
        self.state = EncodeState::Stopped;
        for path in [&self.video_path, &self.output] {
            if path.exists() {
                let _ = std::fs::remove_file(path);
            }
        }
    }

    fn merge_audio(&mut self) -> BitterResult<()> {
        let Some(audio) = self.audio_source.as_ref() else {
            return Ok(());
        };
        let _tmp = TempFileGuard(Some(self.video_path.clone()));
        match self.backend.audio_passthrough() {
            Some(passthrough) => passthrough.merge(&self.video_path, audio, &self.output),
            None => {
                tracing::warn!("backend has no audio passthrough; writing video only");
                std::fs::rename(&self.video_path, &self.output).map_err(|e| {
                    BitterError::encode(format!(
                        "failed to move '{}' to '{}': {e}",
                        self.video_path.display(),
                        self.output.display()
                    ))
                })
            }
        }
    }

    fn release_all(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            encoder.release();
        }
        self.writer = None;
    }

    fn fail(&mut self, e: BitterError) -> BitterError {
        self.release_all();
        self.state = EncodeState::Stopped;
        if self.video_path != self.output {
            let _ = std::fs::remove_file(&self.video_path);
        }
        match e {
            BitterError::Encode(_) => e,
            other => BitterError::encode(other.to_string()),
        }
    }
}

impl Drop for EncodePipeline {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl std::fmt::Debug for EncodePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodePipeline")
            .field("output", &self.output)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn temp_sibling(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.mp4".to_string());
    output.with_file_name(format!(".{name}.{}.video.mp4", std::process::id()))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/pipeline.rs"]
mod tests;
