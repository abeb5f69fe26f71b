use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::foundation::error::{BitterError, BitterResult};
use crate::frame::convert::ChromaLayout;

/// Frame rate as an exact ratio, e.g. `30000/1001`.
///
/// Displays as `num/den`, the form `ffmpeg -r` accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub const fn whole(fps: u32) -> Self {
        Self::new(fps, 1)
    }

    pub fn is_valid(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            f64::from(self.num) / f64::from(self.den)
        }
    }

    pub fn timestamp_us(&self, index: u64) -> u64 {
        if self.num == 0 {
            return 0;
        }
        let us = u128::from(index) * 1_000_000 * u128::from(self.den) / u128::from(self.num);
        u64::try_from(us).unwrap_or(u64::MAX)
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Parameters an encoder is opened with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub bitrate: u32,
    pub frame_rate: FrameRate,
}

impl EncoderConfig {
    pub fn validate(&self) -> BitterResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BitterError::validation("encode width/height must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(BitterError::validation(
                "encode width/height must be even (required for 4:2:0 input)",
            ));
        }
        if self.bitrate == 0 {
            return Err(BitterError::validation("encode bitrate must be non-zero"));
        }
        if !self.frame_rate.is_valid() {
            return Err(BitterError::validation(format!(
                "encode frame rate {} must have a non-zero numerator and denominator",
                self.frame_rate
            )));
        }
        Ok(())
    }
}

/// Output track description reported by an encoder before its first data packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackFormat {
    pub mime: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
}

/// Flags attached to an [`EncodedPacket`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacketFlags {
    pub keyframe: bool,
    pub codec_config: bool,
    pub end_of_stream: bool,
}

/// One chunk of compressed output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodedPacket {
    pub data: Vec<u8>,
    pub timestamp_us: u64,
    pub flags: PacketFlags,
}

/// Result of polling an encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncoderOutput {
    TryAgainLater,
    FormatChanged(TrackFormat),
    Packet(EncodedPacket),
}

/// Hardware or software video encoder with a queue-in/dequeue-out contract.
pub trait VideoEncoder: Send {
    fn input_layout(&self) -> ChromaLayout;

    fn input_capacity(&self) -> usize;

    fn queue_input(&mut self, data: &[u8], timestamp_us: u64) -> BitterResult<()>;

    fn queue_end_of_stream(&mut self) -> BitterResult<()>;

    fn dequeue_output(&mut self, timeout: Duration) -> BitterResult<EncoderOutput>;

    fn release(&mut self);
}

/// Container muxer fed with compressed samples.
pub trait ContainerWriter: Send {
    fn add_track(&mut self, format: &TrackFormat) -> BitterResult<usize>;

    fn start(&mut self) -> BitterResult<()>;

    fn write_sample(&mut self, track: usize, packet: &EncodedPacket) -> BitterResult<()>;

    fn finish(&mut self) -> BitterResult<()>;
}

/// Copies the source's audio track next to a finished video track without re-encoding.
pub trait AudioPassthrough: Send + Sync {
    /// Write `output` from the video stream of `video` and the first audio stream of
    /// `audio_source`. Sources without audio produce a video-only output.
    fn merge(&self, video: &Path, audio_source: &Path, output: &Path) -> BitterResult<()>;
}

/// Factory for the platform media stack.
pub trait MediaBackend: Send + Sync {
    fn create_encoder(&self, config: &EncoderConfig) -> BitterResult<Box<dyn VideoEncoder>>;

    fn create_writer(&self, output: &Path) -> BitterResult<Box<dyn ContainerWriter>>;

    fn audio_passthrough(&self) -> Option<Arc<dyn AudioPassthrough>>;
}
