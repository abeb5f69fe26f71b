use crate::foundation::error::{BitterError, BitterResult};

pub use kurbo::{Point, Rect, Vec2};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    #[default]
    Front,
    Back,
}

impl Facing {
    pub fn opposite(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

/// Clockwise rotation needed to bring a frame upright.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(deg: i32) -> BitterResult<Self> {
        match deg.rem_euclid(360) {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            _ => Err(BitterError::validation(format!(
                "rotation must be a multiple of 90 degrees, got {deg}"
            ))),
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Pixel layouts accepted at the capture boundary.
///
/// Only the packed layouts can be warped directly; planar YUV frames are converted to RGBA8 by
/// the orchestrator first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
    Rgb8,
    Nv21,
    I420,
}

impl PixelFormat {
    pub fn packed_bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Rgba8 | Self::Bgra8 => Some(4),
            Self::Rgb8 => Some(3),
            Self::Nv21 | Self::I420 => None,
        }
    }

    pub fn frame_len(self, width: u32, height: u32) -> usize {
        let px = (width as usize).saturating_mul(height as usize);
        match self.packed_bytes_per_pixel() {
            Some(bpp) => px.saturating_mul(bpp),
            None => {
                let cw = (width as usize).div_ceil(2);
                let ch = (height as usize).div_ceil(2);
                px + 2 * cw * ch
            }
        }
    }
}

/// One image flowing through the pipeline.
///
/// Frames are move-only: the pixel buffer is owned by exactly one stage at a time and copies are
/// made explicitly with [`Frame::duplicate`].
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    pub rotation: Rotation,
    pub facing: Facing,
    pub timestamp_us: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> BitterResult<Self> {
        if width == 0 || height == 0 {
            return Err(BitterError::validation("frame width/height must be non-zero"));
        }
        let expected = format.frame_len(width, height);
        if data.len() != expected {
            return Err(BitterError::validation(format!(
                "frame buffer size mismatch for {format:?} {width}x{height}: got {}, expected {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
            rotation: Rotation::Deg0,
            facing: Facing::Back,
            timestamp_us: 0,
        })
    }

    pub fn rgba8(width: u32, height: u32, data: Vec<u8>) -> BitterResult<Self> {
        Self::new(width, height, PixelFormat::Rgba8, data)
    }

    pub fn with_orientation(mut self, rotation: Rotation, facing: Facing) -> Self {
        self.rotation = rotation;
        self.facing = facing;
        self
    }

    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    pub fn duplicate(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            format: self.format,
            data: self.data.clone(),
            rotation: self.rotation,
            facing: self.facing,
            timestamp_us: self.timestamp_us,
        }
    }

    pub(crate) fn with_pixels(&self, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: self.format,
            data,
            rotation: self.rotation,
            facing: self.facing,
            timestamp_us: self.timestamp_us,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
