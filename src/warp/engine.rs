use crate::foundation::core::Frame;
use crate::foundation::error::{BitterError, BitterResult};
use crate::landmarks::scheme::LandmarkSet;
use crate::warp::grid::WarpGrid;
use crate::warp::operators::Influence;
use crate::warp::remap::remap_bilinear;
use crate::warp::styles::{WarpStyle, operators_for};

/// Upper bound for the caller-supplied intensity.
pub const MAX_INTENSITY: f32 = 3.0;

/// Applies a deformation style to frames.
///
/// The engine is stateless; one instance can be shared across threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct WarpEngine;

impl WarpEngine {
    pub fn new() -> Self {
        Self
    }

    /// Warp `frame` around one face.
    ///
    /// [`WarpStyle::Identity`] returns an independent copy of the input. The input frame is never
    /// modified.
    pub fn apply(
        &self,
        frame: &Frame,
        landmarks: &LandmarkSet,
        style: WarpStyle,
        intensity: f32,
    ) -> BitterResult<Frame> {
        let intensity = clamp_intensity(intensity)?;
        if style == WarpStyle::Identity {
            return Ok(frame.duplicate());
        }
        let grid = self.build_grid(frame.width, frame.height, landmarks, style, intensity)?;
        remap_bilinear(frame, &grid)
    }

    /// Warp every face in turn, each pass reading the previous pass' output.
    ///
    /// With no faces the result is a copy of `frame`.
    pub fn apply_faces(
        &self,
        frame: &Frame,
        faces: &[LandmarkSet],
        style: WarpStyle,
        intensity: f32,
    ) -> BitterResult<Frame> {
        let mut out = frame.duplicate();
        for face in faces {
            out = self.apply(&out, face, style, intensity)?;
        }
        Ok(out)
    }

    pub fn build_grid(
        &self,
        width: u32,
        height: u32,
        landmarks: &LandmarkSet,
        style: WarpStyle,
        intensity: f64,
    ) -> BitterResult<WarpGrid> {
        let mut grid = WarpGrid::identity(width, height)?;
        for op in operators_for(style, landmarks) {
            op.apply(&mut grid, intensity);
        }
        Ok(grid)
    }

    pub fn influences(&self, landmarks: &LandmarkSet, style: WarpStyle) -> Vec<Influence> {
        operators_for(style, landmarks)
            .iter()
            .flat_map(|op| op.influences())
            .collect()
    }
}

pub fn clamp_intensity(intensity: f32) -> BitterResult<f64> {
    if !intensity.is_finite() {
        return Err(BitterError::validation(format!(
            "intensity must be finite, got {intensity}"
        )));
    }
    Ok(f64::from(intensity.clamp(0.0, MAX_INTENSITY)))
}

#[cfg(test)]
#[path = "../../tests/unit/warp/engine.rs"]
mod tests;
