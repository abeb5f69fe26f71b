use std::ops::Range;

use crate::foundation::core::{Point, Rect};
use crate::foundation::error::{BitterError, BitterResult};
use crate::foundation::math::{bounding_rect, centroid};

pub const LANDMARK_COUNT: usize = 68;

/// Jaw line, image-left to image-right through the chin.
pub const JAW: Range<usize> = 0..17;
/// Eyebrow on the image-left side.
pub const LEFT_BROW: Range<usize> = 17..22;
/// Eyebrow on the image-right side.
pub const RIGHT_BROW: Range<usize> = 22..27;
/// Nose bridge, top to tip.
pub const NOSE_BRIDGE: Range<usize> = 27..31;
/// Nostril line, left to right.
pub const NOSE_BOTTOM: Range<usize> = 31..36;
pub const NOSE: Range<usize> = 27..36;
/// Eye on the image-left side, clockwise from its left corner.
pub const LEFT_EYE: Range<usize> = 36..42;
/// Eye on the image-right side, clockwise from its left corner.
pub const RIGHT_EYE: Range<usize> = 42..48;
/// Outer lip contour, clockwise from the left corner.
pub const OUTER_LIP: Range<usize> = 48..60;
/// Inner lip contour, clockwise from the left inner corner.
pub const INNER_LIP: Range<usize> = 60..68;
pub const MOUTH: Range<usize> = 48..68;

pub const LEFT_EYE_INNER: usize = 39;
pub const RIGHT_EYE_INNER: usize = 42;
pub const LEFT_BROW_OUTER: usize = 17;
pub const LEFT_BROW_INNER: usize = 21;
pub const RIGHT_BROW_INNER: usize = 22;
pub const RIGHT_BROW_OUTER: usize = 26;
pub const MOUTH_LEFT: usize = 48;
pub const MOUTH_RIGHT: usize = 54;

/// Exactly 68 facial points in the canonical layout.
///
/// There is no partial set: construction fails unless all 68 points are present.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct LandmarkSet {
    points: [Point; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn from_points(points: Vec<Point>) -> BitterResult<Self> {
        let n = points.len();
        let points: [Point; LANDMARK_COUNT] = points.try_into().map_err(|_| {
            BitterError::validation(format!(
                "landmark set needs exactly {LANDMARK_COUNT} points, got {n}"
            ))
        })?;
        Ok(Self { points })
    }

    pub(crate) fn from_array(points: [Point; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point; LANDMARK_COUNT] {
        &self.points
    }

    pub fn point(&self, idx: usize) -> Point {
        self.points[idx]
    }

    pub fn group(&self, range: Range<usize>) -> &[Point] {
        &self.points[range]
    }

    pub fn bounds(&self) -> Rect {
        bounding_rect(&self.points)
    }

    pub fn group_bounds(&self, range: Range<usize>) -> Rect {
        bounding_rect(self.group(range))
    }

    pub fn group_centroid(&self, range: Range<usize>) -> Point {
        centroid(self.group(range))
    }
}

impl TryFrom<Vec<Point>> for LandmarkSet {
    type Error = BitterError;

    fn try_from(points: Vec<Point>) -> BitterResult<Self> {
        Self::from_points(points)
    }
}

impl From<LandmarkSet> for Vec<Point> {
    fn from(set: LandmarkSet) -> Self {
        set.points.to_vec()
    }
}
