use std::collections::BTreeMap;

use crate::foundation::core::Point;
use crate::foundation::math::lerp_point;
use crate::landmarks::scheme::{LANDMARK_COUNT, LandmarkSet};

/// Named contour groups reported by contour-style face detectors.
///
/// "Left" and "right" are as seen in the image, not from the subject's point of view.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContourKind {
    FaceOval,
    LeftEyebrowTop,
    LeftEyebrowBottom,
    RightEyebrowTop,
    RightEyebrowBottom,
    LeftEye,
    RightEye,
    UpperLipTop,
    UpperLipBottom,
    LowerLipTop,
    LowerLipBottom,
    NoseBridge,
    NoseBottom,
    LeftCheek,
    RightCheek,
}

impl ContourKind {
    /// Groups the canonical mapping reads from, with their minimum native lengths.
    pub const REQUIRED: [(ContourKind, usize); 11] = [
        (ContourKind::FaceOval, 36),
        (ContourKind::LeftEyebrowTop, 5),
        (ContourKind::RightEyebrowTop, 5),
        (ContourKind::LeftEye, 16),
        (ContourKind::RightEye, 16),
        (ContourKind::UpperLipTop, 11),
        (ContourKind::UpperLipBottom, 9),
        (ContourKind::LowerLipTop, 9),
        (ContourKind::LowerLipBottom, 9),
        (ContourKind::NoseBridge, 2),
        (ContourKind::NoseBottom, 3),
    ];
}

/// One face as reported by a contour detector: point sequences keyed by group.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct NativeContours {
    groups: BTreeMap<ContourKind, Vec<Point>>,
}

impl NativeContours {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ContourKind, points: Vec<Point>) {
        self.groups.insert(kind, points);
    }

    pub fn with(mut self, kind: ContourKind, points: Vec<Point>) -> Self {
        self.insert(kind, points);
        self
    }

    pub fn remove(&mut self, kind: ContourKind) -> Option<Vec<Point>> {
        self.groups.remove(&kind)
    }

    pub fn get(&self, kind: ContourKind) -> Option<&[Point]> {
        self.groups.get(&kind).map(Vec::as_slice)
    }
}

const JAW_FROM_OVAL: [usize; 17] = [27, 26, 25, 24, 23, 22, 21, 20, 18, 16, 15, 14, 13, 12, 11, 10, 9];
const EYE_FROM_CONTOUR: [usize; 6] = [0, 3, 5, 8, 11, 13];
const UPPER_OUTER_FROM_LIP_TOP: [usize; 7] = [0, 2, 4, 5, 6, 8, 10];
const LOWER_OUTER_FROM_LIP_BOTTOM: [usize; 5] = [1, 3, 4, 5, 7];
const UPPER_INNER_FROM_LIP_BOTTOM: [usize; 3] = [2, 4, 6];
const LOWER_INNER_FROM_LIP_TOP: [usize; 3] = [6, 4, 2];

/// Map detector contours onto the canonical 68-point layout.
///
/// Returns `None` when any required group is missing or shorter than its minimum length; callers
/// treat that as "no usable face". The mapping is pure: equal input gives equal output.
pub fn normalize_contours(native: &NativeContours) -> Option<LandmarkSet> {
    for (kind, min_len) in ContourKind::REQUIRED {
        if native.get(kind).is_none_or(|pts| pts.len() < min_len) {
            tracing::trace!(?kind, "contour group missing or short");
            return None;
        }
    }
    let g = |kind| native.get(kind).unwrap_or(&[]);

    let oval = g(ContourKind::FaceOval);
    let left_brow = g(ContourKind::LeftEyebrowTop);
    let right_brow = g(ContourKind::RightEyebrowTop);
    let left_eye = g(ContourKind::LeftEye);
    let right_eye = g(ContourKind::RightEye);
    let lip_top = g(ContourKind::UpperLipTop);
    let upper_bottom = g(ContourKind::UpperLipBottom);
    let lower_top = g(ContourKind::LowerLipTop);
    let lip_bottom = g(ContourKind::LowerLipBottom);
    let bridge = g(ContourKind::NoseBridge);
    let nostrils = g(ContourKind::NoseBottom);

    let mut out = Vec::with_capacity(LANDMARK_COUNT);
    out.extend(JAW_FROM_OVAL.iter().map(|&i| oval[i]));
    out.extend_from_slice(&left_brow[..5]);
    out.extend_from_slice(&right_brow[..5]);

    let (b0, b1) = (bridge[0], bridge[1]);
    out.extend([
        b0,
        lerp_point(b0, b1, 1.0 / 3.0),
        lerp_point(b0, b1, 2.0 / 3.0),
        b1,
    ]);

    let (n0, n1, n2) = (nostrils[0], nostrils[1], nostrils[2]);
    out.extend([
        n0,
        lerp_point(n0, n1, 0.5),
        n1,
        lerp_point(n1, n2, 0.5),
        n2,
    ]);

    out.extend(EYE_FROM_CONTOUR.iter().map(|&i| left_eye[i]));
    out.extend(EYE_FROM_CONTOUR.iter().map(|&i| right_eye[i]));

    out.extend(UPPER_OUTER_FROM_LIP_TOP.iter().map(|&i| lip_top[i]));
    out.extend(LOWER_OUTER_FROM_LIP_BOTTOM.iter().map(|&i| lip_bottom[i]));

    out.push(lerp_point(upper_bottom[0], lower_top[0], 0.5));
    out.extend(UPPER_INNER_FROM_LIP_BOTTOM.iter().map(|&i| upper_bottom[i]));
    out.push(lerp_point(upper_bottom[8], lower_top[8], 0.5));
    out.extend(LOWER_INNER_FROM_LIP_TOP.iter().map(|&i| lower_top[i]));

    let points: [Point; LANDMARK_COUNT] = out.try_into().ok()?;
    Some(LandmarkSet::from_array(points))
}

#[cfg(test)]
#[path = "../../tests/unit/landmarks/normalize.rs"]
mod tests;
