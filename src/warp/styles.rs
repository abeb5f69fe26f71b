use crate::foundation::core::Point;
use crate::foundation::error::{BitterError, BitterResult};
use crate::foundation::math::EPSILON;
use crate::landmarks::scheme::{
    LEFT_BROW_INNER, LEFT_BROW_OUTER, LEFT_EYE_INNER, LandmarkSet, MOUTH, MOUTH_LEFT, MOUTH_RIGHT,
    NOSE, RIGHT_BROW_INNER, RIGHT_BROW_OUTER, RIGHT_EYE_INNER,
};
use crate::warp::operators::{
    BrowRaise, EyeDroop, MouthCornerPull, NoseStretch, RadialPull, WarpOperator,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WarpStyle {
    Identity,
    #[default]
    Droop,
    Compress,
    Raise,
}

impl WarpStyle {
    pub fn id(self) -> u8 {
        match self {
            Self::Identity => 0,
            Self::Droop => 1,
            Self::Compress => 2,
            Self::Raise => 3,
        }
    }
}

impl TryFrom<u8> for WarpStyle {
    type Error = BitterError;

    fn try_from(v: u8) -> BitterResult<Self> {
        match v {
            0 => Ok(Self::Identity),
            1 => Ok(Self::Droop),
            2 => Ok(Self::Compress),
            3 => Ok(Self::Raise),
            _ => Err(BitterError::validation(format!("unknown warp style {v}"))),
        }
    }
}

impl From<WarpStyle> for u8 {
    fn from(s: WarpStyle) -> Self {
        s.id()
    }
}

/// Build the operator list for `style` from one face.
///
/// Returns an empty list for [`WarpStyle::Identity`] and for faces whose bounding box has no
/// usable width.
pub fn operators_for(style: WarpStyle, face: &LandmarkSet) -> Vec<Box<dyn WarpOperator>> {
    let bounds = face.bounds();
    let face_w = bounds.width();
    if face_w < EPSILON {
        return Vec::new();
    }
    let half = face_w * 0.5;

    let mut ops: Vec<Box<dyn WarpOperator>> = Vec::new();
    match style {
        WarpStyle::Identity => {}
        WarpStyle::Droop => {
            ops.push(Box::new(EyeDroop {
                anchor: face.point(LEFT_EYE_INNER),
                max_dist: half,
                outward: -1.0,
            }));
            ops.push(Box::new(EyeDroop {
                anchor: face.point(RIGHT_EYE_INNER),
                max_dist: half,
                outward: 1.0,
            }));
            ops.push(Box::new(NoseStretch {
                center: face.group_centroid(NOSE),
                nose_box: face.group_bounds(NOSE),
                max_dist: half * 0.6,
            }));
        }
        WarpStyle::Compress => {
            ops.push(Box::new(RadialPull {
                center: face.group_centroid(NOSE),
                max_dist: half * 0.4,
                gain_x: 1.0,
                gain_y: 0.0,
            }));
            ops.push(Box::new(RadialPull {
                center: face.group_centroid(MOUTH),
                max_dist: half * 0.8,
                gain_x: 1.0,
                gain_y: 0.7,
            }));
        }
        WarpStyle::Raise => {
            let face_center_x = bounds.center().x;
            for idx in [
                LEFT_BROW_OUTER,
                LEFT_BROW_INNER,
                RIGHT_BROW_INNER,
                RIGHT_BROW_OUTER,
            ] {
                ops.push(Box::new(BrowRaise {
                    anchor: face.point(idx),
                    max_dist: face_w * 0.2,
                    face_center_x,
                }));
            }
            let (left, right): (Point, Point) = (face.point(MOUTH_LEFT), face.point(MOUTH_RIGHT));
            if let Some(pair) = MouthCornerPull::pair(left, right, face_w * 0.15) {
                for op in pair {
                    ops.push(Box::new(op));
                }
            }
        }
    }
    ops
}

#[cfg(test)]
#[path = "../../tests/unit/warp/styles.rs"]
mod tests;
