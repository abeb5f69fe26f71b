use crate::foundation::core::{Point, Rect};
use crate::foundation::math::{EPSILON, side_sign};
use crate::warp::grid::WarpGrid;

const DROOP_GAIN: f64 = 0.12;
const NOSE_SPREAD_GAIN: f64 = 0.15;
const NOSE_DROP_GAIN: f64 = 0.2;
const COMPRESS_GAIN: f64 = 0.35;
const BROW_RAISE_GAIN: f64 = 0.25;
const MOUTH_PULL_GAIN: f64 = 0.8;

/// Distance above which the mouth-corner fold keeps halving.
pub const FOLD_THRESHOLD: f64 = 6.0;

/// Circle of influence of one operator anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Influence {
    pub anchor: Point,
    pub max_dist: f64,
}

/// A local displacement rule applied to a [`WarpGrid`].
pub trait WarpOperator: Send + Sync + std::fmt::Debug {
    fn apply(&self, grid: &mut WarpGrid, intensity: f64);

    fn influences(&self) -> Vec<Influence>;
}

/// Pulls the outer side of an eye corner down and its inner side up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EyeDroop {
    pub anchor: Point,
    pub max_dist: f64,
    pub outward: f64,
}

impl WarpOperator for EyeDroop {
    fn apply(&self, grid: &mut WarpGrid, intensity: f64) {
        let amp = intensity * DROOP_GAIN * self.max_dist;
        grid.visit_radius(self.anchor, self.max_dist, |p, w, _mx, my| {
            let side = side_sign((p.x - self.anchor.x) * self.outward);
            *my -= (side * amp * w) as f32;
        });
    }

    fn influences(&self) -> Vec<Influence> {
        vec![Influence {
            anchor: self.anchor,
            max_dist: self.max_dist,
        }]
    }
}

/// Widens the nostrils and drags the area below the nose centroid down.
///
/// Both terms are scaled by how close a pixel is to the nose box edges; a term whose nose extent
/// is degenerate is skipped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoseStretch {
    pub center: Point,
    pub nose_box: Rect,
    pub max_dist: f64,
}

impl WarpOperator for NoseStretch {
    fn apply(&self, grid: &mut WarpGrid, intensity: f64) {
        let half_w = self.nose_box.width() * 0.5;
        let half_h = self.nose_box.height() * 0.5;
        let c = self.center;
        grid.visit_radius(c, self.max_dist, |p, w, mx, my| {
            if half_w > EPSILON {
                let ex = ((p.x - c.x).abs() / half_w).clamp(0.0, 1.0);
                let dx = side_sign(p.x - c.x) * intensity * w * ex * NOSE_SPREAD_GAIN * half_w;
                *mx -= dx as f32;
            }
            if half_h > EPSILON && p.y > c.y {
                let ey = ((p.y - c.y) / half_h).clamp(0.0, 1.0);
                *my -= (intensity * w * ey * NOSE_DROP_GAIN * half_h) as f32;
            }
        });
    }

    fn influences(&self) -> Vec<Influence> {
        vec![Influence {
            anchor: self.center,
            max_dist: self.max_dist,
        }]
    }
}

/// Pulls content toward a centre by sampling further out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadialPull {
    pub center: Point,
    pub max_dist: f64,
    pub gain_x: f64,
    pub gain_y: f64,
}

impl WarpOperator for RadialPull {
    fn apply(&self, grid: &mut WarpGrid, intensity: f64) {
        let c = self.center;
        let k = intensity * COMPRESS_GAIN;
        grid.visit_radius(c, self.max_dist, |p, w, mx, my| {
            *mx += ((p.x - c.x) * w * k * self.gain_x) as f32;
            if self.gain_y != 0.0 {
                *my += ((p.y - c.y) * w * k * self.gain_y) as f32;
            }
        });
    }

    fn influences(&self) -> Vec<Influence> {
        vec![Influence {
            anchor: self.center,
            max_dist: self.max_dist,
        }]
    }
}

/// Raises content on the side of a brow anchor facing away from the face centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrowRaise {
    pub anchor: Point,
    pub max_dist: f64,
    pub face_center_x: f64,
}

impl WarpOperator for BrowRaise {
    fn apply(&self, grid: &mut WarpGrid, intensity: f64) {
        let away = side_sign(self.anchor.x - self.face_center_x);
        let amp = intensity * BROW_RAISE_GAIN * self.max_dist;
        grid.visit_radius(self.anchor, self.max_dist, |p, w, _mx, my| {
            if (p.x - self.anchor.x) * away >= 0.0 {
                *my += (amp * w) as f32;
            }
        });
    }

    fn influences(&self) -> Vec<Influence> {
        vec![Influence {
            anchor: self.anchor,
            max_dist: self.max_dist,
        }]
    }
}

/// Pulls content near a mouth corner vertically toward the line through both corners.
///
/// The point-to-line distance goes through [`fold_distance`] before weighting, so the
/// displacement curve saw-tooths instead of growing without bound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouthCornerPull {
    pub corner: Point,
    pub slope: f64,
    pub intercept: f64,
    pub max_dist: f64,
}

impl MouthCornerPull {
    /// Operators for both corners, or `None` when the corners are (nearly) vertically aligned
    /// or coincident.
    pub fn pair(left: Point, right: Point, max_dist: f64) -> Option<[Self; 2]> {
        let dx = right.x - left.x;
        if dx.abs() < EPSILON {
            return None;
        }
        let slope = (right.y - left.y) / dx;
        let intercept = left.y - slope * left.x;
        let make = |corner| Self {
            corner,
            slope,
            intercept,
            max_dist,
        };
        Some([make(left), make(right)])
    }
}

impl WarpOperator for MouthCornerPull {
    fn apply(&self, grid: &mut WarpGrid, intensity: f64) {
        grid.visit_radius(self.corner, self.max_dist, |p, w, _mx, my| {
            let d = p.y - (self.slope * p.x + self.intercept);
            let folded = fold_distance(d.abs());
            *my += (side_sign(d) * folded * w * intensity * MOUTH_PULL_GAIN) as f32;
        });
    }

    fn influences(&self) -> Vec<Influence> {
        vec![Influence {
            anchor: self.corner,
            max_dist: self.max_dist,
        }]
    }
}

/// Halve `d` repeatedly while it exceeds [`FOLD_THRESHOLD`].
///
/// Results for large inputs land in `(FOLD_THRESHOLD / 2, FOLD_THRESHOLD]`, non-monotonically.
pub fn fold_distance(mut d: f64) -> f64 {
    if !d.is_finite() {
        return 0.0;
    }
    while d > FOLD_THRESHOLD {
        d *= 0.5;
    }
    d
}

#[cfg(test)]
#[path = "../../tests/unit/warp/operators.rs"]
mod tests;
