use crate::foundation::core::{Point, Rect};

/// Denominator guard for warp geometry.
pub(crate) const EPSILON: f64 = 1e-4;

pub(crate) fn falloff(max_dist: f64, dist: f64) -> f64 {
    if max_dist <= EPSILON || dist >= max_dist {
        return 0.0;
    }
    (max_dist - dist) / max_dist
}

pub(crate) fn lerp_point(a: Point, b: Point, t: f64) -> Point {
    a.lerp(b, t)
}

pub(crate) fn bounding_rect(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
}

pub(crate) fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::ZERO;
    }
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let n = points.len() as f64;
    Point::new(sx / n, sy / n)
}

pub(crate) fn side_sign(v: f64) -> f64 {
    if v >= 0.0 { 1.0 } else { -1.0 }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
