use std::f64::consts::PI;

use crate::foundation::core::Point;
use crate::landmarks::normalize::{ContourKind, NativeContours};

/// Generate a plausible frontal face in detector contour format.
///
/// Used to calibrate styles and to seed hand-edited contour files. `face_width` is the oval's
/// horizontal extent; the oval is 1.25x taller than wide.
pub fn synthetic_face_contours(center: Point, face_width: f64) -> NativeContours {
    let w = face_width;
    let h = face_width * 1.25;
    let (cx, cy) = (center.x, center.y);

    let oval = (0..36)
        .map(|k| {
            let t = 2.0 * PI * f64::from(k) / 36.0;
            Point::new(cx + 0.5 * w * t.sin(), cy - 0.5 * h * t.cos())
        })
        .collect();

    let brow = |x0: f64, x1: f64| -> Vec<Point> {
        (0..5)
            .map(|k| {
                let t = f64::from(k) / 4.0;
                let arch = (PI * t).sin() * 0.03 * h;
                Point::new(x0 + (x1 - x0) * t, cy - 0.22 * h - arch)
            })
            .collect()
    };

    let eye = |ex: f64| -> Vec<Point> {
        let ey = cy - 0.1 * h;
        (0..16)
            .map(|k| {
                let t = 2.0 * PI * f64::from(k) / 16.0;
                Point::new(ex - 0.09 * w * t.cos(), ey - 0.035 * w * t.sin())
            })
            .collect()
    };

    let (mx, my, mw) = (cx, cy + 0.28 * h, 0.17 * w);
    let lip = |k: usize, n: usize, lift: f64, reverse: bool| -> Point {
        let t = k as f64 / n as f64;
        let x = if reverse {
            mx + mw - 2.0 * mw * t
        } else {
            mx - mw + 2.0 * mw * t
        };
        Point::new(x, my - lift * h * (PI * t).sin())
    };

    NativeContours::new()
        .with(ContourKind::FaceOval, oval)
        .with(ContourKind::LeftEyebrowTop, brow(cx - 0.38 * w, cx - 0.08 * w))
        .with(ContourKind::RightEyebrowTop, brow(cx + 0.08 * w, cx + 0.38 * w))
        .with(ContourKind::LeftEye, eye(cx - 0.2 * w))
        .with(ContourKind::RightEye, eye(cx + 0.2 * w))
        .with(
            ContourKind::NoseBridge,
            vec![Point::new(cx, cy - 0.1 * h), Point::new(cx, cy + 0.08 * h)],
        )
        .with(
            ContourKind::NoseBottom,
            vec![
                Point::new(cx - 0.07 * w, cy + 0.1 * h),
                Point::new(cx, cy + 0.12 * h),
                Point::new(cx + 0.07 * w, cy + 0.1 * h),
            ],
        )
        .with(
            ContourKind::UpperLipTop,
            (0..11).map(|k| lip(k, 10, 0.05, false)).collect(),
        )
        .with(
            ContourKind::UpperLipBottom,
            (1..10).map(|k| lip(k, 10, 0.01, false)).collect(),
        )
        .with(
            ContourKind::LowerLipTop,
            (1..10).map(|k| lip(k, 10, -0.01, false)).collect(),
        )
        .with(
            ContourKind::LowerLipBottom,
            (1..10).map(|k| lip(k, 10, -0.06, true)).collect(),
        )
        .with(ContourKind::LeftCheek, vec![Point::new(cx - 0.3 * w, cy + 0.05 * h)])
        .with(ContourKind::RightCheek, vec![Point::new(cx + 0.3 * w, cy + 0.05 * h)])
}
