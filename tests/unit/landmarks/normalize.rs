use super::*;
use crate::landmarks::scheme::{
    JAW, LEFT_EYE, LEFT_EYE_INNER, MOUTH_LEFT, MOUTH_RIGHT, NOSE_BOTTOM, RIGHT_EYE_INNER,
};
use crate::landmarks::synthetic::synthetic_face_contours;

fn face() -> NativeContours {
    synthetic_face_contours(Point::new(320.0, 240.0), 200.0)
}

#[test]
fn complete_contours_yield_68_points_deterministically() {
    let native = face();
    let a = normalize_contours(&native).expect("complete face");
    let b = normalize_contours(&native).expect("complete face");
    assert_eq!(a.points().len(), LANDMARK_COUNT);
    assert_eq!(a, b);
}

#[test]
fn missing_any_required_group_yields_none() {
    for (kind, _) in ContourKind::REQUIRED {
        let mut native = face();
        native.remove(kind);
        assert!(
            normalize_contours(&native).is_none(),
            "{kind:?} removed but normalize succeeded"
        );
    }
}

#[test]
fn short_group_counts_as_missing() {
    let mut native = face();
    native.insert(ContourKind::LeftEye, vec![Point::ZERO; 6]);
    assert!(normalize_contours(&native).is_none());
}

#[test]
fn optional_groups_are_not_required() {
    let mut native = face();
    native.remove(ContourKind::LeftCheek);
    native.remove(ContourKind::RightCheek);
    assert!(normalize_contours(&native).is_some());
}

#[test]
fn sampling_picks_expected_native_points() {
    let native = face();
    let set = normalize_contours(&native).unwrap();
    let oval = native.get(ContourKind::FaceOval).unwrap();
    let left_eye = native.get(ContourKind::LeftEye).unwrap();
    let right_eye = native.get(ContourKind::RightEye).unwrap();
    let lip_top = native.get(ContourKind::UpperLipTop).unwrap();

    assert_eq!(set.group(JAW)[0], oval[27]);
    assert_eq!(set.group(JAW)[8], oval[18]);
    assert_eq!(set.group(JAW)[16], oval[9]);
    assert_eq!(set.group(LEFT_EYE)[0], left_eye[0]);
    assert_eq!(set.point(LEFT_EYE_INNER), left_eye[8]);
    assert_eq!(set.point(RIGHT_EYE_INNER), right_eye[0]);
    assert_eq!(set.point(MOUTH_LEFT), lip_top[0]);
    assert_eq!(set.point(MOUTH_RIGHT), lip_top[10]);
}

#[test]
fn interpolated_points_sit_between_natives() {
    let native = face();
    let set = normalize_contours(&native).unwrap();
    let nostrils = native.get(ContourKind::NoseBottom).unwrap();
    let mid = set.group(NOSE_BOTTOM)[1];
    assert!((mid.x - (nostrils[0].x + nostrils[1].x) / 2.0).abs() < 1e-9);
    assert!((mid.y - (nostrils[0].y + nostrils[1].y) / 2.0).abs() < 1e-9);

    let bridge = native.get(ContourKind::NoseBridge).unwrap();
    let p28 = set.point(28);
    assert!((p28.y - (bridge[0].y + (bridge[1].y - bridge[0].y) / 3.0)).abs() < 1e-9);
}

#[test]
fn landmark_set_rejects_partial_point_lists() {
    assert!(LandmarkSet::from_points(vec![Point::ZERO; 67]).is_err());
    assert!(LandmarkSet::from_points(vec![Point::ZERO; 68]).is_ok());
}

#[test]
fn contours_deserialize_from_snake_case_json() {
    let native = face();
    let json = serde_json::to_string(&native).unwrap();
    assert!(json.contains("\"face_oval\""));
    let back: NativeContours = serde_json::from_str(&json).unwrap();
    assert_eq!(back, native);
}
