use super::*;

#[test]
fn left_eye_droop_does_not_reach_beyond_its_radius() {
    // 640x480 frame, intensity 1.2, left-eye anchor (200, 240), max_dist 160.
    let mut grid = WarpGrid::identity(640, 480).unwrap();
    let op = EyeDroop {
        anchor: Point::new(200.0, 240.0),
        max_dist: 160.0,
        outward: -1.0,
    };
    op.apply(&mut grid, 1.2);

    // Distance 200 > 160: zero contribution.
    assert!(grid.is_identity_at(400, 240));
    assert_eq!(grid.displacement_at(400, 240), (0.0, 0.0));
    // Inside the radius something moved.
    assert!(!grid.is_identity_at(150, 240));
}

#[test]
fn eyes_pull_in_opposite_directions() {
    let mut left = WarpGrid::identity(200, 100).unwrap();
    let mut right = WarpGrid::identity(200, 100).unwrap();
    let anchor = Point::new(100.0, 50.0);
    EyeDroop {
        anchor,
        max_dist: 40.0,
        outward: -1.0,
    }
    .apply(&mut left, 1.0);
    EyeDroop {
        anchor,
        max_dist: 40.0,
        outward: 1.0,
    }
    .apply(&mut right, 1.0);

    // Left of the anchor: outer side of the left eye sinks (samples from above).
    assert!(left.displacement_at(90, 50).1 < 0.0);
    assert!(right.displacement_at(90, 50).1 > 0.0);
    assert!(left.displacement_at(110, 50).1 > 0.0);
    assert!(right.displacement_at(110, 50).1 < 0.0);
}

#[test]
fn fold_distance_halves_instead_of_clamping() {
    assert_eq!(fold_distance(3.0), 3.0);
    assert_eq!(fold_distance(FOLD_THRESHOLD), FOLD_THRESHOLD);
    assert_eq!(fold_distance(10.0), 5.0);
    assert_eq!(fold_distance(13.0), 3.25);
    assert_eq!(fold_distance(100.0), 100.0 / 32.0);
    // Non-monotonic: a larger input can fold to a smaller output.
    assert_eq!(fold_distance(12.0), 6.0);
    assert!(fold_distance(12.0) > fold_distance(12.5));
    assert_eq!(fold_distance(f64::INFINITY), 0.0);
}

#[test]
fn brow_raise_only_moves_the_side_away_from_center() {
    let mut grid = WarpGrid::identity(200, 100).unwrap();
    BrowRaise {
        anchor: Point::new(60.0, 50.0),
        max_dist: 20.0,
        face_center_x: 100.0,
    }
    .apply(&mut grid, 1.0);
    // Anchor is left of centre: only pixels at or left of it move.
    assert!(grid.displacement_at(55, 50).1 > 0.0);
    assert!(grid.is_identity_at(65, 50));
}

#[test]
fn mouth_corner_pull_targets_the_corner_line() {
    let [left, _right] =
        MouthCornerPull::pair(Point::new(50.0, 60.0), Point::new(150.0, 60.0), 20.0).unwrap();
    let mut grid = WarpGrid::identity(200, 120).unwrap();
    left.apply(&mut grid, 1.0);

    // Below the line: sample further below. Above: further above. On it: unchanged.
    assert!(grid.displacement_at(50, 64).1 > 0.0);
    assert!(grid.displacement_at(50, 56).1 < 0.0);
    assert!(grid.is_identity_at(50, 60));
}

#[test]
fn coincident_mouth_corners_are_skipped() {
    let p = Point::new(10.0, 10.0);
    assert!(MouthCornerPull::pair(p, p, 5.0).is_none());
    assert!(MouthCornerPull::pair(p, Point::new(10.0, 30.0), 5.0).is_none());
}

#[test]
fn degenerate_nose_box_skips_terms() {
    let mut grid = WarpGrid::identity(50, 50).unwrap();
    NoseStretch {
        center: Point::new(25.0, 25.0),
        nose_box: Rect::new(25.0, 25.0, 25.0, 25.0),
        max_dist: 10.0,
    }
    .apply(&mut grid, 2.0);
    assert!(grid.is_identity());
}

#[test]
fn radial_pull_samples_away_from_center() {
    let mut grid = WarpGrid::identity(100, 100).unwrap();
    RadialPull {
        center: Point::new(50.0, 50.0),
        max_dist: 20.0,
        gain_x: 1.0,
        gain_y: 0.0,
    }
    .apply(&mut grid, 1.0);
    assert!(grid.displacement_at(60, 50).0 > 0.0);
    assert!(grid.displacement_at(40, 50).0 < 0.0);
    assert_eq!(grid.displacement_at(60, 55).1, 0.0);
}
