use super::*;

#[test]
fn wide_source_on_tall_surface_crops_sides() {
    let r = fill_rect(640, 480, 480, 640);
    assert_eq!(r.height(), 640.0);
    assert!((r.width() - 853.333).abs() < 1e-2);
    assert!((r.center().x - 240.0).abs() < 1e-9);
    assert!(r.x0 < 0.0);
}

#[test]
fn matching_aspect_fills_exactly() {
    assert_eq!(fill_rect(320, 240, 640, 480), Rect::new(0.0, 0.0, 640.0, 480.0));
}

#[test]
fn zero_sizes_give_empty_rect() {
    assert_eq!(fill_rect(0, 10, 10, 10), Rect::ZERO);
    assert_eq!(fill_rect(10, 10, 10, 0), Rect::ZERO);
}
