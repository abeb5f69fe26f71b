use super::*;

#[test]
fn rotation_from_degrees_normalizes() {
    assert_eq!(Rotation::from_degrees(0).unwrap(), Rotation::Deg0);
    assert_eq!(Rotation::from_degrees(450).unwrap(), Rotation::Deg90);
    assert_eq!(Rotation::from_degrees(-90).unwrap(), Rotation::Deg270);
    assert!(Rotation::from_degrees(45).is_err());
    assert!(Rotation::Deg270.swaps_axes());
    assert!(!Rotation::Deg180.swaps_axes());
}

#[test]
fn frame_len_accounts_for_odd_chroma() {
    assert_eq!(PixelFormat::Rgba8.frame_len(3, 2), 24);
    assert_eq!(PixelFormat::Rgb8.frame_len(3, 2), 18);
    assert_eq!(PixelFormat::I420.frame_len(4, 4), 16 + 8);
    assert_eq!(PixelFormat::Nv21.frame_len(3, 3), 9 + 8);
}

#[test]
fn frame_new_validates_dimensions_and_size() {
    assert!(Frame::rgba8(0, 1, vec![]).is_err());
    assert!(Frame::rgba8(2, 2, vec![0; 15]).is_err());
    let f = Frame::rgba8(2, 2, vec![7; 16]).unwrap();
    assert_eq!(f.facing, Facing::Back);
    assert_eq!(f.rotation, Rotation::Deg0);
}

#[test]
fn duplicate_is_deep() {
    let f = Frame::rgba8(1, 1, vec![1, 2, 3, 4])
        .unwrap()
        .with_timestamp(42);
    let mut g = f.duplicate();
    assert_eq!(f, g);
    g.data[0] = 9;
    assert_eq!(f.data[0], 1);
}

#[test]
fn facing_opposite_round_trips() {
    assert_eq!(Facing::Front.opposite(), Facing::Back);
    assert_eq!(Facing::Back.opposite().opposite(), Facing::Back);
}
