use super::*;

#[test]
fn rgba_passthrough_keeps_buffer() {
    let f = Frame::rgba8(1, 1, vec![1, 2, 3, 4]).unwrap();
    let out = to_rgba8(f).unwrap();
    assert_eq!(out.data, vec![1, 2, 3, 4]);
}

#[test]
fn bgra_and_rgb_convert() {
    let bgra = Frame::new(1, 1, PixelFormat::Bgra8, vec![10, 20, 30, 40]).unwrap();
    assert_eq!(to_rgba8(bgra).unwrap().data, vec![30, 20, 10, 40]);

    let rgb = Frame::new(2, 1, PixelFormat::Rgb8, vec![1, 2, 3, 4, 5, 6]).unwrap();
    let out = to_rgba8(rgb).unwrap();
    assert_eq!(out.format, PixelFormat::Rgba8);
    assert_eq!(out.data, vec![1, 2, 3, 255, 4, 5, 6, 255]);
}

#[test]
fn neutral_chroma_yields_gray() {
    // 2x2 NV21 with Y=100 and neutral chroma.
    let data = vec![100, 100, 100, 100, 128, 128];
    let f = Frame::new(2, 2, PixelFormat::Nv21, data).unwrap();
    let out = to_rgba8(f).unwrap();
    for px in out.data.chunks_exact(4) {
        assert_eq!(px, &[100, 100, 100, 255]);
    }
}

#[test]
fn gray_round_trips_through_i420() {
    let src = [77u8, 77, 77, 255].repeat(6);
    let mut yuv = Vec::new();
    rgba8_to_yuv420(&src, 3, 2, ChromaLayout::I420, &mut yuv).unwrap();
    assert_eq!(yuv.len(), PixelFormat::I420.frame_len(3, 2));

    let f = Frame::new(3, 2, PixelFormat::I420, yuv).unwrap();
    let back = to_rgba8(f).unwrap();
    for px in back.data.chunks_exact(4) {
        for c in &px[..3] {
            assert!((i16::from(*c) - 77).abs() <= 1);
        }
    }
}

#[test]
fn nv12_interleaves_u_then_v() {
    // Pure red: U below 128, V above 128.
    let src = [255u8, 0, 0, 255].repeat(4);
    let mut yuv = Vec::new();
    rgba8_to_yuv420(&src, 2, 2, ChromaLayout::Nv12, &mut yuv).unwrap();
    assert_eq!(yuv.len(), 6);
    assert!(yuv[4] < 128);
    assert!(yuv[5] > 128);
}

#[test]
fn rejects_mismatched_input() {
    let mut dst = Vec::new();
    assert!(rgba8_to_yuv420(&[0; 7], 1, 2, ChromaLayout::I420, &mut dst).is_err());
}
