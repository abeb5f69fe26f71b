use crate::foundation::core::{Frame, PixelFormat};
use crate::foundation::error::{BitterError, BitterResult};

/// 4:2:0 layouts accepted by encoders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChromaLayout {
    I420,
    Nv12,
}

/// Convert any supported capture layout into RGBA8, consuming the input.
///
/// RGBA8 input is returned as-is without copying.
pub fn to_rgba8(frame: Frame) -> BitterResult<Frame> {
    let expected = frame.format.frame_len(frame.width, frame.height);
    if frame.width == 0 || frame.height == 0 || frame.data.len() != expected {
        return Err(BitterError::validation(format!(
            "cannot convert {:?} frame {}x{} with {} bytes",
            frame.format,
            frame.width,
            frame.height,
            frame.data.len()
        )));
    }

    let (w, h) = (frame.width as usize, frame.height as usize);
    let rgba = match frame.format {
        PixelFormat::Rgba8 => return Ok(frame),
        PixelFormat::Bgra8 => {
            let mut out = frame.data.clone();
            for px in out.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
            out
        }
        PixelFormat::Rgb8 => {
            let mut out = Vec::with_capacity(w * h * 4);
            for px in frame.data.chunks_exact(3) {
                out.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
            out
        }
        PixelFormat::Nv21 => yuv420_to_rgba8(&frame.data, w, h, |plane, cw, cx, cy| {
            let i = (cy * cw + cx) * 2;
            // NV21 interleaves V before U.
            (plane[i + 1], plane[i])
        }),
        PixelFormat::I420 => {
            let cw = w.div_ceil(2);
            let ch = h.div_ceil(2);
            yuv420_to_rgba8(&frame.data, w, h, move |plane, _, cx, cy| {
                let i = cy * cw + cx;
                (plane[i], plane[cw * ch + i])
            })
        }
    };

    let mut out = frame.with_pixels(frame.width, frame.height, rgba);
    out.format = PixelFormat::Rgba8;
    Ok(out)
}

fn yuv420_to_rgba8<F>(data: &[u8], w: usize, h: usize, chroma_at: F) -> Vec<u8>
where
    F: Fn(&[u8], usize, usize, usize) -> (u8, u8),
{
    let cw = w.div_ceil(2);
    let (luma, chroma) = data.split_at(w * h);
    let mut out = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let yy = f32::from(luma[y * w + x]);
            let (u, v) = chroma_at(chroma, cw, x / 2, y / 2);
            let u = f32::from(u) - 128.0;
            let v = f32::from(v) - 128.0;
            let o = (y * w + x) * 4;
            out[o] = clamp_u8(yy + 1.402 * v);
            out[o + 1] = clamp_u8(yy - 0.344_136 * u - 0.714_136 * v);
            out[o + 2] = clamp_u8(yy + 1.772 * u);
            out[o + 3] = 255;
        }
    }
    out
}

/// Convert RGBA8 pixels into a 4:2:0 buffer, writing into `dst` (resized as needed).
///
/// Chroma is the average of each 2x2 block; odd edges average the pixels that exist.
pub fn rgba8_to_yuv420(
    src: &[u8],
    width: u32,
    height: u32,
    layout: ChromaLayout,
    dst: &mut Vec<u8>,
) -> BitterResult<()> {
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 || src.len() != w * h * 4 {
        return Err(BitterError::validation(
            "rgba8_to_yuv420 expects a non-empty tightly packed rgba8 buffer",
        ));
    }
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);
    dst.clear();
    dst.resize(w * h + 2 * cw * ch, 0);

    let (luma, chroma) = dst.split_at_mut(w * h);
    for (i, px) in src.chunks_exact(4).enumerate() {
        let (r, g, b) = (f32::from(px[0]), f32::from(px[1]), f32::from(px[2]));
        luma[i] = clamp_u8(0.299 * r + 0.587 * g + 0.114 * b);
    }

    for cy in 0..ch {
        for cx in 0..cw {
            let (mut su, mut sv, mut n) = (0.0f32, 0.0f32, 0.0f32);
            for y in (cy * 2)..((cy * 2 + 2).min(h)) {
                for x in (cx * 2)..((cx * 2 + 2).min(w)) {
                    let o = (y * w + x) * 4;
                    let (r, g, b) = (f32::from(src[o]), f32::from(src[o + 1]), f32::from(src[o + 2]));
                    su += -0.168_736 * r - 0.331_264 * g + 0.5 * b + 128.0;
                    sv += 0.5 * r - 0.418_688 * g - 0.081_312 * b + 128.0;
                    n += 1.0;
                }
            }
            let (u, v) = (clamp_u8(su / n), clamp_u8(sv / n));
            let ci = cy * cw + cx;
            match layout {
                ChromaLayout::I420 => {
                    chroma[ci] = u;
                    chroma[cw * ch + ci] = v;
                }
                ChromaLayout::Nv12 => {
                    chroma[ci * 2] = u;
                    chroma[ci * 2 + 1] = v;
                }
            }
        }
    }
    Ok(())
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/frame/convert.rs"]
mod tests;
