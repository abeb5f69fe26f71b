use crate::foundation::core::{Facing, Frame, Rotation};
use crate::foundation::error::{BitterError, BitterResult};
use crate::frame::convert::to_rgba8;

pub fn rotate(frame: Frame, rotation: Rotation) -> BitterResult<Frame> {
    let bpp = frame.format.packed_bytes_per_pixel().ok_or_else(|| {
        BitterError::validation(format!("cannot rotate planar {:?} frame", frame.format))
    })?;
    if rotation == Rotation::Deg0 {
        return Ok(frame);
    }

    let (w, h) = (frame.width as usize, frame.height as usize);
    let (dw, dh) = if rotation.swaps_axes() { (h, w) } else { (w, h) };
    let mut out = vec![0u8; frame.data.len()];
    for y in 0..h {
        for x in 0..w {
            let (dx, dy) = match rotation {
                Rotation::Deg0 => (x, y),
                Rotation::Deg90 => (h - 1 - y, x),
                Rotation::Deg180 => (w - 1 - x, h - 1 - y),
                Rotation::Deg270 => (y, w - 1 - x),
            };
            let s = (y * w + x) * bpp;
            let d = (dy * dw + dx) * bpp;
            out[d..d + bpp].copy_from_slice(&frame.data[s..s + bpp]);
        }
    }

    let mut rotated = frame.with_pixels(dw as u32, dh as u32, out);
    rotated.rotation = Rotation::Deg0;
    Ok(rotated)
}

pub fn mirror_horizontal(frame: &mut Frame) -> BitterResult<()> {
    let bpp = frame.format.packed_bytes_per_pixel().ok_or_else(|| {
        BitterError::validation(format!("cannot mirror planar {:?} frame", frame.format))
    })?;
    let row_len = frame.width as usize * bpp;
    for row in frame.data.chunks_exact_mut(row_len) {
        let w = frame.width as usize;
        for x in 0..w / 2 {
            let a = x * bpp;
            let b = (w - 1 - x) * bpp;
            for c in 0..bpp {
                row.swap(a + c, b + c);
            }
        }
    }
    Ok(())
}

/// Bring a captured frame into the canonical processing layout: upright RGBA8, mirrored when it
/// came from the front camera.
pub fn normalize_for_processing(frame: Frame) -> BitterResult<Frame> {
    let rotation = frame.rotation;
    let facing = frame.facing;
    let mut out = rotate(to_rgba8(frame)?, rotation)?;
    if facing == Facing::Front {
        mirror_horizontal(&mut out)?;
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/frame/orient.rs"]
mod tests;
