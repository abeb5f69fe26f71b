use rayon::prelude::*;

use crate::foundation::core::Frame;
use crate::foundation::error::{BitterError, BitterResult};
use crate::warp::grid::WarpGrid;

/// Resample `src` at the grid's source coordinates with bilinear interpolation.
///
/// Source coordinates are clamped to the image border. Rows are processed in parallel; the input
/// frame is never modified.
pub fn remap_bilinear(src: &Frame, grid: &WarpGrid) -> BitterResult<Frame> {
    let bpp = src.format.packed_bytes_per_pixel().ok_or_else(|| {
        BitterError::validation(format!("cannot remap planar {:?} frame", src.format))
    })?;
    if grid.width() != src.width || grid.height() != src.height {
        return Err(BitterError::validation(format!(
            "warp grid {}x{} does not match frame {}x{}",
            grid.width(),
            grid.height(),
            src.width,
            src.height
        )));
    }

    let (w, h) = (src.width as usize, src.height as usize);
    let row_len = w * bpp;
    let max_x = (w - 1) as f32;
    let max_y = (h - 1) as f32;
    let map_x = grid.map_x();
    let map_y = grid.map_y();
    let data = &src.data;

    let mut out = vec![0u8; src.data.len()];
    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                let i = y * w + x;
                let sx = map_x[i].clamp(0.0, max_x);
                let sy = map_y[i].clamp(0.0, max_y);
                let x0 = sx.floor() as usize;
                let y0 = sy.floor() as usize;
                let x1 = (x0 + 1).min(w - 1);
                let y1 = (y0 + 1).min(h - 1);
                let fx = sx - x0 as f32;
                let fy = sy - y0 as f32;

                let p00 = (y0 * w + x0) * bpp;
                let p10 = (y0 * w + x1) * bpp;
                let p01 = (y1 * w + x0) * bpp;
                let p11 = (y1 * w + x1) * bpp;
                let dst = &mut row[x * bpp..(x + 1) * bpp];
                for (c, d) in dst.iter_mut().enumerate() {
                    let top = f32::from(data[p00 + c]) * (1.0 - fx) + f32::from(data[p10 + c]) * fx;
                    let bot = f32::from(data[p01 + c]) * (1.0 - fx) + f32::from(data[p11 + c]) * fx;
                    *d = (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
                }
            }
        });

    Ok(src.with_pixels(src.width, src.height, out))
}

#[cfg(test)]
#[path = "../../tests/unit/warp/remap.rs"]
mod tests;
