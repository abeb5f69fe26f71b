use crate::foundation::core::{Facing, Frame, Rect};
use crate::foundation::error::BitterResult;
use crate::pipeline::slot::FrameFeed;

/// A running camera (or any frame producer) delivering into a [`FrameFeed`].
pub trait CaptureSource: Send {
    fn stop(&mut self);
}

/// Opens capture sources for a given facing.
pub trait CaptureSourceFactory: Send + Sync {
    fn open(&self, facing: Facing, feed: FrameFeed) -> BitterResult<Box<dyn CaptureSource>>;
}

/// Display surface the worker draws finished frames onto.
pub trait RenderTarget: Send {
    fn size(&self) -> (u32, u32);

    fn draw(&mut self, frame: &Frame, dst: Rect) -> BitterResult<()>;

    fn release(&mut self);
}

/// Destination rect that scales `src` uniformly to cover `dst`, centred.
///
/// The overflow on one axis is cropped by the surface. Zero sizes give [`Rect::ZERO`].
pub fn fill_rect(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Rect {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return Rect::ZERO;
    }
    let (sw, sh) = (f64::from(src_w), f64::from(src_h));
    let (dw, dh) = (f64::from(dst_w), f64::from(dst_h));
    let scale = (dw / sw).max(dh / sh);
    let (w, h) = (sw * scale, sh * scale);
    let x0 = (dw - w) * 0.5;
    let y0 = (dh - h) * 0.5;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/surface.rs"]
mod tests;
