use crate::foundation::core::Point;
use crate::foundation::error::{BitterError, BitterResult};
use crate::foundation::math::falloff;

/// Dense per-pixel source-coordinate map.
///
/// `source_at(x, y)` is the coordinate the resampler reads for output pixel `(x, y)`. A fresh grid
/// is the identity; operators only write inside their influence radius.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpGrid {
    width: u32,
    height: u32,
    map_x: Vec<f32>,
    map_y: Vec<f32>,
}

impl WarpGrid {
    pub fn identity(width: u32, height: u32) -> BitterResult<Self> {
        if width == 0 || height == 0 {
            return Err(BitterError::validation("warp grid width/height must be non-zero"));
        }
        let (w, h) = (width as usize, height as usize);
        let mut map_x = Vec::with_capacity(w * h);
        let mut map_y = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                map_x.push(x as f32);
                map_y.push(y as f32);
            }
        }
        Ok(Self {
            width,
            height,
            map_x,
            map_y,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn source_at(&self, x: u32, y: u32) -> (f32, f32) {
        let i = self.index(x, y);
        (self.map_x[i], self.map_y[i])
    }

    pub fn displacement_at(&self, x: u32, y: u32) -> (f32, f32) {
        let (sx, sy) = self.source_at(x, y);
        (sx - x as f32, sy - y as f32)
    }

    pub fn is_identity_at(&self, x: u32, y: u32) -> bool {
        self.source_at(x, y) == (x as f32, y as f32)
    }

    pub fn is_identity(&self) -> bool {
        (0..self.height).all(|y| (0..self.width).all(|x| self.is_identity_at(x, y)))
    }

    pub(crate) fn map_x(&self) -> &[f32] {
        &self.map_x
    }

    pub(crate) fn map_y(&self) -> &[f32] {
        &self.map_y
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Visit every pixel strictly inside `max_dist` of `anchor`.
    ///
    /// The callback receives the pixel coordinate, its linear falloff weight and mutable access to
    /// the grid entry. Pixels at or beyond the radius are never visited.
    pub(crate) fn visit_radius<F>(&mut self, anchor: Point, max_dist: f64, mut f: F)
    where
        F: FnMut(Point, f64, &mut f32, &mut f32),
    {
        if !max_dist.is_finite() || max_dist <= 0.0 || !anchor.is_finite() {
            return;
        }
        let max_x = f64::from(self.width - 1);
        let max_y = f64::from(self.height - 1);
        let x0 = (anchor.x - max_dist).floor().clamp(0.0, max_x) as u32;
        let x1 = (anchor.x + max_dist).ceil().clamp(0.0, max_x) as u32;
        let y0 = (anchor.y - max_dist).floor().clamp(0.0, max_y) as u32;
        let y1 = (anchor.y + max_dist).ceil().clamp(0.0, max_y) as u32;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Point::new(f64::from(x), f64::from(y));
                let dist = p.distance(anchor);
                if dist >= max_dist {
                    continue;
                }
                let w = falloff(max_dist, dist);
                let i = self.index(x, y);
                let (mx, my) = (&mut self.map_x[i], &mut self.map_y[i]);
                f(p, w, mx, my);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/warp/grid.rs"]
mod tests;
