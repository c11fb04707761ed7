//! Color-area statistics over a raster rectangle.
//!
//! One pass over the rectangle accumulates min/max/sum of raw RGBA and of
//! the secondary color space (with brightness in the 4th channel), then
//! finishes with means and ranges.
//!
//! Pixels come from a `PixelSource`, so the CPU-composited video layers and
//! the GPU read-back float buffer produce statistics of the same shape.

use glam::{IVec2, UVec2};
use serde::{Deserialize, Serialize};

use super::spaces::{to_color_space, BrightnessType, Color4f, ColorSpace, VideoLevels};
use crate::entities::space::Box2i;

/// Random access to composited RGBA pixels in raster space.
pub trait PixelSource {
    fn size(&self) -> UVec2;
    /// None when the pixel is outside the source or the source is empty.
    fn pixel(&self, x: i32, y: i32) -> Option<Color4f>;
}

/// RGBA float buffer, pixel (x, y) at `(x + w * y) * 4`.
pub struct FloatBufferView<'a> {
    pub size: UVec2,
    pub data: &'a [f32],
}

impl<'a> FloatBufferView<'a> {
    pub fn new(size: UVec2, data: &'a [f32]) -> Self {
        Self { size, data }
    }
}

impl PixelSource for FloatBufferView<'_> {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn pixel(&self, x: i32, y: i32) -> Option<Color4f> {
        if x < 0 || y < 0 || x >= self.size.x as i32 || y >= self.size.y as i32 {
            return None;
        }
        let idx = (x as usize + self.size.x as usize * y as usize) * 4;
        self.data.get(idx..idx + 4).map(Color4f::from_slice)
    }
}

/// Min / max / mean / range of four channels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelStats {
    pub min: Color4f,
    pub max: Color4f,
    pub mean: Color4f,
    pub diff: Color4f,
}

/// Statistics of one rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Info {
    pub bbox: Box2i,
    pub rgba: ChannelStats,
    /// Secondary color space, brightness in `a`.
    pub hsv: ChannelStats,
}

/// Which secondary space and brightness the statistics use.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AreaOptions {
    pub space: ColorSpace,
    pub brightness: BrightnessType,
    pub levels: VideoLevels,
}

#[derive(Clone, Copy)]
struct Accum {
    min: Color4f,
    max: Color4f,
    sum: Color4f,
}

impl Accum {
    fn new() -> Self {
        Self {
            min: Color4f::splat(f32::INFINITY),
            max: Color4f::splat(f32::NEG_INFINITY),
            sum: Color4f::splat(0.0),
        }
    }

    #[inline]
    fn add(&mut self, c: Color4f) {
        self.min = self.min.min(c);
        self.max = self.max.max(c);
        self.sum += c;
    }

    fn finish(self, count: f32) -> ChannelStats {
        ChannelStats {
            min: self.min,
            max: self.max,
            mean: self.sum / count,
            diff: self.max - self.min,
        }
    }
}

/// Compute statistics of `bbox` (inclusive corners).
///
/// Returns None for a degenerate box or when no pixel of the box is
/// readable; callers clear their summary in that case.
pub fn compute(bbox: Box2i, src: &dyn PixelSource, opts: &AreaOptions) -> Option<Info> {
    if bbox.is_none() {
        return None;
    }
    let bbox = bbox.normalized();
    if bbox.is_degenerate() {
        return None;
    }

    let size = src.size().as_ivec2();
    if size.x <= 0 || size.y <= 0 {
        return None;
    }
    let lo = bbox.min.max(IVec2::ZERO);
    let hi = bbox.max.min(size - IVec2::ONE);

    let mut rgba = Accum::new();
    let mut secondary = Accum::new();
    let mut count = 0usize;

    for y in lo.y..=hi.y {
        for x in lo.x..=hi.x {
            let Some(px) = src.pixel(x, y) else {
                continue;
            };
            rgba.add(px);
            secondary.add(to_color_space(&px, opts.space, opts.brightness, opts.levels));
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }

    let n = count as f32;
    Some(Info {
        bbox,
        rgba: rgba.finish(n),
        hsv: secondary.finish(n),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(w: u32, h: u32, f: impl Fn(u32, u32) -> [f32; 4]) -> Vec<f32> {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&f(x, y));
            }
        }
        data
    }

    #[test]
    fn test_uniform_area() {
        let data = image(8, 8, |_, _| [0.25, 0.5, 0.75, 1.0]);
        let src = FloatBufferView::new(UVec2::new(8, 8), &data);
        let bbox = Box2i::new(IVec2::new(1, 1), IVec2::new(4, 5));
        let info = compute(bbox, &src, &AreaOptions::default()).expect("stats");
        assert!(info.rgba.mean.approx_eq(&Color4f::new(0.25, 0.5, 0.75, 1.0), 1e-6));
        assert!(info.rgba.diff.approx_eq(&Color4f::splat(0.0), 1e-6));
        assert_eq!(info.bbox, bbox);
    }

    #[test]
    fn test_gradient_min_max_mean() {
        let data = image(4, 2, |x, _| [x as f32, 0.0, 0.0, 1.0]);
        let src = FloatBufferView::new(UVec2::new(4, 2), &data);
        let bbox = Box2i::new(IVec2::new(0, 0), IVec2::new(3, 1));
        let info = compute(bbox, &src, &AreaOptions::default()).expect("stats");
        assert_eq!(info.rgba.min.r, 0.0);
        assert_eq!(info.rgba.max.r, 3.0);
        assert!((info.rgba.mean.r - 1.5).abs() < 1e-6);
        assert_eq!(info.rgba.diff.r, 3.0);
        // HSV value channel tracks max(r, g, b)
        assert_eq!(info.hsv.max.b, 3.0);
    }

    #[test]
    fn test_degenerate_box_is_cleared() {
        let data = image(4, 4, |_, _| [1.0, 1.0, 1.0, 1.0]);
        let src = FloatBufferView::new(UVec2::new(4, 4), &data);
        let flat_x = Box2i::new(IVec2::new(2, 0), IVec2::new(2, 3));
        let flat_y = Box2i::new(IVec2::new(0, 1), IVec2::new(3, 1));
        assert!(compute(flat_x, &src, &AreaOptions::default()).is_none());
        assert!(compute(flat_y, &src, &AreaOptions::default()).is_none());
        assert!(compute(Box2i::NONE, &src, &AreaOptions::default()).is_none());
    }

    #[test]
    fn test_box_outside_source_is_cleared() {
        let data = image(4, 4, |_, _| [1.0, 1.0, 1.0, 1.0]);
        let src = FloatBufferView::new(UVec2::new(4, 4), &data);
        let bbox = Box2i::new(IVec2::new(10, 10), IVec2::new(20, 20));
        assert!(compute(bbox, &src, &AreaOptions::default()).is_none());
    }

    #[test]
    fn test_no_nan_in_results() {
        let data = image(3, 3, |x, y| [x as f32 * 0.1, y as f32 * 0.2, 0.0, 1.0]);
        let src = FloatBufferView::new(UVec2::new(3, 3), &data);
        let bbox = Box2i::new(IVec2::new(0, 0), IVec2::new(2, 2));
        for space in ColorSpace::ALL {
            let opts = AreaOptions { space, ..AreaOptions::default() };
            let info = compute(bbox, &src, &opts).expect("stats");
            for c in [info.hsv.min, info.hsv.max, info.hsv.mean, info.hsv.diff] {
                assert!(c.to_array().iter().all(|v| v.is_finite()), "{:?}", space);
            }
        }
    }
}
