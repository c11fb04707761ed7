//! Raster-space geometry.
//!
//! ## Coordinate Spaces
//!
//! - **Raster space**: pixels of the rendered frame, origin top-left, +Y down.
//!   Annotations, selections and pixel queries all live here.
//! - **Window space**: pixels of the viewport widget, origin top-left, +Y down.
//!   Pointer events arrive in this space.
//!
//! The mapping between the two is owned by `ViewportState` (pan/zoom/rotation).

use glam::{IVec2, UVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Integer pixel rectangle, inclusive on both ends.
///
/// `max.x == -1` marks "no selection".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Box2i {
    pub min: IVec2,
    pub max: IVec2,
}

impl Default for Box2i {
    fn default() -> Self {
        Self::NONE
    }
}

impl Box2i {
    /// Empty selection sentinel.
    pub const NONE: Box2i = Box2i {
        min: IVec2::new(0, 0),
        max: IVec2::new(-1, -1),
    };

    pub fn new(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    pub fn is_none(&self) -> bool {
        self.max.x == -1
    }

    /// Swap corners so that min <= max on both axes.
    pub fn normalized(&self) -> Self {
        Self {
            min: self.min.min(self.max),
            max: self.min.max(self.max),
        }
    }

    /// True when the box collapses on either axis.
    pub fn is_degenerate(&self) -> bool {
        self.min.x == self.max.x || self.min.y == self.max.y
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y + 1
    }

    pub fn contains(&self, p: IVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn to_f32(&self) -> Box2f {
        Box2f::new(self.min.as_vec2(), self.max.as_vec2() + Vec2::ONE)
    }
}

/// Float rectangle in raster space (min inclusive, max exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Box2f {
    pub min: Vec2,
    pub max: Vec2,
}

impl Box2f {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_size(size: UVec2) -> Self {
        Self::new(Vec2::ZERO, size.as_vec2())
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn area(&self) -> f32 {
        let s = self.size();
        s.x.max(0.0) * s.y.max(0.0)
    }

    /// Scale around the center.
    pub fn scaled(&self, factor: f32) -> Self {
        let c = self.center();
        let half = self.size() * 0.5 * factor;
        Self::new(c - half, c + half)
    }

    /// Corner points in drawing order (closed outline without repeat).
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }
}

/// Clamp a raster position into `[0, size)`.
#[inline]
pub fn clamp_to_render(p: IVec2, size: UVec2) -> IVec2 {
    let max = size.as_ivec2() - IVec2::ONE;
    p.clamp(IVec2::ZERO, max.max(IVec2::ZERO))
}

/// Float raster position to the pixel it falls in.
#[inline]
pub fn raster_to_pixel(p: Vec2) -> IVec2 {
    p.floor().as_ivec2()
}

/// Rectangle of aspect `aspect` fitted (centered) inside `size`.
pub fn fit_aspect(size: UVec2, aspect: f32) -> Box2f {
    let full = Box2f::from_size(size);
    if size.x == 0 || size.y == 0 || aspect <= 0.0 {
        return full;
    }
    let w = size.x as f32;
    let h = size.y as f32;
    let (fw, fh) = if aspect > w / h { (w, w / aspect) } else { (h * aspect, h) };
    let c = full.center();
    Box2f::new(c - Vec2::new(fw, fh) * 0.5, c + Vec2::new(fw, fh) * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_swaps_corners() {
        let b = Box2i::new(IVec2::new(50, 80), IVec2::new(10, 10)).normalized();
        assert_eq!(b, Box2i::new(IVec2::new(10, 10), IVec2::new(50, 80)));
    }

    #[test]
    fn test_none_sentinel() {
        assert!(Box2i::NONE.is_none());
        assert!(Box2i::default().is_none());
        assert!(!Box2i::new(IVec2::ZERO, IVec2::ONE).is_none());
    }

    #[test]
    fn test_clamp_to_render() {
        let size = UVec2::new(100, 50);
        assert_eq!(clamp_to_render(IVec2::new(-5, 70), size), IVec2::new(0, 49));
        assert_eq!(clamp_to_render(IVec2::new(120, 10), size), IVec2::new(99, 10));
    }

    #[test]
    fn test_fit_aspect_letterbox() {
        let b = fit_aspect(UVec2::new(1920, 1080), 2.35);
        assert!((b.size().x - 1920.0).abs() < 1e-3);
        assert!((b.size().y - 1920.0 / 2.35).abs() < 1e-3);
        assert!((b.center().y - 540.0).abs() < 1e-3);
    }
}
