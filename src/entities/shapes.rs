//! Annotation shapes.
//!
//! A closed set of drawable variants. Points are stored in raster space.
//! Arrow and rectangle shapes are created with five points; points 1..4 are
//! rewritten while the user drags. Paths and polygons grow by appending.
//!
//! `triangles()` tessellates a shape into a flat triangle list for GPU
//! backends. Text has no triangles; hosts draw it with their font system.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::spaces::Color4f;

/// Arrow head half-angle.
const ARROW_THETA: f32 = std::f32::consts::FRAC_PI_4;
/// Arrow head width at a 1024 pixel wide render.
const ARROW_WIDTH_1K: f32 = 35.0;
const CIRCLE_SEGMENTS: usize = 64;

/// Attributes shared by every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeBase {
    pub id: Uuid,
    pub points: Vec<Vec2>,
    pub color: Color4f,
    pub pen_size: f32,
    pub soft: bool,
    pub laser: bool,
    /// Laser fade factor, 1 when fully visible.
    pub fade: f32,
}

impl ShapeBase {
    pub fn new(color: Color4f, pen_size: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            points: Vec::new(),
            color,
            pen_size,
            soft: false,
            laser: false,
            fade: 1.0,
        }
    }

    /// Color with the laser fade applied.
    pub fn draw_color(&self) -> Color4f {
        self.color.with_alpha(self.color.a * self.fade.clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleShape {
    pub base: ShapeBase,
    pub center: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextShape {
    pub base: ShapeBase,
    pub text: String,
    pub font: String,
    pub font_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Path,
    ErasePath,
    Arrow,
    Circle,
    FilledCircle,
    Rectangle,
    FilledRectangle,
    Polygon,
    FilledPolygon,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    Path(ShapeBase),
    ErasePath(ShapeBase),
    Arrow(ShapeBase),
    Circle(CircleShape),
    FilledCircle(CircleShape),
    Rectangle(ShapeBase),
    FilledRectangle(ShapeBase),
    Polygon(ShapeBase),
    FilledPolygon(ShapeBase),
    Text(TextShape),
}

impl Shape {
    /// New shape of `kind` starting at raster point `p`.
    pub fn start(kind: ShapeKind, base: ShapeBase, p: Vec2) -> Self {
        let mut base = base;
        match kind {
            ShapeKind::Arrow | ShapeKind::Rectangle | ShapeKind::FilledRectangle => {
                base.points = vec![p; 5];
            }
            _ => base.points = vec![p],
        }
        match kind {
            ShapeKind::Path => Shape::Path(base),
            ShapeKind::ErasePath => Shape::ErasePath(base),
            ShapeKind::Arrow => Shape::Arrow(base),
            ShapeKind::Rectangle => Shape::Rectangle(base),
            ShapeKind::FilledRectangle => Shape::FilledRectangle(base),
            ShapeKind::Polygon => Shape::Polygon(base),
            ShapeKind::FilledPolygon => Shape::FilledPolygon(base),
            ShapeKind::Circle => Shape::Circle(CircleShape { base, center: p, radius: 0.0 }),
            ShapeKind::FilledCircle => Shape::FilledCircle(CircleShape { base, center: p, radius: 0.0 }),
            ShapeKind::Text => Shape::Text(TextShape {
                base,
                text: String::new(),
                font: String::new(),
                font_size: 30,
            }),
        }
    }

    pub fn text(base: ShapeBase, p: Vec2, text: String, font: String, font_size: u32) -> Self {
        let mut base = base;
        base.points = vec![p];
        Shape::Text(TextShape { base, text, font, font_size })
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Path(_) => ShapeKind::Path,
            Shape::ErasePath(_) => ShapeKind::ErasePath,
            Shape::Arrow(_) => ShapeKind::Arrow,
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::FilledCircle(_) => ShapeKind::FilledCircle,
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::FilledRectangle(_) => ShapeKind::FilledRectangle,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::FilledPolygon(_) => ShapeKind::FilledPolygon,
            Shape::Text(_) => ShapeKind::Text,
        }
    }

    pub fn base(&self) -> &ShapeBase {
        match self {
            Shape::Path(b)
            | Shape::ErasePath(b)
            | Shape::Arrow(b)
            | Shape::Rectangle(b)
            | Shape::FilledRectangle(b)
            | Shape::Polygon(b)
            | Shape::FilledPolygon(b) => b,
            Shape::Circle(c) | Shape::FilledCircle(c) => &c.base,
            Shape::Text(t) => &t.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ShapeBase {
        match self {
            Shape::Path(b)
            | Shape::ErasePath(b)
            | Shape::Arrow(b)
            | Shape::Rectangle(b)
            | Shape::FilledRectangle(b)
            | Shape::Polygon(b)
            | Shape::FilledPolygon(b) => b,
            Shape::Circle(c) | Shape::FilledCircle(c) => &mut c.base,
            Shape::Text(t) => &mut t.base,
        }
    }

    pub fn id(&self) -> Uuid {
        self.base().id
    }

    pub fn is_laser(&self) -> bool {
        self.base().laser
    }

    /// Append a point to a growing shape. Returns false for fixed-layout variants.
    pub fn push_point(&mut self, p: Vec2) -> bool {
        match self {
            Shape::Path(b) | Shape::ErasePath(b) | Shape::Polygon(b) | Shape::FilledPolygon(b) => {
                b.points.push(p);
                true
            }
            _ => false,
        }
    }

    /// Live update while dragging to raster point `p`.
    ///
    /// `render_width` scales the arrow head.
    pub fn drag_to(&mut self, p: Vec2, render_width: u32) {
        match self {
            Shape::Path(b) | Shape::ErasePath(b) => b.points.push(p),
            Shape::Polygon(b) | Shape::FilledPolygon(b) => {
                if let Some(last) = b.points.last_mut() {
                    *last = p;
                }
            }
            Shape::Arrow(b) => update_arrow(&mut b.points, p, render_width),
            Shape::Rectangle(b) | Shape::FilledRectangle(b) => update_rectangle(&mut b.points, p),
            Shape::Circle(c) | Shape::FilledCircle(c) => c.radius = c.center.distance(p),
            Shape::Text(t) => {
                if let Some(first) = t.base.points.first_mut() {
                    *first = p;
                }
            }
        }
    }

    /// Flat triangle list covering the shape.
    pub fn triangles(&self) -> Vec<Vec2> {
        let mut out = Vec::new();
        match self {
            Shape::Path(b) | Shape::ErasePath(b) => {
                stroke(&mut out, &b.points, b.pen_size, false);
                if b.points.len() == 1 {
                    fill_disc(&mut out, b.points[0], b.pen_size * 0.5);
                }
            }
            Shape::Arrow(b) => stroke(&mut out, &b.points, b.pen_size, false),
            Shape::Rectangle(b) => stroke(&mut out, &b.points, b.pen_size, false),
            Shape::Polygon(b) => stroke(&mut out, &b.points, b.pen_size, true),
            Shape::FilledRectangle(b) => fill_fan(&mut out, &b.points[..b.points.len().min(4)]),
            Shape::FilledPolygon(b) => fill_fan(&mut out, &b.points),
            Shape::Circle(c) => {
                let ring = circle_points(c.center, c.radius);
                stroke(&mut out, &ring, c.base.pen_size, true);
            }
            Shape::FilledCircle(c) => fill_disc(&mut out, c.center, c.radius),
            Shape::Text(_) => {}
        }
        out
    }
}

/// Arrow head: tip at `p`, barbs at 45 degrees, width proportional to the
/// render width.
fn update_arrow(points: &mut [Vec2], p: Vec2, render_width: u32) {
    if points.len() < 5 {
        return;
    }
    let p0 = points[0];
    let line = p - p0;
    let len = line.length();
    if len <= f32::EPSILON {
        return;
    }
    let width = ARROW_WIDTH_1K * render_width as f32 / 1024.0;
    let t_on_line = width / (2.0 * (ARROW_THETA.tan() / 2.0) * len);
    let on_line = p - t_on_line * line;
    let normal = Vec2::new(-line.y, line.x);
    let t_normal = width / (2.0 * len);
    points[1] = p;
    points[2] = on_line + t_normal * normal;
    points[3] = p;
    points[4] = on_line - t_normal * normal;
}

/// Closed outline from the press corner `points[0]` to `p`.
fn update_rectangle(points: &mut [Vec2], p: Vec2) {
    if points.len() < 5 {
        return;
    }
    let p0 = points[0];
    points[1] = Vec2::new(p.x, p0.y);
    points[2] = p;
    points[3] = Vec2::new(p0.x, p.y);
    points[4] = p0;
}

fn circle_points(center: Vec2, radius: f32) -> Vec<Vec2> {
    (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let a = i as f32 / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
            center + Vec2::new(a.cos(), a.sin()) * radius
        })
        .collect()
}

fn fill_disc(out: &mut Vec<Vec2>, center: Vec2, radius: f32) {
    let ring = circle_points(center, radius);
    for i in 0..ring.len() {
        out.extend_from_slice(&[center, ring[i], ring[(i + 1) % ring.len()]]);
    }
}

fn fill_fan(out: &mut Vec<Vec2>, points: &[Vec2]) {
    if points.len() < 3 {
        return;
    }
    for i in 1..points.len() - 1 {
        out.extend_from_slice(&[points[0], points[i], points[i + 1]]);
    }
}

/// Thick polyline as one quad per segment.
fn stroke(out: &mut Vec<Vec2>, points: &[Vec2], width: f32, closed: bool) {
    let half = width.max(1.0) * 0.5;
    let mut segment = |a: Vec2, b: Vec2| {
        let d = b - a;
        let len = d.length();
        if len <= f32::EPSILON {
            return;
        }
        let dir = d / len;
        let n = Vec2::new(-dir.y, dir.x) * half;
        // Extend by half width so joints overlap.
        let a = a - dir * half;
        let b = b + dir * half;
        out.extend_from_slice(&[a + n, b + n, b - n, a + n, b - n, a - n]);
    };
    for w in points.windows(2) {
        segment(w[0], w[1]);
    }
    if closed && points.len() > 2 {
        segment(points[points.len() - 1], points[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ShapeBase {
        ShapeBase::new(Color4f::new(1.0, 0.0, 0.0, 1.0), 4.0)
    }

    #[test]
    fn test_fixed_point_shapes_preallocate_five() {
        for kind in [ShapeKind::Arrow, ShapeKind::Rectangle, ShapeKind::FilledRectangle] {
            let s = Shape::start(kind, base(), Vec2::new(3.0, 4.0));
            assert_eq!(s.base().points.len(), 5);
        }
        let s = Shape::start(ShapeKind::Path, base(), Vec2::ZERO);
        assert_eq!(s.base().points.len(), 1);
    }

    #[test]
    fn test_rectangle_drag() {
        let mut s = Shape::start(ShapeKind::Rectangle, base(), Vec2::new(10.0, 10.0));
        s.drag_to(Vec2::new(50.0, 80.0), 1024);
        let pts = &s.base().points;
        assert_eq!(pts[1], Vec2::new(50.0, 10.0));
        assert_eq!(pts[2], Vec2::new(50.0, 80.0));
        assert_eq!(pts[3], Vec2::new(10.0, 80.0));
        assert_eq!(pts[4], Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_arrow_head_geometry() {
        let mut s = Shape::start(ShapeKind::Arrow, base(), Vec2::ZERO);
        s.drag_to(Vec2::new(100.0, 0.0), 1024);
        let pts = &s.base().points;
        assert_eq!(pts[1], Vec2::new(100.0, 0.0));
        assert_eq!(pts[3], Vec2::new(100.0, 0.0));
        // tan(45) == 1: point on line sits `width` back from the tip
        assert!((pts[2].x - 65.0).abs() < 1e-3);
        assert!((pts[4].x - 65.0).abs() < 1e-3);
        assert!((pts[2].y - 17.5).abs() < 1e-3);
        assert!((pts[4].y + 17.5).abs() < 1e-3);
    }

    #[test]
    fn test_arrow_zero_length_is_ignored() {
        let mut s = Shape::start(ShapeKind::Arrow, base(), Vec2::ONE);
        s.drag_to(Vec2::ONE, 1024);
        assert!(s.base().points.iter().all(|p| *p == Vec2::ONE));
    }

    #[test]
    fn test_path_appends_polygon_moves_last() {
        let mut path = Shape::start(ShapeKind::Path, base(), Vec2::ZERO);
        path.drag_to(Vec2::ONE, 1024);
        path.drag_to(Vec2::new(2.0, 2.0), 1024);
        assert_eq!(path.base().points.len(), 3);

        let mut poly = Shape::start(ShapeKind::Polygon, base(), Vec2::ZERO);
        assert!(poly.push_point(Vec2::ONE));
        poly.drag_to(Vec2::new(5.0, 5.0), 1024);
        assert_eq!(poly.base().points, vec![Vec2::ZERO, Vec2::new(5.0, 5.0)]);
        let mut rect = Shape::start(ShapeKind::Rectangle, base(), Vec2::ZERO);
        assert!(!rect.push_point(Vec2::ONE));
    }

    #[test]
    fn test_circle_radius_and_triangles() {
        let mut c = Shape::start(ShapeKind::FilledCircle, base(), Vec2::ZERO);
        c.drag_to(Vec2::new(3.0, 4.0), 1024);
        let Shape::FilledCircle(circle) = &c else {
            panic!("wrong variant");
        };
        assert_eq!(circle.radius, 5.0);
        assert_eq!(c.triangles().len(), CIRCLE_SEGMENTS * 3);
    }

    #[test]
    fn test_laser_fade_color() {
        let mut b = base();
        b.fade = 0.5;
        assert_eq!(b.draw_color().a, 0.5);
    }

    #[test]
    fn test_serde_tagged() {
        let s = Shape::start(ShapeKind::Circle, base(), Vec2::ZERO);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["type"], "Circle");
        let back: Shape = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
