//! Conversions between egui and viewport types.
//!
//! Conventions:
//! - egui screen space: +Y is down, origin at the window corner.
//! - Viewport window space: +Y is down, origin at the widget's top-left.
//! - Raster space: +Y is down, origin at the video's top-left.

use eframe::egui;
use glam::Vec2;

use crate::color::spaces::Color4f;

/// egui screen position to viewport window space.
pub fn screen_to_window(pos: egui::Pos2, widget: egui::Rect) -> Vec2 {
    Vec2::new(pos.x - widget.min.x, pos.y - widget.min.y)
}

/// Viewport window space to egui screen position.
pub fn window_to_screen(p: Vec2, widget: egui::Rect) -> egui::Pos2 {
    egui::pos2(p.x + widget.min.x, p.y + widget.min.y)
}

pub fn to_egui_vec(v: Vec2) -> egui::Vec2 {
    egui::vec2(v.x, v.y)
}

pub fn from_egui_vec(v: egui::Vec2) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Linear float color to an unmultiplied egui color.
pub fn color32(c: Color4f) -> egui::Color32 {
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(to_u8(c.r), to_u8(c.g), to_u8(c.b), to_u8(c.a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_window_round_trip() {
        let widget = egui::Rect::from_min_size(egui::pos2(100.0, 40.0), egui::vec2(640.0, 360.0));
        let w = screen_to_window(egui::pos2(150.0, 60.0), widget);
        assert_eq!(w, Vec2::new(50.0, 20.0));
        assert_eq!(window_to_screen(w, widget), egui::pos2(150.0, 60.0));
    }

    #[test]
    fn test_color32_clamps() {
        let c = color32(Color4f::new(2.0, -1.0, 0.5, 1.0));
        assert_eq!(c, egui::Color32::from_rgba_unmultiplied(255, 0, 128, 255));
    }
}
