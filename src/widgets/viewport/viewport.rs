//! Viewport state: pan/zoom/rotation plus display toggles.
//!
//! # View transform
//!
//! Raster space (video pixels, +Y down) maps to window space (widget
//! pixels, +Y down) through
//!
//! `V = T(view_pos) * S(view_zoom) * T(c) * R(rotation) * T(-c)`
//!
//! with `c` the render center. `projection_matrix()` returns `V`,
//! `pixel_matrix()` builds the inverse factor by factor. Pointer events use
//! the pixel matrix and drawing uses the projection matrix, so the two must
//! stay exact inverses.

use glam::{Mat4, UVec2, Vec2, Vec3};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::hud::HudFlags;
use super::options::{CompareOptions, DisplayOptions, EnvironmentMapOptions};
use super::tool::ActionMode;
use crate::entities::space::{clamp_to_render, raster_to_pixel, Box2i};

pub const MIN_ZOOM: f32 = 0.01;
pub const MAX_ZOOM: f32 = 120.0;

/// How the view reacts to size changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewportMode {
    /// User controls zoom/pan, nothing auto-adjusts
    Manual,
    /// Frame fits the window and re-fits on resize
    AutoFit,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewportState {
    pub view_pos: Vec2,
    pub view_zoom: f32,
    pub mode: ViewportMode,
    rotation: f32,
    #[serde(skip)]
    video_rotation: f32,
    #[serde(skip)]
    pub viewport_size: UVec2,
    #[serde(skip)]
    pub render_size: UVec2,

    pub action_mode: ActionMode,
    #[serde(skip)]
    pub selection: Box2i,

    pub compare: CompareOptions,
    pub env_map: EnvironmentMapOptions,
    pub display: DisplayOptions,

    pub hud: HudFlags,
    pub safe_areas: bool,
    pub data_window: bool,
    pub display_window: bool,
    /// Target aspect of the crop mask, 0 disables masking.
    pub masking: f32,
    pub show_annotations: bool,
    pub presentation: bool,
    pub full_screen: bool,
    /// Physical monitor index, keys the color-management override.
    #[serde(skip)]
    pub monitor: usize,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            view_pos: Vec2::ZERO,
            view_zoom: 1.0,
            mode: ViewportMode::AutoFit,
            rotation: 0.0,
            video_rotation: 0.0,
            viewport_size: UVec2::ZERO,
            render_size: UVec2::ZERO,
            action_mode: ActionMode::Scrub,
            selection: Box2i::NONE,
            compare: CompareOptions::default(),
            env_map: EnvironmentMapOptions::default(),
            display: DisplayOptions::default(),
            hud: HudFlags::NONE,
            safe_areas: false,
            data_window: false,
            display_window: false,
            masking: 0.0,
            show_annotations: true,
            presentation: false,
            full_screen: false,
            monitor: 0,
        }
    }
}

/// Wrap degrees into [0, 360).
pub fn normalize_degrees(deg: f32) -> f32 {
    let d = deg.rem_euclid(360.0);
    if d >= 360.0 { 0.0 } else { d }
}

impl ViewportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// User rotation plus video metadata rotation, in [0, 360).
    pub fn rotation(&self) -> f32 {
        normalize_degrees(self.rotation + self.video_rotation)
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = normalize_degrees(degrees);
        if self.mode == ViewportMode::AutoFit {
            self.frame_view();
        }
    }

    pub fn set_video_rotation(&mut self, degrees: f32) {
        self.video_rotation = normalize_degrees(degrees);
    }

    /// Rotated by a quarter or three quarters of a turn.
    fn is_sideways(&self) -> bool {
        let r = self.rotation();
        (r - 90.0).abs() < 1e-3 || (r - 270.0).abs() < 1e-3
    }

    pub fn set_viewport_size(&mut self, size: UVec2) {
        if self.viewport_size == size {
            return;
        }
        self.viewport_size = size;
        if self.mode == ViewportMode::AutoFit {
            self.frame_view();
        }
    }

    pub fn set_render_size(&mut self, size: UVec2) {
        if self.render_size == size {
            return;
        }
        debug!("render size {}x{}", size.x, size.y);
        self.render_size = size;
        if self.mode == ViewportMode::AutoFit {
            self.frame_view();
        }
    }

    fn render_center(&self) -> Vec2 {
        self.render_size.as_vec2() * 0.5
    }

    fn viewport_center(&self) -> Vec2 {
        self.viewport_size.as_vec2() * 0.5
    }

    /// Zoom keeping the window point `focus` fixed on screen.
    pub fn set_view_zoom(&mut self, zoom: f32, focus: Vec2) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if !zoom.is_finite() || zoom == self.view_zoom {
            return;
        }
        let ratio = zoom / self.view_zoom;
        self.view_pos = focus + (self.view_pos - focus) * ratio;
        self.view_zoom = zoom;
        self.mode = ViewportMode::Manual;
        debug!("Zoom: {:.3}x, Pos: ({:.1}, {:.1})", self.view_zoom, self.view_pos.x, self.view_pos.y);
    }

    /// Zoom anchored at the viewport center.
    pub fn set_view_zoom_centered(&mut self, zoom: f32) {
        let focus = self.viewport_center();
        self.set_view_zoom(zoom, focus);
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.view_pos += delta;
        self.mode = ViewportMode::Manual;
    }

    /// Fit the render into the viewport and center it.
    pub fn frame_view(&mut self) {
        let mut r = self.render_size.as_vec2();
        let v = self.viewport_size.as_vec2();
        if r.x <= 0.0 || r.y <= 0.0 || v.x <= 0.0 || v.y <= 0.0 {
            return;
        }
        if self.is_sideways() {
            r = Vec2::new(r.y, r.x);
        }
        self.view_zoom = (v.x / r.x).min(v.y / r.y).clamp(MIN_ZOOM, MAX_ZOOM);
        self.center_view();
        self.mode = ViewportMode::AutoFit;
    }

    /// Center the render at the current zoom.
    pub fn center_view(&mut self) {
        self.view_pos = self.viewport_center() - self.view_zoom * self.render_center();
    }

    /// Zoom 1:1, centered.
    pub fn reset_view(&mut self) {
        self.view_zoom = 1.0;
        self.center_view();
        self.mode = ViewportMode::Manual;
        info!("Viewport reset to 1:1");
    }

    /// Raster -> window.
    pub fn projection_matrix(&self) -> Mat4 {
        let c = self.render_center().extend(0.0);
        Mat4::from_translation(self.view_pos.extend(0.0))
            * Mat4::from_scale(Vec3::new(self.view_zoom, self.view_zoom, 1.0))
            * Mat4::from_translation(c)
            * Mat4::from_rotation_z(self.rotation().to_radians())
            * Mat4::from_translation(-c)
    }

    /// Window -> raster, the inverse of `projection_matrix()`.
    pub fn pixel_matrix(&self) -> Mat4 {
        let c = self.render_center().extend(0.0);
        let inv_zoom = 1.0 / self.view_zoom;
        Mat4::from_translation(c)
            * Mat4::from_rotation_z(-self.rotation().to_radians())
            * Mat4::from_translation(-c)
            * Mat4::from_scale(Vec3::new(inv_zoom, inv_zoom, 1.0))
            * Mat4::from_translation(-self.view_pos.extend(0.0))
    }

    /// Clip-space matrix for drawing raster geometry into the window.
    pub fn gl_matrix(&self) -> Mat4 {
        let v = self.viewport_size.as_vec2().max(Vec2::ONE);
        Mat4::orthographic_rh_gl(0.0, v.x, v.y, 0.0, -1.0, 1.0) * self.projection_matrix()
    }

    /// Clip-space matrix for window-space geometry (HUD, masks in window pixels).
    pub fn window_ortho(&self) -> Mat4 {
        let v = self.viewport_size.as_vec2().max(Vec2::ONE);
        Mat4::orthographic_rh_gl(0.0, v.x, v.y, 0.0, -1.0, 1.0)
    }

    pub fn window_to_raster(&self, p: Vec2) -> Vec2 {
        self.pixel_matrix().transform_point3(p.extend(0.0)).truncate()
    }

    pub fn raster_to_window(&self, p: Vec2) -> Vec2 {
        self.projection_matrix().transform_point3(p.extend(0.0)).truncate()
    }

    /// Window point to the render pixel under it, clamped into the render.
    pub fn clamped_pixel(&self, window: Vec2) -> glam::IVec2 {
        clamp_to_render(raster_to_pixel(self.window_to_raster(window)), self.render_size)
    }

    pub fn clear_selection(&mut self) {
        self.selection = Box2i::NONE;
    }

    /// Selection with min <= max on both axes, None when nothing is selected.
    pub fn normalized_selection(&self) -> Option<Box2i> {
        if self.selection.is_none() {
            None
        } else {
            Some(self.selection.normalized())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pos: Vec2, zoom: f32, rotation: f32) -> ViewportState {
        let mut s = ViewportState::new();
        s.mode = ViewportMode::Manual;
        s.viewport_size = UVec2::new(1280, 720);
        s.render_size = UVec2::new(1920, 1080);
        s.view_pos = pos;
        s.view_zoom = zoom;
        s.rotation = rotation;
        s
    }

    #[test]
    fn test_pixel_matrix_inverts_projection() {
        let points = [Vec2::ZERO, Vec2::new(10.0, 20.0), Vec2::new(1919.0, 1079.0), Vec2::new(-50.0, 3000.0)];
        for (pos, zoom, rot) in [
            (Vec2::ZERO, 1.0, 0.0),
            (Vec2::new(33.0, -12.0), 0.37, 0.0),
            (Vec2::new(-400.0, 250.0), 4.5, 90.0),
            (Vec2::new(5.5, 7.25), 2.0, 33.0),
        ] {
            let s = state(pos, zoom, rot);
            let m = s.pixel_matrix() * s.projection_matrix();
            for p in points {
                let back = m.transform_point3(p.extend(0.0)).truncate();
                assert!((back - p).length() < 1e-2, "{:?} -> {:?}", p, back);
            }
        }
    }

    #[test]
    fn test_zoom_keeps_focus_fixed() {
        for (z1, z2) in [(1.0, 2.0), (0.5, 0.1), (3.0, 7.5)] {
            let mut s = state(Vec2::new(40.0, -30.0), z1, 0.0);
            let focus = Vec2::new(300.0, 200.0);
            let raster = s.window_to_raster(focus);
            s.set_view_zoom(z2, focus);
            assert!((s.raster_to_window(raster) - focus).length() < 1e-3);
            assert_eq!(s.mode, ViewportMode::Manual);
        }
    }

    #[test]
    fn test_zoom_clamped() {
        let mut s = state(Vec2::ZERO, 1.0, 0.0);
        s.set_view_zoom(1000.0, Vec2::ZERO);
        assert_eq!(s.view_zoom, MAX_ZOOM);
        s.set_view_zoom(0.0, Vec2::ZERO);
        assert_eq!(s.view_zoom, MIN_ZOOM);
    }

    #[test]
    fn test_frame_view_fits_and_centers() {
        let mut s = state(Vec2::ZERO, 1.0, 0.0);
        s.frame_view();
        assert!((s.view_zoom - 1280.0 / 1920.0).abs() < 1e-6);
        let center = s.raster_to_window(Vec2::new(960.0, 540.0));
        assert!((center - Vec2::new(640.0, 360.0)).length() < 1e-3);

        s.set_rotation(90.0);
        assert!((s.view_zoom - 720.0 / 1920.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_normalized() {
        let mut s = state(Vec2::ZERO, 1.0, 0.0);
        s.set_rotation(-90.0);
        s.set_video_rotation(450.0);
        assert_eq!(s.rotation(), 0.0);
        assert_eq!(normalize_degrees(720.0), 0.0);
        assert_eq!(normalize_degrees(-10.0), 350.0);
    }

    #[test]
    fn test_clamped_pixel() {
        let s = state(Vec2::ZERO, 1.0, 0.0);
        assert_eq!(s.clamped_pixel(Vec2::new(-5.0, 5000.0)), glam::IVec2::new(0, 1079));
    }
}
