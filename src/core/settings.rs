//! Viewport preferences.
//!
//! A thin typed layer over `Attrs`: every preference has a key constant,
//! a default applied on construction and a typed accessor. Unknown keys
//! read from disk are kept and written back on save.

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::color::spaces::{BrightnessType, Color4f, ColorSpace, VideoLevels};
use crate::entities::attrs::{AttrValue, Attrs};
use crate::error::ViewportResult;

pub const PEN_SIZE: &str = "pen_size";
pub const PEN_COLOR: &str = "pen_color";
pub const FONT: &str = "font";
pub const FONT_SIZE: &str = "font_size";
pub const SOFT_BRUSH: &str = "soft_brush";
pub const LASER: &str = "laser";
pub const ALL_FRAMES: &str = "all_frames";
pub const ZOOM_SPEED: &str = "zoom_speed";
pub const SCRUB_SENSITIVITY: &str = "scrub_sensitivity";
pub const SCRUB_SENSITIVITY_ALT: &str = "scrub_sensitivity_alt";
pub const AUTO_PLAY_SCRUB: &str = "auto_play_scrub";
pub const GHOST_PREVIOUS: &str = "ghost_previous";
pub const GHOST_NEXT: &str = "ghost_next";
pub const SHOW_GHOSTS: &str = "show_ghosts";
pub const HUD: &str = "hud";
pub const SAFE_AREAS: &str = "safe_areas";
pub const DATA_WINDOW: &str = "data_window";
pub const DISPLAY_WINDOW: &str = "display_window";
pub const PIXEL_BAR_RAW: &str = "pixel_bar_raw";
pub const BRIGHTNESS_TYPE: &str = "brightness_type";
pub const COLOR_SPACE: &str = "color_space";
pub const VIDEO_LEVELS: &str = "video_levels";

/// Preference store handed to viewports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    attrs: Attrs,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_attrs(Attrs::new())
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing attributes, filling in missing defaults.
    pub fn from_attrs(mut attrs: Attrs) -> Self {
        for (key, value) in Self::defaults() {
            attrs.set_default(key, value);
        }
        Self { attrs }
    }

    fn defaults() -> Vec<(&'static str, AttrValue)> {
        vec![
            (PEN_SIZE, AttrValue::Int(10)),
            (PEN_COLOR, AttrValue::Vec4([0.0, 1.0, 0.0, 1.0])),
            (FONT, AttrValue::Str("Sans".to_string())),
            (FONT_SIZE, AttrValue::Int(30)),
            (SOFT_BRUSH, AttrValue::Bool(false)),
            (LASER, AttrValue::Bool(false)),
            (ALL_FRAMES, AttrValue::Bool(false)),
            (ZOOM_SPEED, AttrValue::Int(2)),
            (SCRUB_SENSITIVITY, AttrValue::Float(5.0)),
            (SCRUB_SENSITIVITY_ALT, AttrValue::Float(25.0)),
            (AUTO_PLAY_SCRUB, AttrValue::Bool(false)),
            (GHOST_PREVIOUS, AttrValue::Int(5)),
            (GHOST_NEXT, AttrValue::Int(5)),
            (SHOW_GHOSTS, AttrValue::Bool(false)),
            (HUD, AttrValue::UInt(0)),
            (SAFE_AREAS, AttrValue::Bool(false)),
            (DATA_WINDOW, AttrValue::Bool(false)),
            (DISPLAY_WINDOW, AttrValue::Bool(false)),
            (PIXEL_BAR_RAW, AttrValue::Bool(true)),
            (BRIGHTNESS_TYPE, AttrValue::Int(0)),
            (COLOR_SPACE, AttrValue::Int(0)),
            (VIDEO_LEVELS, AttrValue::Int(0)),
        ]
    }

    pub fn load(path: &Path) -> ViewportResult<Self> {
        let text = fs::read_to_string(path)?;
        let attrs: Attrs = serde_json::from_str(&text)?;
        info!("Loaded settings from {}", path.display());
        Ok(Self::from_attrs(attrs))
    }

    pub fn save(&self, path: &Path) -> ViewportResult<()> {
        let text = serde_json::to_string_pretty(&self.attrs)?;
        fs::write(path, text)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn set(&mut self, key: &str, value: AttrValue) {
        debug!("setting {} = {}", key, value);
        self.attrs.set(key, value);
    }

    /// Changes whenever any preference changes.
    pub fn revision(&self) -> u64 {
        self.attrs.hash_all()
    }

    pub fn pen_size(&self) -> f32 {
        self.attrs.get_float_or(PEN_SIZE, 10.0).max(1.0)
    }

    pub fn pen_color(&self) -> Color4f {
        let [r, g, b, a] = self.attrs.get_vec4(PEN_COLOR).unwrap_or([0.0, 1.0, 0.0, 1.0]);
        Color4f::new(r, g, b, a)
    }

    pub fn font(&self) -> String {
        self.attrs.get_str(FONT).unwrap_or("Sans").to_string()
    }

    pub fn font_size(&self) -> u32 {
        self.attrs.get_u32_or(FONT_SIZE, 30)
    }

    pub fn soft_brush(&self) -> bool {
        self.attrs.get_bool_or(SOFT_BRUSH, false)
    }

    pub fn laser(&self) -> bool {
        self.attrs.get_bool_or(LASER, false)
    }

    pub fn all_frames(&self) -> bool {
        self.attrs.get_bool_or(ALL_FRAMES, false)
    }

    /// Wheel zoom tier, 0 (slow) to 2 (fast).
    pub fn zoom_speed(&self) -> usize {
        self.attrs.get_i32_or(ZOOM_SPEED, 2).clamp(0, 2) as usize
    }

    pub fn scrub_sensitivity(&self) -> f32 {
        self.attrs.get_float_or(SCRUB_SENSITIVITY, 5.0).max(0.01)
    }

    pub fn scrub_sensitivity_alt(&self) -> f32 {
        self.attrs.get_float_or(SCRUB_SENSITIVITY_ALT, 25.0).max(0.01)
    }

    pub fn auto_play_scrub(&self) -> bool {
        self.attrs.get_bool_or(AUTO_PLAY_SCRUB, false)
    }

    pub fn ghost_previous(&self) -> i64 {
        self.attrs.get_i32_or(GHOST_PREVIOUS, 5).max(0) as i64
    }

    pub fn ghost_next(&self) -> i64 {
        self.attrs.get_i32_or(GHOST_NEXT, 5).max(0) as i64
    }

    pub fn show_ghosts(&self) -> bool {
        self.attrs.get_bool_or(SHOW_GHOSTS, false)
    }

    pub fn hud(&self) -> u32 {
        self.attrs.get_u32_or(HUD, 0)
    }

    pub fn safe_areas(&self) -> bool {
        self.attrs.get_bool_or(SAFE_AREAS, false)
    }

    pub fn data_window(&self) -> bool {
        self.attrs.get_bool_or(DATA_WINDOW, false)
    }

    pub fn display_window(&self) -> bool {
        self.attrs.get_bool_or(DISPLAY_WINDOW, false)
    }

    pub fn pixel_bar_raw(&self) -> bool {
        self.attrs.get_bool_or(PIXEL_BAR_RAW, true)
    }

    pub fn brightness_type(&self) -> BrightnessType {
        BrightnessType::from_index(self.attrs.get_i32_or(BRIGHTNESS_TYPE, 0))
    }

    pub fn color_space(&self) -> ColorSpace {
        ColorSpace::from_index(self.attrs.get_i32_or(COLOR_SPACE, 0))
    }

    pub fn video_levels(&self) -> VideoLevels {
        match self.attrs.get_i32_or(VIDEO_LEVELS, 0) {
            1 => VideoLevels::LegalRange,
            _ => VideoLevels::FullRange,
        }
    }
}
