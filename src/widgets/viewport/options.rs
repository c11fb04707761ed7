//! Per-draw-call options: compare, environment map, display adjustments.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::color::ocio::LutOptions;
use crate::color::spaces::VideoLevels;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompareMode {
    /// A only.
    #[default]
    A,
    B,
    Wipe,
    Overlay,
    Difference,
    Horizontal,
    Vertical,
    Tile,
}

impl CompareMode {
    /// Compare modes whose drag adjusts wipe or overlay parameters.
    pub fn is_wipe_or_overlay(&self) -> bool {
        matches!(self, CompareMode::Wipe | CompareMode::Overlay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompareOptions {
    pub mode: CompareMode,
    /// Wipe center, normalized to the render size.
    pub wipe_center: Vec2,
    /// Wipe line rotation in degrees, [0, 360).
    pub wipe_rotation: f32,
    /// Overlay blend of B over A, [0, 1].
    pub overlay: f32,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            mode: CompareMode::A,
            wipe_center: Vec2::splat(0.5),
            wipe_rotation: 0.0,
            overlay: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnvironmentMapType {
    #[default]
    None,
    Spherical,
    Cubic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentMapOptions {
    pub kind: EnvironmentMapType,
    pub rotate_x: f32,
    pub rotate_y: f32,
    /// Lens focal length; the wheel adjusts it in environment map mode.
    pub focal_length: f32,
    pub horizontal_aperture: f32,
    pub vertical_aperture: f32,
    /// Inertial rotation after a drag.
    pub spin: bool,
}

impl Default for EnvironmentMapOptions {
    fn default() -> Self {
        Self {
            kind: EnvironmentMapType::None,
            rotate_x: 0.0,
            rotate_y: 0.0,
            focal_length: 7.0,
            horizontal_aperture: 24.0,
            vertical_aperture: 0.0,
            spin: true,
        }
    }
}

impl EnvironmentMapOptions {
    pub fn is_active(&self) -> bool {
        self.kind != EnvironmentMapType::None
    }

    /// Horizontal field of view in degrees.
    pub fn fov_degrees(&self) -> f32 {
        let f = self.focal_length.max(0.01);
        (2.0 * (self.horizontal_aperture / (2.0 * f)).atan()).to_degrees()
    }
}

/// Channel isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Channels {
    #[default]
    Color,
    Red,
    Green,
    Blue,
    Alpha,
    Lumma,
}

impl Channels {
    pub fn shader_index(&self) -> i32 {
        *self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFilter {
    Nearest,
    #[default]
    Linear,
}

/// Display adjustments applied in the draw pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    pub channels: Channels,
    /// Gain multiplier.
    pub exposure: f32,
    pub gamma: f32,
    pub saturation: f32,
    pub levels: VideoLevels,
    pub minify: ImageFilter,
    pub magnify: ImageFilter,
    pub lut: LutOptions,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            channels: Channels::Color,
            exposure: 1.0,
            gamma: 1.0,
            saturation: 1.0,
            levels: VideoLevels::FullRange,
            minify: ImageFilter::Linear,
            magnify: ImageFilter::Nearest,
            lut: LutOptions::default(),
        }
    }
}

impl DisplayOptions {
    pub fn reset_adjustments(&mut self) {
        self.exposure = 1.0;
        self.gamma = 1.0;
        self.saturation = 1.0;
    }

    /// Toggle a channel; selecting the active one returns to Color.
    pub fn toggle_channel(&mut self, channel: Channels) {
        self.channels = if self.channels == channel { Channels::Color } else { channel };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_channel() {
        let mut d = DisplayOptions::default();
        d.toggle_channel(Channels::Red);
        assert_eq!(d.channels, Channels::Red);
        d.toggle_channel(Channels::Red);
        assert_eq!(d.channels, Channels::Color);
    }

    #[test]
    fn test_fov_shrinks_with_focal_length() {
        let mut e = EnvironmentMapOptions::default();
        let wide = e.fov_degrees();
        e.focal_length = 20.0;
        assert!(e.fov_degrees() < wide);
    }
}
