//! Color-space conversions used by the pixel bar and the area statistics.
//!
//! All functions are pure. Inputs are linear RGB floats, nominally 0..1.
//! The returned `Color4f` carries the target space in r/g/b (for HSV that is
//! h/s/v, for Lab it is L/a/b and so on) and the caller keeps track of which
//! space a value is in.
//!
//! Hue is normalized to 0..1, not degrees.

use glam::{Mat3, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// CIE threshold (216/24389) between the cube-root and the linear segment.
const CIE_EPSILON: f32 = 0.008856;
/// CIE slope of the linear segment (24389/27).
const CIE_KAPPA: f32 = 903.3;
const LAB_LINEAR_SLOPE: f32 = 7.787037037037037;
const LAB_LINEAR_OFFSET: f32 = 16.0 / 116.0;

/// 4-component float color.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color4f {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4f {
    pub const BLACK: Color4f = Color4f::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color4f = Color4f::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color4f = Color4f::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    pub fn min(self, o: Color4f) -> Self {
        Self::new(self.r.min(o.r), self.g.min(o.g), self.b.min(o.b), self.a.min(o.a))
    }

    pub fn max(self, o: Color4f) -> Self {
        Self::new(self.r.max(o.r), self.g.max(o.g), self.b.max(o.b), self.a.max(o.a))
    }

    /// `self * (1 - t) + other * t`, all four channels.
    pub fn lerp(self, other: Color4f, t: f32) -> Self {
        self * (1.0 - t) + other * t
    }

    /// Premultiplied "over": `self` on top of `under`.
    pub fn over(self, under: Color4f) -> Self {
        self + under * (1.0 - self.a)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn rgb(&self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_slice(px: &[f32]) -> Self {
        Self::new(px[0], px[1], px[2], px[3])
    }

    pub fn approx_eq(&self, o: &Color4f, eps: f32) -> bool {
        (self.r - o.r).abs() <= eps
            && (self.g - o.g).abs() <= eps
            && (self.b - o.b).abs() <= eps
            && (self.a - o.a).abs() <= eps
    }
}

impl Add for Color4f {
    type Output = Color4f;
    fn add(self, o: Color4f) -> Color4f {
        Color4f::new(self.r + o.r, self.g + o.g, self.b + o.b, self.a + o.a)
    }
}

impl AddAssign for Color4f {
    fn add_assign(&mut self, o: Color4f) {
        *self = *self + o;
    }
}

impl Sub for Color4f {
    type Output = Color4f;
    fn sub(self, o: Color4f) -> Color4f {
        Color4f::new(self.r - o.r, self.g - o.g, self.b - o.b, self.a - o.a)
    }
}

impl Mul<f32> for Color4f {
    type Output = Color4f;
    fn mul(self, s: f32) -> Color4f {
        Color4f::new(self.r * s, self.g * s, self.b * s, self.a * s)
    }
}

impl Div<f32> for Color4f {
    type Output = Color4f;
    fn div(self, s: f32) -> Color4f {
        Color4f::new(self.r / s, self.g / s, self.b / s, self.a / s)
    }
}

/// How brightness is derived from RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrightnessType {
    #[default]
    Luminance,
    Lightness,
    Lumma,
}

impl BrightnessType {
    pub fn from_index(i: i32) -> Self {
        match i {
            1 => BrightnessType::Lightness,
            2 => BrightnessType::Lumma,
            _ => BrightnessType::Luminance,
        }
    }
}

/// Video levels of YUV-family values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoLevels {
    #[default]
    FullRange,
    LegalRange,
}

/// Secondary color space shown next to RGBA in the pixel bar and area info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    Hsv,
    Hsl,
    Xyz,
    XyY,
    Lab,
    Luv,
    Yuv,
    YDbDr,
    Yiq,
    Itu601,
    Itu709,
}

impl ColorSpace {
    pub const ALL: [ColorSpace; 11] = [
        ColorSpace::Hsv,
        ColorSpace::Hsl,
        ColorSpace::Xyz,
        ColorSpace::XyY,
        ColorSpace::Lab,
        ColorSpace::Luv,
        ColorSpace::Yuv,
        ColorSpace::YDbDr,
        ColorSpace::Yiq,
        ColorSpace::Itu601,
        ColorSpace::Itu709,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColorSpace::Hsv => "HSV",
            ColorSpace::Hsl => "HSL",
            ColorSpace::Xyz => "XYZ CIE XYZ",
            ColorSpace::XyY => "xyY CIE xyY",
            ColorSpace::Lab => "Lab CIELAB (L*a*b*)",
            ColorSpace::Luv => "Luv CIELUV (L*u*v*)",
            ColorSpace::Yuv => "YUV (Analog PAL)",
            ColorSpace::YDbDr => "YDbDr (Analog SECAM/PAL-N)",
            ColorSpace::Yiq => "YIQ (Analog NTSC)",
            ColorSpace::Itu601 => "ITU-601 (Digital PAL/NTSC YCbCr)",
            ColorSpace::Itu709 => "ITU-709 (Digital HDTV YCbCr)",
        }
    }

    /// Channel labels for r/g/b of a converted value.
    pub fn channels(&self) -> [&'static str; 3] {
        match self {
            ColorSpace::Hsv => ["H", "S", "V"],
            ColorSpace::Hsl => ["H", "S", "L"],
            ColorSpace::Xyz => ["X", "Y", "Z"],
            ColorSpace::XyY => ["x", "y", "Y"],
            ColorSpace::Lab => ["L", "a", "b"],
            ColorSpace::Luv => ["L", "u", "v"],
            ColorSpace::Yuv => ["Y", "U", "V"],
            ColorSpace::YDbDr => ["Y", "Db", "Dr"],
            ColorSpace::Yiq => ["Y", "I", "Q"],
            ColorSpace::Itu601 | ColorSpace::Itu709 => ["Y", "Cb", "Cr"],
        }
    }

    pub fn from_index(i: i32) -> Self {
        Self::ALL.get(i.max(0) as usize).copied().unwrap_or_default()
    }

    /// YCbCr spaces produce legal-range code values.
    pub fn is_ycbcr(&self) -> bool {
        matches!(self, ColorSpace::Itu601 | ColorSpace::Itu709)
    }
}

/// Brightness of an RGBA value.
pub fn calculate_brightness(rgba: &Color4f, kind: BrightnessType) -> f32 {
    match kind {
        BrightnessType::Luminance => luminance(rgba),
        BrightnessType::Lightness => {
            let y = luminance(rgba);
            (116.0 * lab_f(y) - 16.0) / 100.0
        }
        BrightnessType::Lumma => (rgba.r + rgba.g + rgba.b) / 3.0,
    }
}

#[inline]
fn luminance(c: &Color4f) -> f32 {
    0.2126 * c.r + 0.7152 * c.g + 0.0722 * c.b
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > CIE_EPSILON {
        t.cbrt()
    } else {
        LAB_LINEAR_SLOPE * t + LAB_LINEAR_OFFSET
    }
}

/// Primaries and white point of an RGB space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chromaticities {
    pub red: Vec2,
    pub green: Vec2,
    pub blue: Vec2,
    pub white: Vec2,
}

impl Chromaticities {
    /// ITU-R BT.709 primaries with a D65 white.
    pub const ITU_709: Chromaticities = Chromaticities {
        red: Vec2::new(0.64, 0.33),
        green: Vec2::new(0.30, 0.60),
        blue: Vec2::new(0.15, 0.06),
        white: Vec2::new(0.3127, 0.3290),
    };

    /// XYZ of the white point scaled to luminance `y`.
    pub fn white_xyz(&self, y: f32) -> Vec3 {
        xy_to_xyz(self.white) * y
    }

    /// Matrix taking RGB (column vector) to XYZ, white mapping to `y`.
    pub fn rgb_to_xyz_matrix(&self, y: f32) -> Mat3 {
        let primaries = Mat3::from_cols(
            xy_to_xyz(self.red),
            xy_to_xyz(self.green),
            xy_to_xyz(self.blue),
        );
        let scale = primaries.inverse() * self.white_xyz(y);
        primaries * Mat3::from_diagonal(scale)
    }
}

impl Default for Chromaticities {
    fn default() -> Self {
        Self::ITU_709
    }
}

#[inline]
fn xy_to_xyz(xy: Vec2) -> Vec3 {
    Vec3::new(xy.x / xy.y, 1.0, (1.0 - xy.x - xy.y) / xy.y)
}

// =============================================================================
// RGB -> other spaces
// =============================================================================

pub mod rgb {
    use super::*;

    /// RGB to HSV. Hue in 0..1.
    pub fn to_hsv(rgba: &Color4f) -> Color4f {
        let (r, g, b) = (rgba.r, rgba.g, rgba.b);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let v = max;
        let s = if v != 0.0 { delta / v } else { 0.0 };
        let h = if s == 0.0 { 0.0 } else { hue(r, g, b, max, delta) };
        Color4f::new(h, s, v, rgba.a)
    }

    /// RGB to HSL. Hue in 0..1.
    pub fn to_hsl(rgba: &Color4f) -> Color4f {
        let (r, g, b) = (rgba.r, rgba.g, rgba.b);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let l = (max + min) * 0.5;
        if delta == 0.0 {
            return Color4f::new(0.0, 0.0, l, rgba.a);
        }
        let s = if l <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };
        Color4f::new(hue(r, g, b, max, delta), s, l, rgba.a)
    }

    fn hue(r: f32, g: f32, b: f32, max: f32, delta: f32) -> f32 {
        let h = if r == max {
            (g - b) / delta
        } else if g == max {
            2.0 + (b - r) / delta
        } else {
            4.0 + (r - g) / delta
        };
        let h = h / 6.0;
        if h < 0.0 { h + 1.0 } else { h }
    }

    pub fn to_xyz(rgba: &Color4f, chroma: &Chromaticities, y: f32) -> Color4f {
        let xyz = chroma.rgb_to_xyz_matrix(y) * rgba.rgb();
        Color4f::new(xyz.x, xyz.y, xyz.z, rgba.a)
    }

    pub fn to_xyy(rgba: &Color4f, chroma: &Chromaticities, y: f32) -> Color4f {
        let xyz = to_xyz(rgba, chroma, y);
        let sum = xyz.r + xyz.g + xyz.b;
        if sum == 0.0 {
            return Color4f::new(chroma.white.x, chroma.white.y, 0.0, rgba.a);
        }
        Color4f::new(xyz.r / sum, xyz.g / sum, xyz.g, rgba.a)
    }

    pub fn to_lab(rgba: &Color4f, chroma: &Chromaticities, y: f32) -> Color4f {
        let xyz = to_xyz(rgba, chroma, y);
        let white = chroma.white_xyz(y);
        let fx = lab_f(xyz.r / white.x);
        let fy = lab_f(xyz.g / white.y);
        let fz = lab_f(xyz.b / white.z);
        Color4f::new(
            116.0 * fy - 16.0,
            500.0 * (fx - fy),
            200.0 * (fy - fz),
            rgba.a,
        )
    }

    pub fn to_luv(rgba: &Color4f, chroma: &Chromaticities, y: f32) -> Color4f {
        let xyz = to_xyz(rgba, chroma, y);
        let white = chroma.white_xyz(y);
        let yr = xyz.g / white.y;
        let l = if yr > CIE_EPSILON {
            116.0 * yr.cbrt() - 16.0
        } else {
            CIE_KAPPA * yr
        };
        let (u, v) = uv_prime(Vec3::new(xyz.r, xyz.g, xyz.b));
        let (un, vn) = uv_prime(white);
        Color4f::new(l, 13.0 * l * (u - un), 13.0 * l * (v - vn), rgba.a)
    }

    fn uv_prime(xyz: Vec3) -> (f32, f32) {
        let d = xyz.x + 15.0 * xyz.y + 3.0 * xyz.z;
        if d == 0.0 {
            return (0.0, 0.0);
        }
        (4.0 * xyz.x / d, 9.0 * xyz.y / d)
    }

    /// Analog PAL YUV.
    pub fn to_yuv(rgba: &Color4f) -> Color4f {
        let (r, g, b) = (rgba.r, rgba.g, rgba.b);
        Color4f::new(
            0.299 * r + 0.587 * g + 0.114 * b,
            -0.14713 * r - 0.28886 * g + 0.436 * b,
            0.615 * r - 0.51499 * g - 0.10001 * b,
            rgba.a,
        )
    }

    /// Analog NTSC YIQ.
    pub fn to_yiq(rgba: &Color4f) -> Color4f {
        let (r, g, b) = (rgba.r, rgba.g, rgba.b);
        Color4f::new(
            0.299 * r + 0.587 * g + 0.114 * b,
            0.595716 * r - 0.274453 * g - 0.321263 * b,
            0.211456 * r - 0.522591 * g + 0.311135 * b,
            rgba.a,
        )
    }

    /// SECAM YDbDr.
    pub fn to_ydbdr(rgba: &Color4f) -> Color4f {
        let (r, g, b) = (rgba.r, rgba.g, rgba.b);
        Color4f::new(
            0.299 * r + 0.587 * g + 0.114 * b,
            -0.450 * r - 0.883 * g + 1.333 * b,
            -1.333 * r + 1.116 * g + 0.217 * b,
            rgba.a,
        )
    }

    /// ITU-601 YCbCr, legal-range 8-bit code values scaled to 0..1.
    pub fn to_itu601(rgba: &Color4f) -> Color4f {
        let (r, g, b) = (rgba.r, rgba.g, rgba.b);
        Color4f::new(
            (16.0 + 65.481 * r + 128.553 * g + 24.966 * b) / 255.0,
            (128.0 - 37.797 * r - 74.203 * g + 112.0 * b) / 255.0,
            (128.0 + 112.0 * r - 93.786 * g - 18.214 * b) / 255.0,
            rgba.a,
        )
    }

    /// ITU-709 YCbCr, legal-range 8-bit code values scaled to 0..1.
    pub fn to_itu709(rgba: &Color4f) -> Color4f {
        let (r, g, b) = (rgba.r, rgba.g, rgba.b);
        Color4f::new(
            (16.0 + 46.5594 * r + 156.6288 * g + 15.8118 * b) / 255.0,
            (128.0 - 25.6641 * r - 86.3359 * g + 112.0 * b) / 255.0,
            (128.0 + 112.0 * r - 101.7303 * g - 10.2697 * b) / 255.0,
            rgba.a,
        )
    }
}

/// Analog PAL YUV back to RGB.
pub fn yuv_to_rgb(yuv: &Color4f) -> Color4f {
    let (y, u, v) = (yuv.r, yuv.g, yuv.b);
    Color4f::new(
        y + 1.13983 * v,
        y - 0.39465 * u - 0.58060 * v,
        y + 2.03211 * u,
        yuv.a,
    )
}

/// Luma coefficients of a YCbCr matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YuvCoefficients {
    Bt601,
    #[default]
    Bt709,
    Bt2020,
}

impl YuvCoefficients {
    fn kr_kb(&self) -> (f32, f32) {
        match self {
            YuvCoefficients::Bt601 => (0.299, 0.114),
            YuvCoefficients::Bt709 => (0.2126, 0.0722),
            YuvCoefficients::Bt2020 => (0.2627, 0.0593),
        }
    }
}

/// Decode normalized Y'CbCr samples (0..1) of planar video to RGB.
pub fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32, coeffs: YuvCoefficients, levels: VideoLevels) -> Color4f {
    let (y, cb, cr) = match levels {
        VideoLevels::LegalRange => (
            (y * 255.0 - 16.0) / 219.0,
            (cb * 255.0 - 128.0) / 224.0,
            (cr * 255.0 - 128.0) / 224.0,
        ),
        VideoLevels::FullRange => (y, cb - 0.5, cr - 0.5),
    };
    let (kr, kb) = coeffs.kr_kb();
    let kg = 1.0 - kr - kb;
    let r = y + 2.0 * (1.0 - kr) * cr;
    let b = y + 2.0 * (1.0 - kb) * cb;
    let g = (y - kr * r - kb * b) / kg;
    Color4f::new(r, g, b, 1.0)
}

/// Rescale legal-range YCbCr code values for display.
///
/// Full range expands luma from 16..235 and chroma from 16..240 to 0..1;
/// legal range leaves the code values as they are.
pub fn check_levels(c: Color4f, levels: VideoLevels) -> Color4f {
    match levels {
        VideoLevels::LegalRange => c,
        VideoLevels::FullRange => Color4f::new(
            (c.r * 255.0 - 16.0) / (235.0 - 16.0),
            (c.g * 255.0 - 16.0) / (240.0 - 16.0),
            (c.b * 255.0 - 16.0) / (240.0 - 16.0),
            c.a,
        ),
    }
}

/// Convert RGBA to `space`; the returned alpha carries the brightness.
pub fn to_color_space(
    rgba: &Color4f,
    space: ColorSpace,
    brightness: BrightnessType,
    levels: VideoLevels,
) -> Color4f {
    let chroma = Chromaticities::ITU_709;
    let out = match space {
        ColorSpace::Hsv => rgb::to_hsv(rgba),
        ColorSpace::Hsl => rgb::to_hsl(rgba),
        ColorSpace::Xyz => rgb::to_xyz(rgba, &chroma, 1.0),
        ColorSpace::XyY => rgb::to_xyy(rgba, &chroma, 1.0),
        ColorSpace::Lab => rgb::to_lab(rgba, &chroma, 1.0),
        ColorSpace::Luv => rgb::to_luv(rgba, &chroma, 1.0),
        ColorSpace::Yuv => rgb::to_yuv(rgba),
        ColorSpace::YDbDr => rgb::to_ydbdr(rgba),
        ColorSpace::Yiq => rgb::to_yiq(rgba),
        ColorSpace::Itu601 => check_levels(rgb::to_itu601(rgba), levels),
        ColorSpace::Itu709 => check_levels(rgb::to_itu709(rgba), levels),
    };
    out.with_alpha(calculate_brightness(rgba, brightness))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn test_hsv_fixtures() {
        let red = rgb::to_hsv(&Color4f::new(1.0, 0.0, 0.0, 1.0));
        assert!(close(red.r, 0.0) && close(red.g, 1.0) && close(red.b, 1.0));

        let black = rgb::to_hsv(&Color4f::new(0.0, 0.0, 0.0, 1.0));
        assert!(close(black.r, 0.0) && close(black.g, 0.0) && close(black.b, 0.0));

        let white = rgb::to_hsv(&Color4f::WHITE);
        assert!(close(white.r, 0.0) && close(white.g, 0.0) && close(white.b, 1.0));

        let gray = rgb::to_hsv(&Color4f::new(0.5, 0.5, 0.5, 1.0));
        assert!(close(gray.g, 0.0));
    }

    #[test]
    fn test_hue_is_normalized() {
        let green = rgb::to_hsv(&Color4f::new(0.0, 1.0, 0.0, 1.0));
        assert!(close(green.r, 1.0 / 3.0));
        let blue = rgb::to_hsv(&Color4f::new(0.0, 0.0, 1.0, 1.0));
        assert!(close(blue.r, 2.0 / 3.0));
        let magenta = rgb::to_hsv(&Color4f::new(1.0, 0.0, 1.0, 1.0));
        assert!(close(magenta.r, 5.0 / 6.0));
    }

    #[test]
    fn test_hsl_gray_has_no_saturation() {
        let hsl = rgb::to_hsl(&Color4f::new(0.5, 0.5, 0.5, 1.0));
        assert!(close(hsl.g, 0.0));
        assert!(close(hsl.b, 0.5));
    }

    #[test]
    fn test_hsl_branches() {
        // Dark red: lightness 0.25, saturation = delta / (max + min)
        let dark = rgb::to_hsl(&Color4f::new(0.5, 0.0, 0.0, 1.0));
        assert!(close(dark.b, 0.25) && close(dark.g, 1.0));
        // Light red: lightness 0.75, saturation = delta / (2 - max - min)
        let light = rgb::to_hsl(&Color4f::new(1.0, 0.5, 0.5, 1.0));
        assert!(close(light.b, 0.75) && close(light.g, 1.0));
    }

    #[test]
    fn test_brightness() {
        let c = Color4f::new(0.3, 0.3, 0.3, 1.0);
        assert!(close(calculate_brightness(&c, BrightnessType::Lumma), 0.3));
        assert!(close(calculate_brightness(&c, BrightnessType::Luminance), 0.3));
        let white = Color4f::WHITE;
        assert!(close(calculate_brightness(&white, BrightnessType::Lightness), 1.0));
        let dark = Color4f::new(0.001, 0.001, 0.001, 1.0);
        let l = calculate_brightness(&dark, BrightnessType::Lightness);
        assert!((l - CIE_KAPPA * 0.001 / 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_xyz_of_white_is_white_point() {
        let xyz = rgb::to_xyz(&Color4f::WHITE, &Chromaticities::ITU_709, 1.0);
        let w = Chromaticities::ITU_709.white_xyz(1.0);
        assert!((xyz.r - w.x).abs() < 1e-3);
        assert!((xyz.g - 1.0).abs() < 1e-3);
        assert!((xyz.b - w.z).abs() < 1e-3);
    }

    #[test]
    fn test_xyz_luminance_row_matches_709() {
        let m = Chromaticities::ITU_709.rgb_to_xyz_matrix(1.0);
        let row_y = m.row(1);
        assert!((row_y.x - 0.2126).abs() < 1e-3);
        assert!((row_y.y - 0.7152).abs() < 1e-3);
        assert!((row_y.z - 0.0722).abs() < 1e-3);
    }

    #[test]
    fn test_lab_white_and_black() {
        let white = rgb::to_lab(&Color4f::WHITE, &Chromaticities::ITU_709, 1.0);
        assert!((white.r - 100.0).abs() < 1e-2);
        assert!(white.g.abs() < 1e-2 && white.b.abs() < 1e-2);
        let black = rgb::to_lab(&Color4f::BLACK, &Chromaticities::ITU_709, 1.0);
        assert!(black.r.abs() < 1e-3);
    }

    #[test]
    fn test_luv_white_is_neutral() {
        let white = rgb::to_luv(&Color4f::WHITE, &Chromaticities::ITU_709, 1.0);
        assert!((white.r - 100.0).abs() < 1e-2);
        assert!(white.g.abs() < 1e-2 && white.b.abs() < 1e-2);
    }

    #[test]
    fn test_xyy_black_falls_back_to_white_point() {
        let c = rgb::to_xyy(&Color4f::BLACK, &Chromaticities::ITU_709, 1.0);
        assert!(close(c.r, 0.3127) && close(c.g, 0.3290) && close(c.b, 0.0));
    }

    #[test]
    fn test_yuv_inverse() {
        let c = Color4f::new(0.2, 0.6, 0.9, 1.0);
        let back = yuv_to_rgb(&rgb::to_yuv(&c));
        assert!(back.approx_eq(&c, 1e-3));
    }

    #[test]
    fn test_itu_levels() {
        let black = rgb::to_itu709(&Color4f::BLACK);
        assert!(close(black.r, 16.0 / 255.0));
        assert!(close(black.g, 128.0 / 255.0));
        let white = rgb::to_itu601(&Color4f::WHITE);
        assert!((white.r - 235.0 / 255.0).abs() < 1e-3);

        let full = check_levels(white, VideoLevels::FullRange);
        assert!((full.r - 1.0).abs() < 1e-3);
        let legal = check_levels(white, VideoLevels::LegalRange);
        assert_eq!(legal, white);
    }

    #[test]
    fn test_ycbcr_decode_gray() {
        let c = ycbcr_to_rgb(0.5, 0.5, 0.5, YuvCoefficients::Bt709, VideoLevels::FullRange);
        assert!(c.approx_eq(&Color4f::new(0.5, 0.5, 0.5, 1.0), 1e-4));
        let black = ycbcr_to_rgb(16.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0, YuvCoefficients::Bt601, VideoLevels::LegalRange);
        assert!(black.approx_eq(&Color4f::BLACK, 1e-4));
    }

    #[test]
    fn test_secondary_alpha_is_brightness() {
        let c = Color4f::new(0.3, 0.3, 0.3, 0.5);
        let out = to_color_space(&c, ColorSpace::Hsv, BrightnessType::Lumma, VideoLevels::FullRange);
        assert!(close(out.a, 0.3));
    }
}
