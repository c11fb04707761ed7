//! Decoded video handed to the viewport by the timeline player.
//!
//! **Why**: The decoder delivers many pixel layouts (8/10/16-bit integer,
//! half and float, planar YUV). The viewport samples them as linear RGBA
//! floats for the raw pixel path and uploads them as RGBA floats for the GPU.
//!
//! # Pixel Types
//!
//! - Interleaved RGB/RGBA in `U8`, `U16`, `F16`, `F32` buffers
//! - `Rgb10`: one `u32` per pixel, R in bits 22..31, G in 12..21, B in 2..11
//! - Planar Y'CbCr 4:2:0 / 4:2:2 / 4:4:4, 8 or 16 bits: Y plane then Cb then Cr
//!
//! # Layers
//!
//! A `VideoData` holds layers composited bottom to top with premultiplied
//! "over". A layer may carry a second image and a dissolve factor while a
//! transition is active.

use std::path::PathBuf;
use std::sync::Arc;

use glam::UVec2;
use half::f16 as F16;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::time::RationalTime;
use super::space::Box2i;
use crate::color::spaces::{ycbcr_to_rgb, Color4f, VideoLevels, YuvCoefficients};
use crate::error::{ViewportError, ViewportResult};

/// Pixel layout of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelType {
    Rgb8,
    Rgba8,
    Rgb10,
    Rgb16,
    Rgba16,
    RgbF16,
    RgbaF16,
    RgbF32,
    RgbaF32,
    Yuv420P8,
    Yuv422P8,
    Yuv444P8,
    Yuv420P16,
    Yuv422P16,
    Yuv444P16,
}

impl PixelType {
    pub fn is_planar(&self) -> bool {
        matches!(
            self,
            PixelType::Yuv420P8
                | PixelType::Yuv422P8
                | PixelType::Yuv444P8
                | PixelType::Yuv420P16
                | PixelType::Yuv422P16
                | PixelType::Yuv444P16
        )
    }

    /// Interleaved channel count (planar types report 3).
    pub fn channels(&self) -> usize {
        match self {
            PixelType::Rgba8 | PixelType::Rgba16 | PixelType::RgbaF16 | PixelType::RgbaF32 => 4,
            PixelType::Rgb10 => 1,
            _ => 3,
        }
    }

    /// Chroma plane size for planar types.
    fn chroma_size(&self, size: UVec2) -> UVec2 {
        match self {
            PixelType::Yuv420P8 | PixelType::Yuv420P16 => UVec2::new(size.x.div_ceil(2), size.y.div_ceil(2)),
            PixelType::Yuv422P8 | PixelType::Yuv422P16 => UVec2::new(size.x.div_ceil(2), size.y),
            _ => size,
        }
    }

    /// Number of buffer elements an image of `size` needs.
    pub fn element_count(&self, size: UVec2) -> usize {
        let px = size.x as usize * size.y as usize;
        if self.is_planar() {
            let c = self.chroma_size(size);
            px + 2 * (c.x as usize * c.y as usize)
        } else {
            px * self.channels()
        }
    }
}

/// Typed pixel storage.
#[derive(Debug, Clone)]
pub enum PixelBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F16(Vec<F16>),
    F32(Vec<f32>),
}

impl PixelBuffer {
    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::U8(v) => v.len(),
            PixelBuffer::U16(v) => v.len(),
            PixelBuffer::U32(v) => v.len(),
            PixelBuffer::F16(v) => v.len(),
            PixelBuffer::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` normalized to float.
    #[inline]
    fn get(&self, i: usize) -> f32 {
        match self {
            PixelBuffer::U8(v) => v[i] as f32 / 255.0,
            PixelBuffer::U16(v) => v[i] as f32 / 65535.0,
            PixelBuffer::U32(v) => v[i] as f32,
            PixelBuffer::F16(v) => v[i].to_f32(),
            PixelBuffer::F32(v) => v[i],
        }
    }

    fn matches(&self, pixel_type: PixelType) -> bool {
        use PixelType::*;
        matches!(
            (self, pixel_type),
            (PixelBuffer::U8(_), Rgb8 | Rgba8 | Yuv420P8 | Yuv422P8 | Yuv444P8)
                | (PixelBuffer::U16(_), Rgb16 | Rgba16 | Yuv420P16 | Yuv422P16 | Yuv444P16)
                | (PixelBuffer::U32(_), Rgb10)
                | (PixelBuffer::F16(_), RgbF16 | RgbaF16)
                | (PixelBuffer::F32(_), RgbF32 | RgbaF32)
        )
    }
}

/// One decoded image.
#[derive(Debug, Clone)]
pub struct Image {
    pixel_type: PixelType,
    size: UVec2,
    buffer: PixelBuffer,
    pub levels: VideoLevels,
    pub yuv_coefficients: YuvCoefficients,
}

impl Image {
    pub fn new(pixel_type: PixelType, size: UVec2, buffer: PixelBuffer) -> ViewportResult<Self> {
        if !buffer.matches(pixel_type) {
            return Err(ViewportError::NotReady("pixel buffer does not match pixel type"));
        }
        if buffer.len() < pixel_type.element_count(size) {
            return Err(ViewportError::NotReady("pixel buffer too small"));
        }
        Ok(Self {
            pixel_type,
            size,
            buffer,
            levels: VideoLevels::FullRange,
            yuv_coefficients: YuvCoefficients::default(),
        })
    }

    /// RGBA float image, used for tests and synthetic frames.
    pub fn from_rgba_f32(size: UVec2, data: Vec<f32>) -> ViewportResult<Self> {
        Self::new(PixelType::RgbaF32, size, PixelBuffer::F32(data))
    }

    pub fn with_levels(mut self, levels: VideoLevels) -> Self {
        self.levels = levels;
        self
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.x
    }

    pub fn height(&self) -> u32 {
        self.size.y
    }

    /// Linear RGBA at (x, y). Out-of-range coordinates are clamped to the edge.
    pub fn sample(&self, x: u32, y: u32) -> Color4f {
        if self.size.x == 0 || self.size.y == 0 {
            return Color4f::TRANSPARENT;
        }
        let x = x.min(self.size.x - 1) as usize;
        let y = y.min(self.size.y - 1) as usize;
        let w = self.size.x as usize;
        let b = &self.buffer;

        if self.pixel_type.is_planar() {
            let c = self.pixel_type.chroma_size(self.size);
            let luma = w * self.size.y as usize;
            let chroma = c.x as usize * c.y as usize;
            let (cx, cy) = match self.pixel_type {
                PixelType::Yuv420P8 | PixelType::Yuv420P16 => (x / 2, y / 2),
                PixelType::Yuv422P8 | PixelType::Yuv422P16 => (x / 2, y),
                _ => (x, y),
            };
            let ci = cx + c.x as usize * cy;
            let yv = b.get(x + w * y);
            let cb = b.get(luma + ci);
            let cr = b.get(luma + chroma + ci);
            return ycbcr_to_rgb(yv, cb, cr, self.yuv_coefficients, self.levels);
        }

        if self.pixel_type == PixelType::Rgb10 {
            let PixelBuffer::U32(v) = b else {
                return Color4f::TRANSPARENT;
            };
            let p = v[x + w * y];
            let r = ((p >> 22) & 0x3ff) as f32 / 1023.0;
            let g = ((p >> 12) & 0x3ff) as f32 / 1023.0;
            let bl = ((p >> 2) & 0x3ff) as f32 / 1023.0;
            return Color4f::new(r, g, bl, 1.0);
        }

        let ch = self.pixel_type.channels();
        let i = (x + w * y) * ch;
        let a = if ch == 4 { b.get(i + 3) } else { 1.0 };
        Color4f::new(b.get(i), b.get(i + 1), b.get(i + 2), a)
    }

    /// Whole image as interleaved RGBA floats (GPU upload layout).
    pub fn to_rgba_f32(&self) -> Vec<f32> {
        if let (PixelType::RgbaF32, PixelBuffer::F32(v)) = (self.pixel_type, &self.buffer) {
            return v[..self.pixel_type.element_count(self.size)].to_vec();
        }
        let w = self.size.x as usize;
        let mut out = vec![0.0f32; w * self.size.y as usize * 4];
        if w == 0 {
            return out;
        }
        out.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                px.copy_from_slice(&self.sample(x as u32, y as u32).to_array());
            }
        });
        out
    }
}

/// Transition between the two images of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Transition {
    #[default]
    None,
    Dissolve,
}

/// One compositing layer of a video frame.
#[derive(Debug, Clone, Default)]
pub struct VideoLayer {
    pub image: Option<Arc<Image>>,
    pub image_b: Option<Arc<Image>>,
    pub transition: Transition,
    /// Dissolve factor: 0 shows `image`, 1 shows `image_b`.
    pub transition_value: f32,
}

impl VideoLayer {
    pub fn new(image: Arc<Image>) -> Self {
        Self {
            image: Some(image),
            ..Default::default()
        }
    }

    pub fn dissolve(image: Arc<Image>, image_b: Arc<Image>, t: f32) -> Self {
        Self {
            image: Some(image),
            image_b: Some(image_b),
            transition: Transition::Dissolve,
            transition_value: t,
        }
    }

    /// Pixel with the dissolve applied, None without an image.
    pub fn sample(&self, x: u32, y: u32) -> Option<Color4f> {
        let image = self.image.as_ref()?;
        let a = image.sample(x, y);
        match (self.transition, &self.image_b) {
            (Transition::Dissolve, Some(b)) => Some(a.lerp(b.sample(x, y), self.transition_value)),
            _ => Some(a),
        }
    }
}

/// Video of one timeline source at one time.
#[derive(Debug, Clone, Default)]
pub struct VideoData {
    pub time: RationalTime,
    pub size: UVec2,
    pub layers: Vec<VideoLayer>,
    /// Layers 0 and 1 are the left and right eye.
    pub stereo: bool,
}

/// Which layers the raw path reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StereoEye {
    #[default]
    Both,
    Left,
    Right,
}

impl VideoData {
    pub fn new(time: RationalTime, image: Arc<Image>) -> Self {
        Self {
            time,
            size: image.size(),
            layers: vec![VideoLayer::new(image)],
            stereo: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|l| l.image.is_none())
    }

    /// Composite all layers at (x, y) bottom to top.
    pub fn composite(&self, x: u32, y: u32, eye: StereoEye) -> Option<Color4f> {
        if x >= self.size.x || y >= self.size.y {
            return None;
        }
        if self.stereo {
            let idx = match eye {
                StereoEye::Right => 1,
                _ => 0,
            };
            return self.layers.get(idx).and_then(|l| l.sample(x, y));
        }
        let mut out: Option<Color4f> = None;
        for layer in &self.layers {
            let Some(px) = layer.sample(x, y) else {
                continue;
            };
            out = Some(match out {
                Some(under) => px.over(under),
                None => px,
            });
        }
        out
    }
}

/// Path and tags of the media being viewed (HUD source).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: Option<PathBuf>,
    pub tags: std::collections::BTreeMap<String, String>,
    /// Pixels actually stored, when smaller or offset from the display window.
    #[serde(default)]
    pub data_window: Option<Box2i>,
    #[serde(default)]
    pub display_window: Option<Box2i>,
}
