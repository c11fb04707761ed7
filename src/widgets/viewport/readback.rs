//! Pixel readback for the pixel bar and color-area statistics.
//!
//! Two sources fill the same RGBA float buffer (pixel (x, y) at
//! `(x + w * y) * 4`), so statistics never care which one produced it:
//!
//! - **Full**: GPU pack buffers, double-buffered. Each update toggles
//!   `index`, issues a non-blocking read of the offscreen target into it and
//!   maps either the same buffer (stopped: synchronous, exact) or the other
//!   one (playing: one frame late, never stalls).
//! - **Raw**: the decoded layers composited on the CPU with rayon, used
//!   while scrubbing or when the pixel bar asks for raw values.
//!
//! Nothing here is valid until a renderer reported a usable target or raw
//! video arrived; queries before that return None.

use glam::{IVec2, UVec2};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::renderer::{MappedPack, Renderer};
use crate::color::area::{self, AreaOptions, FloatBufferView, Info};
use crate::color::spaces::Color4f;
use crate::entities::frame::{StereoEye, VideoData};
use crate::entities::space::Box2i;

/// Which source feeds the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReadbackMode {
    /// CPU composite of the decoded layers.
    #[default]
    Raw,
    /// GPU readback of the displayed image.
    Full,
}

#[derive(Debug, Default)]
pub struct PixelReadback {
    mode: ReadbackMode,
    index: usize,
    next_index: usize,
    /// Size the pack buffers were allocated for.
    allocated: UVec2,
    /// Pack buffers that received a read since allocation.
    written: [bool; 2],
    size: UVec2,
    buffer: Vec<f32>,
    valid: bool,
}

impl PixelReadback {
    pub fn new() -> Self {
        Self {
            next_index: 1,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> ReadbackMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ReadbackMode) {
        if self.mode != mode {
            debug!("readback mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            self.valid = false;
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Forget the buffer and the pack buffer allocation (context lost or player changed).
    pub fn reset(&mut self) {
        self.allocated = UVec2::ZERO;
        self.written = [false; 2];
        self.buffer.clear();
        self.valid = false;
    }

    /// Refresh from the GPU after the offscreen target was drawn.
    ///
    /// Returns whether the buffer holds data for `render_size`.
    pub fn update_gpu<R: Renderer + ?Sized>(&mut self, renderer: &mut R, render_size: UVec2, stopped: bool) -> bool {
        if !renderer.is_valid() || render_size.x == 0 || render_size.y == 0 {
            self.valid = false;
            return false;
        }

        if self.allocated != render_size {
            if !renderer.alloc_pack_buffers(render_size) {
                warn!("readback: cannot allocate pack buffers for {}x{}", render_size.x, render_size.y);
                self.valid = false;
                return false;
            }
            info!("readback: pack buffers {}x{}", render_size.x, render_size.y);
            self.allocated = render_size;
            self.written = [false; 2];
        }

        self.index = (self.index + 1) % 2;
        self.next_index = (self.index + 1) % 2;

        renderer.issue_read(self.index);
        self.written[self.index] = true;

        // The lagged buffer holds nothing right after allocation.
        let target = if stopped || !self.written[self.next_index] {
            self.index
        } else {
            self.next_index
        };

        let pack = MappedPack::map(renderer, target);
        match pack.data() {
            Some(data) if data.len() == pixel_len(render_size) => {
                self.buffer.clear();
                self.buffer.extend_from_slice(data);
                self.size = render_size;
                self.valid = true;
            }
            Some(data) => {
                warn!("readback: mapped {} floats, expected {}", data.len(), pixel_len(render_size));
                self.valid = false;
            }
            None => {
                debug!("readback: buffer {} not mappable", target);
                self.valid = false;
            }
        }
        self.valid
    }

    /// Refresh by compositing the first video's layers on the CPU.
    pub fn update_raw(&mut self, video: &[VideoData], eye: StereoEye) -> bool {
        let Some(v) = video.first().filter(|v| !v.is_empty()) else {
            self.valid = false;
            return false;
        };
        let size = v.size;
        if size.x == 0 || size.y == 0 {
            self.valid = false;
            return false;
        }

        self.buffer.resize(pixel_len(size), 0.0);
        let row_len = size.x as usize * 4;
        self.buffer
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let c = v
                        .composite(x as u32, y as u32, eye)
                        .unwrap_or(Color4f::TRANSPARENT);
                    px.copy_from_slice(&c.to_array());
                }
            });
        self.size = size;
        self.valid = true;
        true
    }

    /// Buffered value of raster pixel `p`.
    pub fn pixel(&self, p: IVec2) -> Option<Color4f> {
        if !self.valid {
            return None;
        }
        if p.x < 0 || p.y < 0 || p.x >= self.size.x as i32 || p.y >= self.size.y as i32 {
            return None;
        }
        let i = (p.x as usize + self.size.x as usize * p.y as usize) * 4;
        self.buffer.get(i..i + 4).map(Color4f::from_slice)
    }

    /// Pixel bar query.
    ///
    /// Full mode while stopped reads the one pixel straight from the
    /// renderer; everything else reads the buffer.
    pub fn read_pixel<R: Renderer + ?Sized>(&self, renderer: &mut R, p: IVec2, stopped: bool) -> Option<Color4f> {
        if self.mode == ReadbackMode::Full && stopped {
            if !renderer.is_valid() {
                return None;
            }
            return renderer.read_pixel(p);
        }
        self.pixel(p)
    }

    /// Statistics of `bbox` over the buffer. None when cleared.
    pub fn area_info(&self, bbox: Box2i, opts: &AreaOptions) -> Option<Info> {
        if !self.valid {
            return None;
        }
        let view = FloatBufferView::new(self.size, &self.buffer);
        area::compute(bbox, &view, opts)
    }

    pub fn data(&self) -> Option<&[f32]> {
        self.valid.then_some(self.buffer.as_slice())
    }
}

fn pixel_len(size: UVec2) -> usize {
    size.x as usize * size.y as usize * 4
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::color::spaces::{BrightnessType, ColorSpace};
    use crate::entities::frame::{Image, VideoLayer};
    use crate::entities::time::RationalTime;
    use crate::widgets::viewport::options::{CompareOptions, DisplayOptions};
    use crate::widgets::viewport::renderer::recording::{Call, RecordingRenderer};
    use crate::widgets::viewport::renderer::VideoPass;
    use crate::color::ocio::OcioOptions;

    fn gradient(size: UVec2, alpha: f32) -> Arc<Image> {
        let mut data = Vec::new();
        for y in 0..size.y {
            for x in 0..size.x {
                data.extend_from_slice(&[x as f32 / size.x as f32, y as f32 / size.y as f32, 0.25, alpha]);
            }
        }
        Arc::new(Image::from_rgba_f32(size, data).expect("image"))
    }

    fn two_layer_video(size: UVec2) -> Vec<VideoData> {
        let mut v = VideoData::new(RationalTime::from_frame(1, 24.0), gradient(size, 1.0));
        let top = gradient(size, 0.5);
        v.layers.push(VideoLayer::dissolve(top.clone(), gradient(size, 1.0), 0.3));
        vec![v]
    }

    fn draw(renderer: &mut RecordingRenderer, video: &[VideoData], size: UVec2) {
        let compare = CompareOptions::default();
        let display = DisplayOptions::default();
        let ocio = OcioOptions::default();
        let pass = VideoPass {
            compare: &compare,
            display: &display,
            ocio: &ocio,
        };
        renderer.begin_frame(size, size, Color4f::BLACK);
        renderer.draw_video(video, &pass);
        renderer.end_frame();
    }

    #[test]
    fn test_full_and_raw_agree_on_static_frame() {
        let size = UVec2::new(8, 6);
        let video = two_layer_video(size);
        let mut r = RecordingRenderer::new();
        draw(&mut r, &video, size);

        let mut full = PixelReadback::new();
        full.set_mode(ReadbackMode::Full);
        assert!(full.update_gpu(&mut r, size, true));

        let mut raw = PixelReadback::new();
        assert!(raw.update_raw(&video, StereoEye::Both));

        for p in [IVec2::new(0, 0), IVec2::new(3, 2), IVec2::new(7, 5)] {
            let a = full.read_pixel(&mut r, p, true).expect("full");
            let b = raw.read_pixel(&mut r, p, true).expect("raw");
            assert!(a.approx_eq(&b, 1e-5), "{p}: {a:?} vs {b:?}");
            assert!(full.pixel(p).expect("buffered").approx_eq(&b, 1e-5));
        }

        let opts = AreaOptions {
            space: ColorSpace::Hsv,
            brightness: BrightnessType::Lumma,
            ..Default::default()
        };
        let bbox = Box2i::new(IVec2::new(1, 1), IVec2::new(6, 4));
        let a = full.area_info(bbox, &opts).expect("full info");
        let b = raw.area_info(bbox, &opts).expect("raw info");
        assert!(a.rgba.mean.approx_eq(&b.rgba.mean, 1e-5));
        assert!(a.hsv.max.approx_eq(&b.hsv.max, 1e-5));
    }

    #[test]
    fn test_stopped_maps_current_playing_maps_previous() {
        let size = UVec2::new(2, 2);
        let mut r = RecordingRenderer::new();
        draw(&mut r, &[], size);
        let mut rb = PixelReadback::new();

        rb.update_gpu(&mut r, size, false);
        assert_eq!(rb.index(), 1);
        // nothing lagged yet: falls back to the fresh buffer
        assert!(r.calls.contains(&Call::Map(1)));

        r.calls.clear();
        rb.update_gpu(&mut r, size, false);
        assert_eq!(rb.index(), 0);
        assert_eq!(r.calls[0], Call::IssueRead(0));
        assert_eq!(r.calls[1], Call::Map(1));

        r.calls.clear();
        rb.update_gpu(&mut r, size, true);
        assert_eq!(r.calls[0], Call::IssueRead(1));
        assert_eq!(r.calls[1], Call::Map(1));
        assert_eq!(r.calls.last(), Some(&Call::BindDefaultPack));
    }

    #[test]
    fn test_failed_map_still_rebinds_default() {
        let size = UVec2::new(2, 2);
        let mut r = RecordingRenderer::new();
        draw(&mut r, &[], size);
        r.fail_map = true;
        let mut rb = PixelReadback::new();

        assert!(!rb.update_gpu(&mut r, size, true));
        assert!(!rb.is_valid());
        assert_eq!(r.count(|c| matches!(c, Call::Unmap)), 0);
        assert_eq!(r.calls.last(), Some(&Call::BindDefaultPack));
    }

    #[test]
    fn test_realloc_on_resize() {
        let mut r = RecordingRenderer::new();
        let mut rb = PixelReadback::new();
        let a = UVec2::new(4, 4);
        let b = UVec2::new(8, 2);

        draw(&mut r, &[], a);
        rb.update_gpu(&mut r, a, true);
        rb.update_gpu(&mut r, a, true);
        draw(&mut r, &[], b);
        rb.update_gpu(&mut r, b, true);

        assert_eq!(r.count(|c| matches!(c, Call::Alloc(_))), 2);
        assert!(r.calls.contains(&Call::Alloc(b)));
        assert_eq!(rb.size(), b);
    }

    #[test]
    fn test_not_ready_is_silent() {
        let mut r = RecordingRenderer::new();
        r.valid = false;
        let mut rb = PixelReadback::new();
        rb.set_mode(ReadbackMode::Full);

        assert!(!rb.update_gpu(&mut r, UVec2::new(4, 4), true));
        assert_eq!(rb.read_pixel(&mut r, IVec2::ZERO, true), None);
        assert_eq!(rb.read_pixel(&mut r, IVec2::ZERO, false), None);
        assert!(rb.area_info(Box2i::new(IVec2::ZERO, IVec2::ONE), &AreaOptions::default()).is_none());
        assert!(r.calls.is_empty());

        assert!(!rb.update_raw(&[], StereoEye::Both));
    }

    #[test]
    fn test_degenerate_area_is_cleared() {
        let size = UVec2::new(4, 4);
        let mut rb = PixelReadback::new();
        rb.update_raw(&two_layer_video(size), StereoEye::Both);
        let flat = Box2i::new(IVec2::new(1, 1), IVec2::new(3, 1));
        assert!(rb.area_info(flat, &AreaOptions::default()).is_none());
    }
}
