//! Renderer capability used by the viewport core.
//!
//! The interaction logic and the frame orchestration only talk to this
//! trait, so gesture handling is written once and each backend supplies the
//! draw and read calls.
//!
//! # Targets
//!
//! - **Offscreen**: RGBA float target of `render_size`, raster row 0 first.
//!   Video (with color management and display adjustments) lands here and
//!   pixel reads come from here.
//! - **Window**: the widget. `present()` draws the offscreen target with
//!   the view matrix; overlays are drawn on top in raster space.
//!
//! # Pixel pack buffers
//!
//! Two pack buffers back the asynchronous readback. `issue_read(i)` starts
//! a non-blocking copy of the offscreen target into buffer `i`, `map(i)`
//! exposes a buffer to the CPU and `unmap()` releases whatever is mapped and
//! rebinds the default pack target. Use `MappedPack` so `unmap()` runs on
//! every path.

use glam::{IVec2, Mat4, UVec2};

use super::options::{CompareOptions, DisplayOptions, EnvironmentMapOptions};
use crate::color::ocio::OcioOptions;
use crate::color::spaces::Color4f;
use crate::entities::frame::VideoData;
use crate::entities::shapes::Shape;
use crate::entities::space::{Box2f, Box2i};

/// Everything the offscreen video pass needs.
#[derive(Debug, Clone, Copy)]
pub struct VideoPass<'a> {
    pub compare: &'a CompareOptions,
    pub display: &'a DisplayOptions,
    pub ocio: &'a OcioOptions,
}

pub trait Renderer {
    /// Context and offscreen target are usable.
    fn is_valid(&self) -> bool;

    /// Start a frame, (re)allocating the offscreen target if the size changed.
    fn begin_frame(&mut self, render_size: UVec2, viewport_size: UVec2, clear: Color4f);

    /// Draw the decoded video into the offscreen target.
    fn draw_video(&mut self, video: &[VideoData], pass: &VideoPass<'_>);

    /// Draw the offscreen target into the window through `view` (raster -> clip).
    fn present(&mut self, view: Mat4, env_map: &EnvironmentMapOptions);

    /// Annotation shape in raster space, `alpha` multiplies its color.
    fn draw_overlay_shape(&mut self, shape: &Shape, alpha: f32, view: Mat4);

    /// Rectangle in the space `view` maps from. `stroke` None fills it.
    fn draw_overlay_rect(&mut self, rect: Box2f, color: Color4f, stroke: Option<f32>, view: Mat4);

    fn end_frame(&mut self);

    /// Synchronous single-pixel read of the offscreen target.
    fn read_pixel(&mut self, p: IVec2) -> Option<Color4f>;

    /// Synchronous read of a region, RGBA floats row by row.
    fn read_pixels(&mut self, region: Box2i) -> Option<Vec<f32>>;

    /// Allocate both pack buffers for `size` (w * h * 4 floats each).
    fn alloc_pack_buffers(&mut self, size: UVec2) -> bool;

    /// Start a non-blocking copy of the offscreen target into buffer `index`.
    fn issue_read(&mut self, index: usize);

    /// Map buffer `index` for CPU reading.
    fn map(&mut self, index: usize) -> bool;

    /// Contents of the mapped buffer.
    fn mapped(&self) -> Option<&[f32]>;

    /// Unmap if mapped and bind the default pack target.
    fn unmap(&mut self);
}

/// Scoped mapping of a pack buffer. Dropping it unmaps.
pub struct MappedPack<'a, R: Renderer + ?Sized> {
    renderer: &'a mut R,
    ok: bool,
}

impl<'a, R: Renderer + ?Sized> MappedPack<'a, R> {
    pub fn map(renderer: &'a mut R, index: usize) -> Self {
        let ok = renderer.map(index);
        Self { renderer, ok }
    }

    pub fn data(&self) -> Option<&[f32]> {
        if self.ok { self.renderer.mapped() } else { None }
    }
}

impl<R: Renderer + ?Sized> Drop for MappedPack<'_, R> {
    fn drop(&mut self) {
        self.renderer.unmap();
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! Headless renderer recording its calls, with a CPU offscreen target.

    use super::*;
    use crate::entities::frame::StereoEye;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        BeginFrame(UVec2),
        DrawVideo(usize),
        Present,
        Shape { id: uuid::Uuid, alpha: f32 },
        Rect { rect: Box2f, filled: bool },
        EndFrame,
        ReadPixel(IVec2),
        IssueRead(usize),
        Map(usize),
        Unmap,
        BindDefaultPack,
        Alloc(UVec2),
    }

    pub struct RecordingRenderer {
        pub valid: bool,
        pub calls: Vec<Call>,
        size: UVec2,
        target: Vec<f32>,
        pbos: [Vec<f32>; 2],
        mapped: Option<usize>,
        pub fail_map: bool,
    }

    impl RecordingRenderer {
        pub fn new() -> Self {
            Self {
                valid: true,
                calls: Vec::new(),
                size: UVec2::ZERO,
                target: Vec::new(),
                pbos: [Vec::new(), Vec::new()],
                mapped: None,
                fail_map: false,
            }
        }

        pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }
    }

    impl Renderer for RecordingRenderer {
        fn is_valid(&self) -> bool {
            self.valid
        }

        fn begin_frame(&mut self, render_size: UVec2, _viewport_size: UVec2, _clear: Color4f) {
            self.calls.push(Call::BeginFrame(render_size));
            if self.size != render_size {
                self.size = render_size;
                self.target = vec![0.0; (render_size.x * render_size.y * 4) as usize];
            }
        }

        fn draw_video(&mut self, video: &[VideoData], _pass: &VideoPass<'_>) {
            self.calls.push(Call::DrawVideo(video.len()));
            let Some(v) = video.first() else {
                return;
            };
            let w = self.size.x;
            for y in 0..self.size.y {
                for x in 0..w {
                    if let Some(c) = v.composite(x, y, StereoEye::Both) {
                        let i = ((x + w * y) * 4) as usize;
                        self.target[i..i + 4].copy_from_slice(&c.to_array());
                    }
                }
            }
        }

        fn present(&mut self, _view: Mat4, _env_map: &EnvironmentMapOptions) {
            self.calls.push(Call::Present);
        }

        fn draw_overlay_shape(&mut self, shape: &Shape, alpha: f32, _view: Mat4) {
            self.calls.push(Call::Shape { id: shape.id(), alpha });
        }

        fn draw_overlay_rect(&mut self, rect: Box2f, _color: Color4f, stroke: Option<f32>, _view: Mat4) {
            self.calls.push(Call::Rect { rect, filled: stroke.is_none() });
        }

        fn end_frame(&mut self) {
            self.calls.push(Call::EndFrame);
        }

        fn read_pixel(&mut self, p: IVec2) -> Option<Color4f> {
            self.calls.push(Call::ReadPixel(p));
            if p.x < 0 || p.y < 0 || p.x >= self.size.x as i32 || p.y >= self.size.y as i32 {
                return None;
            }
            let i = (p.x as usize + self.size.x as usize * p.y as usize) * 4;
            Some(Color4f::from_slice(&self.target[i..i + 4]))
        }

        fn read_pixels(&mut self, region: Box2i) -> Option<Vec<f32>> {
            let r = region.normalized();
            let mut out = Vec::new();
            for y in r.min.y..=r.max.y {
                for x in r.min.x..=r.max.x {
                    let i = (x as usize + self.size.x as usize * y as usize) * 4;
                    out.extend_from_slice(self.target.get(i..i + 4)?);
                }
            }
            Some(out)
        }

        fn alloc_pack_buffers(&mut self, size: UVec2) -> bool {
            self.calls.push(Call::Alloc(size));
            let len = (size.x * size.y * 4) as usize;
            self.pbos = [vec![0.0; len], vec![0.0; len]];
            true
        }

        fn issue_read(&mut self, index: usize) {
            self.calls.push(Call::IssueRead(index));
            if self.pbos[index].len() == self.target.len() {
                self.pbos[index].copy_from_slice(&self.target);
            }
        }

        fn map(&mut self, index: usize) -> bool {
            self.calls.push(Call::Map(index));
            if self.fail_map {
                return false;
            }
            self.mapped = Some(index);
            true
        }

        fn mapped(&self) -> Option<&[f32]> {
            self.mapped.map(|i| self.pbos[i].as_slice())
        }

        fn unmap(&mut self) {
            if self.mapped.take().is_some() {
                self.calls.push(Call::Unmap);
            }
            self.calls.push(Call::BindDefaultPack);
        }
    }
}
