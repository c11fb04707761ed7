//! OpenGL implementation of [`Renderer`].
//!
//! Video is composited into an RGBA32F offscreen target in raster layout
//! (memory row 0 is raster row 0), then drawn into the window through the
//! view matrix with the display adjustments applied. Overlays go to a
//! window-sized RGBA8 target so erase strokes can punch through earlier
//! strokes; `end_frame` composites that target over the window.
//!
//! GL objects are created lazily on the first frame. Call `destroy()` with
//! the context current before dropping; after a context loss call
//! `invalidate()` with the new context to forget the dead handles.

use std::collections::HashMap;
use std::sync::Arc;

use eframe::glow::{self, HasContext};
use glam::{IVec2, Mat4, UVec2, Vec2};
use log::{debug, error, info, trace, warn};

use super::display::source_layout;
use super::options::{CompareMode, EnvironmentMapOptions, EnvironmentMapType, ImageFilter};
use super::renderer::{Renderer, VideoPass};
use super::shaders::{self, Shaders};
use crate::color::spaces::Color4f;
use crate::entities::frame::{Image, PixelBuffer, PixelType, Transition, VideoData};
use crate::entities::shapes::Shape;
use crate::entities::space::{Box2f, Box2i};
use crate::error::{ViewportError, ViewportResult};

const PROGRAMS: [&str; 4] = [shaders::VIDEO, shaders::DISPLAY, shaders::OVERLAY, shaders::COMPOSITE];

/// Offscreen color target.
struct Target {
    fbo: glow::Framebuffer,
    texture: glow::Texture,
    size: UVec2,
}

/// Uploaded image, keyed by the address of its allocation.
struct LayerTexture {
    key: usize,
    texture: glow::Texture,
}

/// Display adjustments captured by the video pass and applied in `present`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PresentState {
    exposure: f32,
    gamma: f32,
    saturation: f32,
    channel: i32,
    difference: bool,
    minify: ImageFilter,
    magnify: ImageFilter,
}

impl Default for PresentState {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            gamma: 1.0,
            saturation: 1.0,
            channel: 0,
            difference: false,
            minify: ImageFilter::Linear,
            magnify: ImageFilter::Linear,
        }
    }
}

impl PresentState {
    fn from_pass(pass: &VideoPass<'_>) -> Self {
        let d = pass.display;
        Self {
            exposure: d.exposure,
            gamma: d.gamma,
            saturation: d.saturation,
            channel: d.channels.shader_index(),
            difference: pass.compare.mode == CompareMode::Difference,
            minify: d.minify,
            magnify: d.magnify,
        }
    }
}

pub struct GlRenderer {
    gl: Arc<glow::Context>,
    shaders: Shaders,
    programs: HashMap<&'static str, glow::Program>,
    /// Textured quad: pos.xy, uv.xy.
    quad: Option<(glow::VertexArray, glow::Buffer)>,
    /// Overlay triangles: pos.xy.
    tris: Option<(glow::VertexArray, glow::Buffer)>,
    target: Option<Target>,
    overlay: Option<Target>,
    layers: Vec<LayerTexture>,
    pbos: [Option<glow::Buffer>; 2],
    pbo_size: UVec2,
    mapped: Option<Vec<f32>>,
    render_size: UVec2,
    window_viewport: [i32; 4],
    present: PresentState,
    f16_scratch: Vec<u16>,
    last_error: Option<String>,
}

impl GlRenderer {
    pub fn new(gl: Arc<glow::Context>, shaders: Shaders) -> Self {
        Self {
            gl,
            shaders,
            programs: HashMap::new(),
            quad: None,
            tris: None,
            target: None,
            overlay: None,
            layers: Vec::new(),
            pbos: [None, None],
            pbo_size: UVec2::ZERO,
            mapped: None,
            render_size: UVec2::ZERO,
            window_viewport: [0; 4],
            present: PresentState::default(),
            f16_scratch: Vec::new(),
            last_error: None,
        }
    }

    /// Last shader compile or link error, if any.
    pub fn shader_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Swap shader sources. Programs are rebuilt on the next frame.
    pub fn reload_shaders(&mut self, shaders: Shaders) {
        self.shaders = shaders;
        let gl = self.gl.clone();
        for (_, program) in self.programs.drain() {
            unsafe { gl.delete_program(program) };
        }
        self.last_error = None;
        info!("Viewport shaders reloaded");
    }

    fn ensure_initialized(&mut self) -> ViewportResult<()> {
        for name in PROGRAMS {
            if self.programs.contains_key(name) {
                continue;
            }
            let (vertex, fragment) = self.shaders.get(name).ok_or(ViewportError::NotReady("shader source"))?;
            let program =
                compile_program(&self.gl, vertex, fragment).map_err(|e| ViewportError::Gl(format!("{name}: {e}")))?;
            debug!("Compiled viewport program {}", name);
            self.programs.insert(name, program);
        }

        let gl = &self.gl;
        if self.quad.is_none() {
            self.quad = Some(create_vertex_array(gl, 4).map_err(ViewportError::Gl)?);
        }
        if self.tris.is_none() {
            self.tris = Some(create_vertex_array(gl, 2).map_err(ViewportError::Gl)?);
        }
        Ok(())
    }

    fn program(&self, name: &str) -> Option<glow::Program> {
        self.programs.get(name).copied()
    }

    /// Upload `image` into texture slot `slot` unless that slot already holds it.
    fn upload(&mut self, slot: usize, image: &Arc<Image>) -> Option<glow::Texture> {
        let key = Arc::as_ptr(image) as usize;
        if let Some(layer) = self.layers.get(slot)
            && layer.key == key
        {
            return Some(layer.texture);
        }

        let gl = self.gl.clone();
        let texture = match self.layers.get(slot) {
            Some(layer) => layer.texture,
            None => {
                let texture = unsafe { gl.create_texture() }
                    .map_err(|e| warn!("Failed to create layer texture: {}", e))
                    .ok()?;
                self.layers.push(LayerTexture { key: 0, texture });
                texture
            }
        };

        let size = image.size();
        let count = image.pixel_type().element_count(size);
        let converted: Vec<f32>;
        let (internal, format, ty, bytes): (u32, u32, u32, &[u8]) = match (image.pixel_type(), image.buffer()) {
            (PixelType::Rgba8, PixelBuffer::U8(v)) => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE, &v[..count]),
            (PixelType::Rgb8, PixelBuffer::U8(v)) => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE, &v[..count]),
            (PixelType::RgbaF16, PixelBuffer::F16(v)) => {
                self.f16_scratch.clear();
                self.f16_scratch.extend(v[..count].iter().map(|h| h.to_bits()));
                (
                    glow::RGBA16F,
                    glow::RGBA,
                    glow::HALF_FLOAT,
                    bytemuck::cast_slice(&self.f16_scratch),
                )
            }
            (PixelType::RgbaF32, PixelBuffer::F32(v)) => {
                (glow::RGBA32F, glow::RGBA, glow::FLOAT, bytemuck::cast_slice(&v[..count]))
            }
            // planar YUV, 10/16-bit and RGB float go through the CPU conversion
            _ => {
                converted = image.to_rgba_f32();
                (glow::RGBA32F, glow::RGBA, glow::FLOAT, bytemuck::cast_slice(&converted))
            }
        };

        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                size.x as i32,
                size.y as i32,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(Some(bytes)),
            );
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
            set_filter(&gl, ImageFilter::Linear, ImageFilter::Linear);
        }
        trace!("Uploaded layer {} {}x{} {:?}", slot, size.x, size.y, image.pixel_type());

        if let Some(layer) = self.layers.get_mut(slot) {
            layer.key = key;
        }
        Some(texture)
    }

    fn draw_quad(&self, rect: Box2f, uv_min: Vec2, uv_max: Vec2) {
        let Some((vao, vbo)) = self.quad else {
            return;
        };
        let vertices: [f32; 16] = [
            rect.min.x, rect.min.y, uv_min.x, uv_min.y, //
            rect.max.x, rect.min.y, uv_max.x, uv_min.y, //
            rect.max.x, rect.max.y, uv_max.x, uv_max.y, //
            rect.min.x, rect.max.y, uv_min.x, uv_max.y,
        ];
        let gl = &self.gl;
        unsafe {
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(&vertices), glow::DYNAMIC_DRAW);
            gl.draw_arrays(glow::TRIANGLE_FAN, 0, 4);
        }
    }

    fn draw_triangles(&mut self, triangles: &[Vec2], color: Color4f, erase: bool, view: Mat4) {
        if triangles.is_empty() {
            return;
        }
        let (Some(program), Some(overlay), Some((vao, vbo))) =
            (self.program(shaders::OVERLAY), self.overlay.as_ref(), self.tris)
        else {
            return;
        };
        let flat: Vec<f32> = triangles.iter().flat_map(|p| [p.x, p.y]).collect();
        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(overlay.fbo));
            gl.viewport(0, 0, overlay.size.x as i32, overlay.size.y as i32);
            gl.use_program(Some(program));
            gl.enable(glow::BLEND);
            if erase {
                gl.blend_func(glow::ZERO, glow::ONE_MINUS_SRC_ALPHA);
            } else {
                gl.blend_func_separate(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA, glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
            }
            uniform_mat4(gl, program, "u_mvp", view);
            uniform_vec4(gl, program, "u_color", color.to_array());
            uniform_i32(gl, program, "u_erase", erase as i32);
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(&flat), glow::DYNAMIC_DRAW);
            gl.draw_arrays(glow::TRIANGLES, 0, triangles.len() as i32);
        }
    }

    fn read_target(&self, x: i32, y: i32, w: i32, h: i32, out: &mut [f32]) -> bool {
        let Some(target) = self.target.as_ref() else {
            return false;
        };
        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(target.fbo));
            gl.read_pixels(
                x,
                y,
                w,
                h,
                glow::RGBA,
                glow::FLOAT,
                glow::PixelPackData::Slice(Some(bytemuck::cast_slice_mut(out))),
            );
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        }
        true
    }

    fn delete_pack_buffers(&mut self) {
        let gl = self.gl.clone();
        for pbo in self.pbos.iter_mut() {
            if let Some(buffer) = pbo.take() {
                unsafe { gl.delete_buffer(buffer) };
            }
        }
        self.pbo_size = UVec2::ZERO;
    }

    /// Free every GL object. Needs the context current.
    pub fn destroy(&mut self) {
        let gl = self.gl.clone();
        unsafe {
            for (_, program) in self.programs.drain() {
                gl.delete_program(program);
            }
            for (vao, vbo) in [self.quad.take(), self.tris.take()].into_iter().flatten() {
                gl.delete_vertex_array(vao);
                gl.delete_buffer(vbo);
            }
            for target in [self.target.take(), self.overlay.take()].into_iter().flatten() {
                delete_target(&gl, target);
            }
            for layer in self.layers.drain(..) {
                gl.delete_texture(layer.texture);
            }
        }
        self.delete_pack_buffers();
        self.mapped = None;
        debug!("GlRenderer destroyed");
    }

    /// Forget every handle without touching GL and adopt a new context.
    pub fn invalidate(&mut self, gl: Arc<glow::Context>) {
        warn!("GL context replaced, dropping viewport GL objects");
        self.programs.clear();
        self.quad = None;
        self.tris = None;
        self.target = None;
        self.overlay = None;
        self.layers.clear();
        self.pbos = [None, None];
        self.pbo_size = UVec2::ZERO;
        self.mapped = None;
        self.last_error = None;
        self.gl = gl;
    }

    fn has_resources(&self) -> bool {
        !self.programs.is_empty()
            || self.quad.is_some()
            || self.target.is_some()
            || !self.layers.is_empty()
            || self.pbos.iter().any(Option::is_some)
    }
}

impl Renderer for GlRenderer {
    fn is_valid(&self) -> bool {
        self.last_error.is_none()
    }

    fn begin_frame(&mut self, render_size: UVec2, _viewport_size: UVec2, clear: Color4f) {
        let mut viewport = [0i32; 4];
        unsafe { self.gl.get_parameter_i32_slice(glow::VIEWPORT, &mut viewport) };
        // overlay and present follow the window viewport egui set up
        self.window_viewport = viewport;
        self.render_size = render_size;

        if let Err(e) = self.ensure_initialized() {
            error!("Viewport renderer init failed: {}", e);
            self.last_error = Some(e.to_string());
            return;
        }

        let gl = self.gl.clone();
        let render = render_size.max(UVec2::ONE);
        if self.target.as_ref().is_none_or(|t| t.size != render) {
            if let Some(old) = self.target.take() {
                delete_target(&gl, old);
            }
            match create_target(&gl, render, glow::RGBA32F, glow::FLOAT) {
                Ok(t) => {
                    info!("Offscreen target {}x{}", render.x, render.y);
                    self.target = Some(t);
                }
                Err(e) => error!("Failed to create offscreen target: {}", e),
            }
        }
        let window = UVec2::new(viewport[2].max(1) as u32, viewport[3].max(1) as u32);
        if self.overlay.as_ref().is_none_or(|t| t.size != window) {
            if let Some(old) = self.overlay.take() {
                delete_target(&gl, old);
            }
            match create_target(&gl, window, glow::RGBA8, glow::UNSIGNED_BYTE) {
                Ok(t) => {
                    debug!("Overlay target {}x{}", window.x, window.y);
                    self.overlay = Some(t);
                }
                Err(e) => error!("Failed to create overlay target: {}", e),
            }
        }

        unsafe {
            if let Some(overlay) = self.overlay.as_ref() {
                gl.bind_framebuffer(glow::FRAMEBUFFER, Some(overlay.fbo));
                gl.viewport(0, 0, overlay.size.x as i32, overlay.size.y as i32);
                gl.clear_color(0.0, 0.0, 0.0, 0.0);
                gl.clear(glow::COLOR_BUFFER_BIT);
            }
            if let Some(target) = self.target.as_ref() {
                gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.fbo));
                gl.viewport(0, 0, target.size.x as i32, target.size.y as i32);
                gl.clear_color(clear.r, clear.g, clear.b, clear.a);
                gl.clear(glow::COLOR_BUFFER_BIT);
            }
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.viewport(viewport[0], viewport[1], viewport[2], viewport[3]);
        }
    }

    fn draw_video(&mut self, video: &[VideoData], pass: &VideoPass<'_>) {
        let (Some(fbo), Some(program)) = (self.target.as_ref().map(|t| t.fbo), self.program(shaders::VIDEO)) else {
            return;
        };
        self.present = PresentState::from_pass(pass);
        let compare = pass.compare;
        let render = self.render_size.max(UVec2::ONE).as_vec2();
        let gl = self.gl.clone();

        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
            gl.viewport(0, 0, render.x as i32, render.y as i32);
            gl.use_program(Some(program));
            gl.enable(glow::BLEND);
            // raster y down maps to memory row order
            uniform_mat4(&gl, program, "u_mvp", Mat4::orthographic_rh_gl(0.0, render.x, 0.0, render.y, -1.0, 1.0));
            uniform_i32(&gl, program, "u_image", 0);
            uniform_i32(&gl, program, "u_image_b", 1);
            uniform_vec2(&gl, program, "u_render_size", render);
            uniform_vec2(&gl, program, "u_wipe_center", compare.wipe_center);
            uniform_f32(&gl, program, "u_wipe_rotation", compare.wipe_rotation.to_radians());
            uniform_f32(&gl, program, "u_overlay", compare.overlay);
        }

        let mut slot = 0;
        for (index, rect) in source_layout(video, compare.mode) {
            let Some(source) = video.get(index) else {
                continue;
            };
            let role = match (index, compare.mode) {
                (0, _) => 0,
                (_, CompareMode::Wipe) => 1,
                (_, CompareMode::Overlay) => 2,
                _ => 0,
            };
            let difference = index > 0 && compare.mode == CompareMode::Difference;
            unsafe {
                uniform_i32(&gl, program, "u_compare", role);
                if difference {
                    gl.blend_equation(glow::FUNC_REVERSE_SUBTRACT);
                    gl.blend_func(glow::ONE, glow::ONE);
                } else {
                    gl.blend_equation(glow::FUNC_ADD);
                    gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
                }
            }

            // stereo sources show the left eye
            let layers = if source.stereo {
                &source.layers[..source.layers.len().min(1)]
            } else {
                &source.layers[..]
            };
            for layer in layers {
                let Some(image) = layer.image.as_ref() else {
                    continue;
                };
                let Some(texture) = self.upload(slot, image) else {
                    continue;
                };
                slot += 1;
                let dissolve = match (layer.transition, layer.image_b.as_ref()) {
                    (Transition::Dissolve, Some(b)) => {
                        let t = self.upload(slot, b);
                        slot += 1;
                        t.map(|t| (t, layer.transition_value))
                    }
                    _ => None,
                };
                unsafe {
                    gl.use_program(Some(program));
                    gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
                    gl.active_texture(glow::TEXTURE0);
                    gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                    gl.active_texture(glow::TEXTURE1);
                    gl.bind_texture(glow::TEXTURE_2D, dissolve.map(|(t, _)| t));
                    gl.active_texture(glow::TEXTURE0);
                    uniform_f32(&gl, program, "u_dissolve", dissolve.map_or(0.0, |(_, v)| v));
                }
                self.draw_quad(rect, Vec2::ZERO, Vec2::ONE);
            }
        }

        unsafe {
            gl.blend_equation(glow::FUNC_ADD);
            gl.disable(glow::BLEND);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    fn present(&mut self, view: Mat4, env_map: &EnvironmentMapOptions) {
        let (Some(texture), Some(program)) = (self.target.as_ref().map(|t| t.texture), self.program(shaders::DISPLAY))
        else {
            return;
        };
        let p = self.present;
        let [x, y, w, h] = self.window_viewport;
        let env = match env_map.kind {
            EnvironmentMapType::None => 0,
            EnvironmentMapType::Spherical => 1,
            EnvironmentMapType::Cubic => 2,
        };
        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.viewport(x, y, w, h);
            gl.use_program(Some(program));
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            set_filter(gl, p.minify, p.magnify);
            uniform_i32(gl, program, "u_texture", 0);
            uniform_f32(gl, program, "u_exposure", p.exposure);
            uniform_f32(gl, program, "u_gamma", p.gamma);
            uniform_f32(gl, program, "u_saturation", p.saturation);
            uniform_i32(gl, program, "u_channel", p.channel);
            uniform_i32(gl, program, "u_difference", p.difference as i32);
            uniform_i32(gl, program, "u_env", env);
            uniform_vec2(
                gl,
                program,
                "u_env_rotation",
                Vec2::new(env_map.rotate_x.to_radians(), env_map.rotate_y.to_radians()),
            );
            uniform_f32(gl, program, "u_fov", env_map.fov_degrees().to_radians());
            uniform_f32(gl, program, "u_aspect", w.max(1) as f32 / h.max(1) as f32);
        }

        if env == 0 {
            unsafe { uniform_mat4(gl, program, "u_mvp", view) };
            self.draw_quad(Box2f::from_size(self.render_size), Vec2::ZERO, Vec2::ONE);
        } else {
            // full window, uv (0, 0) at the top left
            unsafe { uniform_mat4(gl, program, "u_mvp", Mat4::IDENTITY) };
            self.draw_quad(Box2f::new(Vec2::splat(-1.0), Vec2::ONE), Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0));
        }
    }

    fn draw_overlay_shape(&mut self, shape: &Shape, alpha: f32, view: Mat4) {
        let color = shape.base().draw_color();
        let color = color.with_alpha(color.a * alpha);
        let erase = matches!(shape, Shape::ErasePath(_));
        self.draw_triangles(&shape.triangles(), color, erase, view);
    }

    fn draw_overlay_rect(&mut self, rect: Box2f, color: Color4f, stroke: Option<f32>, view: Mat4) {
        self.draw_triangles(&rect_triangles(rect, stroke), color, false, view);
    }

    fn end_frame(&mut self) {
        let gl = self.gl.clone();
        let [x, y, w, h] = self.window_viewport;
        if let (Some(texture), Some(program)) =
            (self.overlay.as_ref().map(|t| t.texture), self.program(shaders::COMPOSITE))
        {
            unsafe {
                gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                gl.viewport(x, y, w, h);
                gl.use_program(Some(program));
                gl.enable(glow::BLEND);
                gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
                gl.active_texture(glow::TEXTURE0);
                gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                uniform_i32(&gl, program, "u_texture", 0);
                uniform_mat4(&gl, program, "u_mvp", Mat4::IDENTITY);
            }
            self.draw_quad(Box2f::new(Vec2::splat(-1.0), Vec2::ONE), Vec2::ZERO, Vec2::ONE);
        }
        unsafe {
            gl.disable(glow::BLEND);
            gl.use_program(None);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.viewport(x, y, w, h);
        }
    }

    fn read_pixel(&mut self, p: IVec2) -> Option<Color4f> {
        let size = self.target.as_ref()?.size;
        if p.x < 0 || p.y < 0 || p.x >= size.x as i32 || p.y >= size.y as i32 {
            return None;
        }
        let mut px = [0.0f32; 4];
        self.read_target(p.x, p.y, 1, 1, &mut px).then(|| Color4f::from_slice(&px))
    }

    fn read_pixels(&mut self, region: Box2i) -> Option<Vec<f32>> {
        let size = self.target.as_ref()?.size;
        let r = region.normalized();
        if r.min.x < 0 || r.min.y < 0 || r.max.x >= size.x as i32 || r.max.y >= size.y as i32 {
            return None;
        }
        let mut out = vec![0.0f32; (r.width() * r.height() * 4) as usize];
        self.read_target(r.min.x, r.min.y, r.width(), r.height(), &mut out)
            .then_some(out)
    }

    fn alloc_pack_buffers(&mut self, size: UVec2) -> bool {
        self.delete_pack_buffers();
        let bytes = (size.x as usize * size.y as usize * 4 * std::mem::size_of::<f32>()) as i32;
        let gl = self.gl.clone();
        for pbo in self.pbos.iter_mut() {
            let buffer = match unsafe { gl.create_buffer() } {
                Ok(b) => b,
                Err(e) => {
                    error!("Failed to create pack buffer: {}", e);
                    return false;
                }
            };
            unsafe {
                gl.bind_buffer(glow::PIXEL_PACK_BUFFER, Some(buffer));
                gl.buffer_data_size(glow::PIXEL_PACK_BUFFER, bytes, glow::STREAM_READ);
            }
            *pbo = Some(buffer);
        }
        unsafe { gl.bind_buffer(glow::PIXEL_PACK_BUFFER, None) };
        self.pbo_size = size;
        debug!("Pack buffers {}x{}", size.x, size.y);
        true
    }

    fn issue_read(&mut self, index: usize) {
        let (Some(buffer), Some(target)) = (self.pbos.get(index).copied().flatten(), self.target.as_ref()) else {
            return;
        };
        if target.size != self.pbo_size {
            trace!("Skipping read into stale pack buffer {}", index);
            return;
        }
        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(target.fbo));
            gl.bind_buffer(glow::PIXEL_PACK_BUFFER, Some(buffer));
            gl.read_pixels(
                0,
                0,
                target.size.x as i32,
                target.size.y as i32,
                glow::RGBA,
                glow::FLOAT,
                glow::PixelPackData::BufferOffset(0),
            );
            gl.bind_buffer(glow::PIXEL_PACK_BUFFER, None);
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        }
    }

    /// Maps the buffer and copies it out; the GL mapping ends before returning.
    fn map(&mut self, index: usize) -> bool {
        let Some(buffer) = self.pbos.get(index).copied().flatten() else {
            return false;
        };
        let floats = self.pbo_size.x as usize * self.pbo_size.y as usize * 4;
        let bytes = floats * std::mem::size_of::<f32>();
        let gl = &self.gl;
        unsafe {
            gl.bind_buffer(glow::PIXEL_PACK_BUFFER, Some(buffer));
            let ptr = gl.map_buffer_range(glow::PIXEL_PACK_BUFFER, 0, bytes as i32, glow::MAP_READ_BIT);
            if ptr.is_null() {
                warn!("Failed to map pack buffer {}", index);
                return false;
            }
            let mut data = vec![0.0f32; floats];
            bytemuck::cast_slice_mut::<f32, u8>(&mut data).copy_from_slice(std::slice::from_raw_parts(ptr, bytes));
            gl.unmap_buffer(glow::PIXEL_PACK_BUFFER);
            self.mapped = Some(data);
        }
        true
    }

    fn mapped(&self) -> Option<&[f32]> {
        self.mapped.as_deref()
    }

    fn unmap(&mut self) {
        self.mapped = None;
        unsafe { self.gl.bind_buffer(glow::PIXEL_PACK_BUFFER, None) };
    }
}

impl Drop for GlRenderer {
    fn drop(&mut self) {
        if self.has_resources() {
            error!("GlRenderer dropped without calling destroy() - GPU resources leaked!");
        }
    }
}

/// Triangles covering `rect`, or its outline of width `stroke` drawn inside it.
pub fn rect_triangles(rect: Box2f, stroke: Option<f32>) -> Vec<Vec2> {
    let quad = |min: Vec2, max: Vec2| {
        [
            min,
            Vec2::new(max.x, min.y),
            max,
            min,
            max,
            Vec2::new(min.x, max.y),
        ]
    };
    let Some(w) = stroke else {
        return quad(rect.min, rect.max).to_vec();
    };
    let size = rect.size();
    let w = w.min(size.x * 0.5).min(size.y * 0.5).max(0.0);
    let (min, max) = (rect.min, rect.max);
    let mut out = Vec::with_capacity(24);
    out.extend(quad(min, Vec2::new(max.x, min.y + w)));
    out.extend(quad(Vec2::new(min.x, max.y - w), max));
    out.extend(quad(Vec2::new(min.x, min.y + w), Vec2::new(min.x + w, max.y - w)));
    out.extend(quad(Vec2::new(max.x - w, min.y + w), Vec2::new(max.x, max.y - w)));
    out
}

fn compile_program(gl: &glow::Context, vertex: &str, fragment: &str) -> Result<glow::Program, String> {
    unsafe {
        let program = gl.create_program()?;
        let mut attached = Vec::with_capacity(2);
        for (kind, source) in [(glow::VERTEX_SHADER, vertex), (glow::FRAGMENT_SHADER, fragment)] {
            let shader = gl.create_shader(kind)?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                for s in attached {
                    gl.delete_shader(s);
                }
                gl.delete_program(program);
                return Err(format!("shader compile failed: {log}"));
            }
            gl.attach_shader(program, shader);
            attached.push(shader);
        }
        gl.link_program(program);
        let linked = gl.get_program_link_status(program);
        for shader in attached {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }
        if !linked {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(format!("program link failed: {log}"));
        }
        Ok(program)
    }
}

/// Vertex array with attribute 0 = vec2 position and, for 4 components, attribute 1 = vec2 uv.
fn create_vertex_array(gl: &glow::Context, components: i32) -> Result<(glow::VertexArray, glow::Buffer), String> {
    unsafe {
        let vao = gl.create_vertex_array()?;
        let vbo = gl.create_buffer()?;
        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        let stride = components * std::mem::size_of::<f32>() as i32;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
        if components == 4 {
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, stride, 2 * std::mem::size_of::<f32>() as i32);
        }
        gl.bind_vertex_array(None);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        Ok((vao, vbo))
    }
}

fn create_target(gl: &glow::Context, size: UVec2, internal: u32, ty: u32) -> Result<Target, String> {
    unsafe {
        let texture = gl.create_texture()?;
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            internal as i32,
            size.x as i32,
            size.y as i32,
            0,
            glow::RGBA,
            ty,
            glow::PixelUnpackData::Slice(None),
        );
        set_filter(gl, ImageFilter::Nearest, ImageFilter::Nearest);
        gl.bind_texture(glow::TEXTURE_2D, None);

        let fbo = gl.create_framebuffer()?;
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
        gl.framebuffer_texture_2d(glow::FRAMEBUFFER, glow::COLOR_ATTACHMENT0, glow::TEXTURE_2D, Some(texture), 0);
        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        if status != glow::FRAMEBUFFER_COMPLETE {
            gl.delete_framebuffer(fbo);
            gl.delete_texture(texture);
            return Err(format!("framebuffer incomplete: 0x{status:x}"));
        }
        Ok(Target { fbo, texture, size })
    }
}

fn delete_target(gl: &glow::Context, target: Target) {
    unsafe {
        gl.delete_framebuffer(target.fbo);
        gl.delete_texture(target.texture);
    }
}

/// Sets filtering and edge clamping on the bound 2D texture.
unsafe fn set_filter(gl: &glow::Context, minify: ImageFilter, magnify: ImageFilter) {
    let filter = |f: ImageFilter| match f {
        ImageFilter::Nearest => glow::NEAREST as i32,
        ImageFilter::Linear => glow::LINEAR as i32,
    };
    unsafe {
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter(minify));
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter(magnify));
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
    }
}

unsafe fn uniform_i32(gl: &glow::Context, program: glow::Program, name: &str, v: i32) {
    unsafe {
        if let Some(loc) = gl.get_uniform_location(program, name) {
            gl.uniform_1_i32(Some(&loc), v);
        }
    }
}

unsafe fn uniform_f32(gl: &glow::Context, program: glow::Program, name: &str, v: f32) {
    unsafe {
        if let Some(loc) = gl.get_uniform_location(program, name) {
            gl.uniform_1_f32(Some(&loc), v);
        }
    }
}

unsafe fn uniform_vec2(gl: &glow::Context, program: glow::Program, name: &str, v: Vec2) {
    unsafe {
        if let Some(loc) = gl.get_uniform_location(program, name) {
            gl.uniform_2_f32(Some(&loc), v.x, v.y);
        }
    }
}

unsafe fn uniform_vec4(gl: &glow::Context, program: glow::Program, name: &str, v: [f32; 4]) {
    unsafe {
        if let Some(loc) = gl.get_uniform_location(program, name) {
            gl.uniform_4_f32(Some(&loc), v[0], v[1], v[2], v[3]);
        }
    }
}

unsafe fn uniform_mat4(gl: &glow::Context, program: glow::Program, name: &str, m: Mat4) {
    unsafe {
        if let Some(loc) = gl.get_uniform_location(program, name) {
            gl.uniform_matrix_4_f32_slice(Some(&loc), false, &m.to_cols_array());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_rect_is_two_triangles() {
        let rect = Box2f::new(Vec2::ZERO, Vec2::new(10.0, 4.0));
        let tris = rect_triangles(rect, None);
        assert_eq!(tris.len(), 6);
        let area: f32 = tris
            .chunks_exact(3)
            .map(|t| ((t[1] - t[0]).perp_dot(t[2] - t[0]) * 0.5).abs())
            .sum();
        assert!((area - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_outline_stays_inside() {
        let rect = Box2f::new(Vec2::new(2.0, 2.0), Vec2::new(12.0, 6.0));
        let tris = rect_triangles(rect, Some(1.0));
        assert_eq!(tris.len(), 24);
        assert!(tris.iter().all(|p| p.x >= 2.0 && p.x <= 12.0 && p.y >= 2.0 && p.y <= 6.0));
        let area: f32 = tris
            .chunks_exact(3)
            .map(|t| ((t[1] - t[0]).perp_dot(t[2] - t[0]) * 0.5).abs())
            .sum();
        // frame of a 10x4 box with a 1px border
        assert!((area - (40.0 - 8.0 * 2.0)).abs() < 1e-4);

        // stroke wider than the box is clamped to a fill
        let thick = rect_triangles(rect, Some(50.0));
        let area: f32 = thick
            .chunks_exact(3)
            .map(|t| ((t[1] - t[0]).perp_dot(t[2] - t[0]) * 0.5).abs())
            .sum();
        assert!((area - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_present_state_from_pass() {
        use crate::color::ocio::OcioOptions;
        use crate::widgets::viewport::options::{Channels, CompareOptions, DisplayOptions};

        let mut display = DisplayOptions::default();
        display.channels = Channels::Alpha;
        display.exposure = 2.0;
        let compare = CompareOptions {
            mode: CompareMode::Difference,
            ..Default::default()
        };
        let ocio = OcioOptions::default();
        let state = PresentState::from_pass(&VideoPass {
            compare: &compare,
            display: &display,
            ocio: &ocio,
        });
        assert_eq!(state.channel, Channels::Alpha.shader_index());
        assert_eq!(state.exposure, 2.0);
        assert!(state.difference);
    }
}
