//! Per-frame render orchestration.
//!
//! `FramePlan::build` gathers everything one frame draws from the viewport
//! state, the player and the settings; `submit` replays it on a renderer in
//! a fixed order:
//!
//! 1. offscreen target sized to the render, video with compare options
//! 2. offscreen target into the window through the view matrix
//! 3. crop mask bars, data/display windows, safe areas (raster space)
//! 4. annotation shapes, ghosts first
//! 5. selection outline
//!
//! Text (HUD, help, text shapes) is left to the host, which positions the
//! labels the plan computed in window space.

use glam::{Mat4, UVec2, Vec2};

use super::hud::{self, HudInput};
use super::options::{CompareMode, EnvironmentMapOptions};
use super::renderer::{Renderer, VideoPass};
use super::viewport::ViewportState;
use crate::color::spaces::Color4f;
use crate::core::player::Player;
use crate::core::settings::Settings;
use crate::entities::frame::VideoData;
use crate::entities::shapes::Shape;
use crate::entities::space::{fit_aspect, Box2f};

pub const MASK_COLOR: Color4f = Color4f::BLACK;
pub const SELECTION_COLOR: Color4f = Color4f::WHITE;
pub const DATA_WINDOW_COLOR: Color4f = Color4f::new(0.5, 0.5, 0.5, 1.0);
pub const DISPLAY_WINDOW_COLOR: Color4f = Color4f::new(1.0, 0.3, 0.0, 1.0);
pub const ACTION_SAFE_COLOR: Color4f = Color4f::new(1.0, 0.0, 0.0, 1.0);
pub const TITLE_SAFE_COLOR: Color4f = Color4f::new(1.0, 1.0, 0.0, 1.0);
pub const FILM_SAFE_COLOR: Color4f = Color4f::new(0.0, 1.0, 1.0, 1.0);

const HDTV_ASPECT: f32 = 1.77;
const SDTV_ASPECT: f32 = 1.33;
const FILM_ASPECTS: [f32; 3] = [2.35, 1.85, 1.66];
const ACTION_SAFE: f32 = 0.9;
const TITLE_SAFE: f32 = 0.8;

/// Outline or filled rectangle in raster space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayRect {
    pub rect: Box2f,
    pub color: Color4f,
    /// Outline width in window pixels, None fills.
    pub stroke: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedShape {
    pub shape: Shape,
    pub alpha: f32,
}

/// Text the host draws at a window position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub pos: Vec2,
    pub text: String,
    pub font: String,
    /// Font size in window pixels.
    pub size: f32,
    pub color: Color4f,
}

/// Values the plan reads besides the viewport state.
pub struct FrameInputs<'a> {
    pub state: &'a ViewportState,
    pub settings: &'a Settings,
    pub player: Option<&'a Player>,
    /// Help text and its current opacity.
    pub help: Option<(&'a str, f32)>,
    pub actual_fps: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct FramePlan {
    pub render_size: UVec2,
    pub viewport_size: UVec2,
    pub clear: Color4f,
    /// Raster -> clip.
    pub view: Mat4,
    pub zoom: f32,
    pub rects: Vec<OverlayRect>,
    pub shapes: Vec<PlannedShape>,
    pub selection: Option<Box2f>,
    pub labels: Vec<TextLabel>,
    pub hud: Vec<String>,
    pub help: Option<(String, f32)>,
}

impl FramePlan {
    pub fn build(inputs: &FrameInputs<'_>) -> Self {
        let state = inputs.state;
        let render_size = state.render_size;
        let zoom = state.view_zoom.max(f32::EPSILON);
        let mut plan = FramePlan {
            render_size,
            viewport_size: state.viewport_size,
            clear: Color4f::BLACK,
            view: state.gl_matrix(),
            zoom,
            help: inputs.help.map(|(t, a)| (t.to_string(), a)),
            ..Default::default()
        };

        let outline = |rect: Box2f, color: Color4f| OverlayRect {
            rect,
            color,
            stroke: Some(1.0),
        };

        if state.masking > 0.0 {
            for rect in masking_bars(render_size, state.masking) {
                plan.rects.push(OverlayRect {
                    rect,
                    color: MASK_COLOR,
                    stroke: None,
                });
            }
        }

        let media = inputs.player.map(|p| &p.media);
        if state.data_window
            && let Some(dw) = media.and_then(|m| m.data_window)
        {
            plan.rects.push(outline(dw.to_f32(), DATA_WINDOW_COLOR));
        }
        if state.display_window
            && let Some(dw) = media.and_then(|m| m.display_window)
        {
            plan.rects.push(outline(dw.to_f32(), DISPLAY_WINDOW_COLOR));
        }
        if state.safe_areas {
            plan.rects
                .extend(safe_areas(render_size).into_iter().map(|(r, c)| outline(r, c)));
        }

        if let Some(player) = inputs.player {
            if state.show_annotations {
                plan.collect_shapes(state, inputs.settings, player);
            }
            if !state.hud.is_empty() {
                let input = HudInput {
                    media: &player.media,
                    render_size,
                    time: player.current_time(),
                    range: player.range(),
                    actual_fps: inputs.actual_fps,
                };
                plan.hud = hud::lines(state.hud, &input);
            }
        }

        plan.selection = state.normalized_selection().map(|b| b.to_f32());
        plan
    }

    fn collect_shapes(&mut self, state: &ViewportState, settings: &Settings, player: &Player) {
        let time = player.current_time();
        let annotations = player.annotations();

        let mut push = |shape: &Shape, alpha: f32| {
            if let Shape::Text(text) = shape {
                let Some(&p) = text.base.points.first() else {
                    return;
                };
                let c = text.base.draw_color();
                self.labels.push(TextLabel {
                    pos: state.raster_to_window(p),
                    text: text.text.clone(),
                    font: text.font.clone(),
                    size: text.font_size as f32 * state.view_zoom,
                    color: c.with_alpha(c.a * alpha),
                });
            } else {
                self.shapes.push(PlannedShape {
                    shape: shape.clone(),
                    alpha,
                });
            }
        };

        if settings.show_ghosts() {
            for (annotation, alpha) in annotations.ghosts(&time, settings.ghost_previous(), settings.ghost_next()) {
                for shape in &annotation.shapes {
                    push(shape, alpha);
                }
            }
        }
        for annotation in annotations.visible_at(&time) {
            for shape in &annotation.shapes {
                push(shape, 1.0);
            }
        }
    }

    /// Replay the plan. A renderer that is not ready draws nothing.
    pub fn submit<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        video: &[VideoData],
        pass: &VideoPass<'_>,
        env_map: &EnvironmentMapOptions,
    ) {
        if !renderer.is_valid() {
            return;
        }
        renderer.begin_frame(self.render_size, self.viewport_size, self.clear);
        renderer.draw_video(video, pass);
        renderer.present(self.view, env_map);

        // stroke widths are given in window pixels
        let px = 1.0 / self.zoom;
        for r in &self.rects {
            renderer.draw_overlay_rect(r.rect, r.color, r.stroke.map(|w| w * px), self.view);
        }
        for s in &self.shapes {
            renderer.draw_overlay_shape(&s.shape, s.alpha, self.view);
        }
        if let Some(sel) = self.selection {
            renderer.draw_overlay_rect(sel, SELECTION_COLOR, Some(px), self.view);
        }
        renderer.end_frame();
    }
}

/// Bars masking the render to `aspect`.
///
/// Of the two candidate bar pairs (top/bottom or left/right) the one with a
/// positive amount wins; equal aspects need no bars.
pub fn masking_bars(render_size: UVec2, aspect: f32) -> Vec<Box2f> {
    if render_size.x == 0 || render_size.y == 0 || aspect <= 0.0 {
        return Vec::new();
    }
    let w = render_size.x as f32;
    let h = render_size.y as f32;
    let amount_y = 0.5 - (w / h) / aspect * 0.5;
    let amount_x = 0.5 - aspect * (h / w) * 0.5;

    if amount_y >= amount_x && amount_y > 1e-4 {
        let bar = h * amount_y;
        vec![
            Box2f::new(Vec2::ZERO, Vec2::new(w, bar)),
            Box2f::new(Vec2::new(0.0, h - bar), Vec2::new(w, h)),
        ]
    } else if amount_x > 1e-4 {
        let bar = w * amount_x;
        vec![
            Box2f::new(Vec2::ZERO, Vec2::new(bar, h)),
            Box2f::new(Vec2::new(w - bar, 0.0), Vec2::new(w, h)),
        ]
    } else {
        Vec::new()
    }
}

/// Safe-area guides for a render of `render_size`.
///
/// Wide renders get HDTV action/title safe plus the film extractions;
/// narrower ones get 4:3 action/title safe.
pub fn safe_areas(render_size: UVec2) -> Vec<(Box2f, Color4f)> {
    if render_size.x == 0 || render_size.y == 0 {
        return Vec::new();
    }
    let aspect = render_size.x as f32 / render_size.y as f32;
    let mut out = Vec::new();
    let tv = if aspect >= HDTV_ASPECT - 0.01 { HDTV_ASPECT } else { SDTV_ASPECT };
    let frame = fit_aspect(render_size, tv);
    out.push((frame.scaled(ACTION_SAFE), ACTION_SAFE_COLOR));
    out.push((frame.scaled(TITLE_SAFE), TITLE_SAFE_COLOR));
    if tv == HDTV_ASPECT {
        for film in FILM_ASPECTS {
            out.push((fit_aspect(render_size, film), FILM_SAFE_COLOR));
        }
    }
    out
}

/// Render size for the compare mode.
///
/// Side-by-side modes lay the sources out next to or above each other;
/// everything else renders at the size of the first source.
pub fn render_size_for(video: &[VideoData], mode: CompareMode) -> UVec2 {
    let Some(first) = video.first() else {
        return UVec2::ZERO;
    };
    match (mode, video.get(1)) {
        (CompareMode::Horizontal, Some(b)) => UVec2::new(first.size.x + b.size.x, first.size.y.max(b.size.y)),
        (CompareMode::Vertical, Some(b)) => UVec2::new(first.size.x.max(b.size.x), first.size.y + b.size.y),
        (CompareMode::Tile, Some(_)) => {
            let cols = (video.len() as f32).sqrt().ceil() as u32;
            let rows = (video.len() as u32).div_ceil(cols);
            let cell = video.iter().fold(UVec2::ZERO, |acc, v| acc.max(v.size));
            UVec2::new(cell.x * cols, cell.y * rows)
        }
        _ => first.size,
    }
}

/// Raster rectangle of each source drawn for `mode`, bottom first.
///
/// Matches the layout `render_size_for` sizes the render for. Stacked modes
/// (wipe, overlay, difference) put A and B at the origin.
pub fn source_layout(video: &[VideoData], mode: CompareMode) -> Vec<(usize, Box2f)> {
    let at = |v: &VideoData, origin: Vec2| Box2f::new(origin, origin + v.size.as_vec2());
    let Some(first) = video.first() else {
        return Vec::new();
    };
    match mode {
        CompareMode::A => vec![(0, at(first, Vec2::ZERO))],
        CompareMode::B => match video.get(1) {
            Some(b) => vec![(1, at(b, Vec2::ZERO))],
            None => vec![(0, at(first, Vec2::ZERO))],
        },
        CompareMode::Wipe | CompareMode::Overlay | CompareMode::Difference => video
            .iter()
            .take(2)
            .enumerate()
            .map(|(i, v)| (i, at(v, Vec2::ZERO)))
            .collect(),
        CompareMode::Horizontal => {
            let mut x = 0.0;
            video
                .iter()
                .take(2)
                .enumerate()
                .map(|(i, v)| {
                    let r = at(v, Vec2::new(x, 0.0));
                    x += v.size.x as f32;
                    (i, r)
                })
                .collect()
        }
        CompareMode::Vertical => {
            let mut y = 0.0;
            video
                .iter()
                .take(2)
                .enumerate()
                .map(|(i, v)| {
                    let r = at(v, Vec2::new(0.0, y));
                    y += v.size.y as f32;
                    (i, r)
                })
                .collect()
        }
        CompareMode::Tile => {
            let cols = (video.len() as f32).sqrt().ceil().max(1.0) as usize;
            let cell = video.iter().fold(UVec2::ZERO, |acc, v| acc.max(v.size)).as_vec2();
            video
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let origin = Vec2::new((i % cols) as f32 * cell.x, (i / cols) as f32 * cell.y);
                    (i, at(v, origin))
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::IVec2;

    use super::*;
    use crate::color::ocio::OcioOptions;
    use crate::core::settings::{GHOST_NEXT, GHOST_PREVIOUS, SHOW_GHOSTS};
    use crate::entities::attrs::AttrValue;
    use crate::entities::frame::Image;
    use crate::entities::shapes::{ShapeBase, ShapeKind};
    use crate::entities::space::Box2i;
    use crate::entities::time::{RationalTime, TimeRange};
    use crate::widgets::viewport::hud::HudFlags;
    use crate::widgets::viewport::options::{CompareOptions, DisplayOptions};
    use crate::widgets::viewport::renderer::recording::{Call, RecordingRenderer};

    fn state() -> ViewportState {
        let mut s = ViewportState::new();
        s.set_viewport_size(UVec2::new(800, 600));
        s.set_render_size(UVec2::new(1920, 1080));
        s
    }

    fn shape_at(x: f32) -> Shape {
        Shape::start(ShapeKind::Path, ShapeBase::new(Color4f::WHITE, 4.0), Vec2::new(x, x))
    }

    #[test]
    fn test_masking_picks_positive_bars() {
        // 16:9 render masked to 2.35: top/bottom bars
        let bars = masking_bars(UVec2::new(1920, 1080), 2.35);
        assert_eq!(bars.len(), 2);
        let expected = 1080.0 * (0.5 - (1920.0 / 1080.0) / 2.35 * 0.5);
        assert!((bars[0].size().y - expected).abs() < 1e-2);
        assert_eq!(bars[0].size().x, 1920.0);

        // masked to 4:3: left/right bars
        let bars = masking_bars(UVec2::new(1920, 1080), 1.33);
        assert_eq!(bars[0].min, Vec2::ZERO);
        assert!((bars[0].size().x - 1920.0 * (0.5 - 1.33 * 1080.0 / 1920.0 * 0.5)).abs() < 1e-2);
        assert_eq!(bars[1].max, Vec2::new(1920.0, 1080.0));

        assert!(masking_bars(UVec2::new(200, 100), 2.0).is_empty());
    }

    #[test]
    fn test_safe_area_table() {
        let wide = safe_areas(UVec2::new(1920, 1080));
        assert_eq!(wide.len(), 5);
        let action = wide[0].0;
        let full = fit_aspect(UVec2::new(1920, 1080), 1.77);
        assert!((action.size().x - full.size().x * 0.9).abs() < 1e-3);
        assert!((wide[1].0.size().y - full.size().y * 0.8).abs() < 1e-3);

        let sd = safe_areas(UVec2::new(720, 576));
        assert_eq!(sd.len(), 2);
    }

    #[test]
    fn test_render_size_for_compare() {
        let a = Arc::new(Image::from_rgba_f32(UVec2::new(4, 2), vec![0.0; 32]).expect("a"));
        let b = Arc::new(Image::from_rgba_f32(UVec2::new(3, 5), vec![0.0; 60]).expect("b"));
        let t = RationalTime::from_frame(0, 24.0);
        let video = vec![VideoData::new(t, a), VideoData::new(t, b)];
        assert_eq!(render_size_for(&video, CompareMode::A), UVec2::new(4, 2));
        assert_eq!(render_size_for(&video, CompareMode::Horizontal), UVec2::new(7, 5));
        assert_eq!(render_size_for(&video, CompareMode::Vertical), UVec2::new(4, 7));
        assert_eq!(render_size_for(&video, CompareMode::Tile), UVec2::new(8, 5));
        assert_eq!(render_size_for(&[], CompareMode::A), UVec2::ZERO);
    }

    #[test]
    fn test_plan_order_and_ghosts() {
        let mut settings = Settings::new();
        settings.set(SHOW_GHOSTS, AttrValue::Bool(true));
        settings.set(GHOST_PREVIOUS, AttrValue::Int(2));
        settings.set(GHOST_NEXT, AttrValue::Int(2));

        let mut player = Player::new(TimeRange::from_frames(0, 10, 24.0));
        let at = |f| RationalTime::from_frame(f, 24.0);
        let current = shape_at(1.0);
        let ghost = shape_at(2.0);
        let far = shape_at(3.0);
        let list = player.annotations_mut();
        let id = list.begin_shape(at(5), false, current.clone()).expect("current");
        list.end_shape(id);
        let id = list.begin_shape(at(4), false, ghost.clone()).expect("ghost");
        list.end_shape(id);
        let id = list.begin_shape(at(9), false, far).expect("far");
        list.end_shape(id);
        player.seek_frame(5);

        let mut s = state();
        s.selection = Box2i::new(IVec2::new(50, 80), IVec2::new(10, 10));
        s.masking = 2.35;
        let plan = FramePlan::build(&FrameInputs {
            state: &s,
            settings: &settings,
            player: Some(&player),
            help: None,
            actual_fps: None,
        });
        assert_eq!(plan.shapes.len(), 2);
        assert_eq!(plan.shapes[0].shape.id(), ghost.id());
        assert!((plan.shapes[0].alpha - (1.0 - 1.0 / 3.0)).abs() < 1e-6);
        assert_eq!(plan.shapes[1].shape.id(), current.id());
        assert_eq!(plan.shapes[1].alpha, 1.0);
        assert_eq!(
            plan.selection,
            Some(Box2f::new(Vec2::new(10.0, 10.0), Vec2::new(51.0, 81.0)))
        );

        let mut r = RecordingRenderer::new();
        let compare = CompareOptions::default();
        let display = DisplayOptions::default();
        let ocio = OcioOptions::default();
        let pass = VideoPass {
            compare: &compare,
            display: &display,
            ocio: &ocio,
        };
        plan.submit(&mut r, &[], &pass, &EnvironmentMapOptions::default());
        let kinds: Vec<&str> = r
            .calls
            .iter()
            .map(|c| match c {
                Call::BeginFrame(_) => "begin",
                Call::DrawVideo(_) => "video",
                Call::Present => "present",
                Call::Rect { filled: true, .. } => "mask",
                Call::Rect { filled: false, .. } => "outline",
                Call::Shape { .. } => "shape",
                Call::EndFrame => "end",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["begin", "video", "present", "mask", "mask", "shape", "shape", "outline", "end"]
        );
    }

    #[test]
    fn test_text_shapes_become_labels() {
        let settings = Settings::new();
        let mut player = Player::new(TimeRange::from_frames(0, 10, 24.0));
        let text = Shape::text(
            ShapeBase::new(Color4f::WHITE, 1.0),
            Vec2::new(100.0, 50.0),
            "note".into(),
            "Sans".into(),
            30,
        );
        let list = player.annotations_mut();
        let id = list.begin_shape(player_time(), false, text).expect("text");
        list.end_shape(id);

        let mut s = state();
        s.hud = HudFlags::FRAME;
        let plan = FramePlan::build(&FrameInputs {
            state: &s,
            settings: &settings,
            player: Some(&player),
            help: Some(("Zoom 2x", 0.5)),
            actual_fps: None,
        });
        assert!(plan.shapes.is_empty());
        assert_eq!(plan.labels.len(), 1);
        assert_eq!(plan.labels[0].pos, s.raster_to_window(Vec2::new(100.0, 50.0)));
        assert!((plan.labels[0].size - 30.0 * s.view_zoom).abs() < 1e-4);
        assert_eq!(plan.hud, vec!["F: 0".to_string()]);
        assert_eq!(plan.help, Some(("Zoom 2x".to_string(), 0.5)));
    }

    #[test]
    fn test_source_layout_matches_render_size() {
        let image = |w, h| Arc::new(Image::from_rgba_f32(UVec2::new(w, h), vec![0.0; (w * h * 4) as usize]).expect("image"));
        let t = player_time();
        let video = vec![VideoData::new(t, image(4, 2)), VideoData::new(t, image(2, 3))];

        let side = source_layout(&video, CompareMode::Horizontal);
        assert_eq!(side[1].1, Box2f::new(Vec2::new(4.0, 0.0), Vec2::new(6.0, 3.0)));
        assert_eq!(render_size_for(&video, CompareMode::Horizontal), UVec2::new(6, 3));

        let stacked = source_layout(&video, CompareMode::Vertical);
        assert_eq!(stacked[1].1.min, Vec2::new(0.0, 2.0));

        assert_eq!(source_layout(&video, CompareMode::B), vec![(1, Box2f::new(Vec2::ZERO, Vec2::new(2.0, 3.0)))]);
        assert_eq!(source_layout(&video[..1], CompareMode::B)[0].0, 0);
        assert_eq!(source_layout(&video, CompareMode::Wipe).len(), 2);

        let tiles = source_layout(&video, CompareMode::Tile);
        assert_eq!(tiles[1].1.min, Vec2::new(4.0, 0.0));
        assert!(source_layout(&[], CompareMode::A).is_empty());
    }

    fn player_time() -> RationalTime {
        RationalTime::from_frame(0, 24.0)
    }

    #[test]
    fn test_invalid_renderer_draws_nothing() {
        let plan = FramePlan::default();
        let mut r = RecordingRenderer::new();
        r.valid = false;
        let compare = CompareOptions::default();
        let display = DisplayOptions::default();
        let ocio = OcioOptions::default();
        let pass = VideoPass {
            compare: &compare,
            display: &display,
            ocio: &ocio,
        };
        plan.submit(&mut r, &[], &pass, &EnvironmentMapOptions::default());
        assert!(r.calls.is_empty());
    }
}
