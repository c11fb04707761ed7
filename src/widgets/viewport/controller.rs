//! Viewport interaction core.
//!
//! `Viewport` owns the view state and the transient gesture state of one
//! viewport and turns pointer, wheel, key and drop input into view changes,
//! timeline seeks, annotation edits and selection/pixel statistics.
//!
//! # Input model
//!
//! The host translates window events into [`ViewportInput`] and calls
//! [`Viewport::handle`] with the active player (if any) and the shared
//! [`AppContext`]. A primary-button gesture is press -> drag* -> release and
//! is routed by the current [`ActionMode`]:
//!
//! - Scrub: seek by drag distance (see `scrub.rs`)
//! - Selection: clamp-to-render rectangle, area statistics on release
//! - Draw/Erase/Arrow/Circle/Rectangle: one shape per gesture
//! - Polygon: one vertex per press, closed near the first vertex or by Enter
//! - Text: press opens an inline editor, committed when non-empty
//! - Rotate: environment-map rotation with optional inertia
//!
//! Wipe/overlay compare adjustments (Alt/Shift drag) take precedence over
//! the mode. The middle button always pans; the wheel zooms at the cursor.
//!
//! # Timers
//!
//! [`Viewport::tick`] drives the scrub watchdog, laser fades, spin decay and
//! the help-text fade. Each fires in whole steps of [`TIMER_STEP`] and is a
//! no-op once its condition no longer holds.

use std::path::PathBuf;

use glam::{IVec2, UVec2, Vec2};
use log::{debug, error, info, trace};
use uuid::Uuid;

use super::display::{FrameInputs, FramePlan, render_size_for};
use super::drop::{dropped_files, dropped_paths};
use super::hotkeys::{GAIN_STEP, GAMMA_STEP, HotkeyHandler, SATURATION_STEP, ViewportAction};
use super::hud::HudFlags;
use super::options::CompareMode;
use super::readback::{PixelReadback, ReadbackMode};
use super::renderer::{Renderer, VideoPass};
use super::scrub::Scrubber;
use super::tool::ActionMode;
use super::viewport::{ViewportState, normalize_degrees};
use super::viewport_events::*;
use crate::color::area::{AreaOptions, Info};
use crate::color::ocio::OcioOptions;
use crate::color::spaces::to_color_space;
use crate::core::app_context::AppContext;
use crate::core::network::{self, LaserFadeMessage, SelectionArea, ShapeMessage, ShapePoint, ViewPosAndZoom, send_dyn};
use crate::core::player::{Playback, Player};
use crate::entities::frame::StereoEye;
use crate::entities::shapes::{Shape, ShapeBase, ShapeKind};
use crate::entities::space::{Box2i, raster_to_pixel};
use crate::entities::time::RationalTime;
use crate::error::ViewportError;

/// Period of the cooperative timers, in seconds.
pub const TIMER_STEP: f64 = 1.0 / 60.0;
/// Laser opacity lost per timer step.
pub const LASER_FADE_STEP: f32 = 0.025;
/// Wheel zoom speed per `zoom_speed` tier; the zoom factor is `1 + speed`.
pub const ZOOM_SPEEDS: [f32; 3] = [0.1, 0.25, 0.5];
/// Largest rotation per drag event, degrees.
pub const MAX_SPIN: f32 = 2.0;
/// Spin lost per timer step, degrees.
pub const SPIN_DECAY: f32 = 0.05;
/// Degrees of rotation per window pixel of drag.
const ROTATE_SCALE: f32 = 0.2;
/// Focal length change per wheel notch in environment map mode.
pub const FOCAL_STEP: f32 = 0.5;
const FOCAL_RANGE: (f32, f32) = (1.0, 200.0);
/// Window distance to the first vertex that closes a polygon.
pub const POLYGON_CLOSE_DISTANCE: f32 = 10.0;
/// Help text lifetime and the final part of it spent fading out.
pub const HELP_DURATION: f64 = 2.0;
const HELP_FADE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Window input in viewport-local window pixels (origin top-left).
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportInput {
    Press { pos: Vec2, button: PointerButton, mods: Modifiers },
    Drag { pos: Vec2, button: PointerButton, mods: Modifiers },
    Release { pos: Vec2, button: PointerButton, mods: Modifiers },
    /// Pointer moved with no button held.
    Move { pos: Vec2 },
    /// Positive `delta` zooms in.
    Wheel { pos: Vec2, delta: f32 },
    /// `key` is an egui key name ("Num1", "ArrowLeft").
    Key { key: String, mods: Modifiers },
    /// Dropped text, one URI or path per line.
    DropText(String),
    DropPaths(Vec<PathBuf>),
    Leave,
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    button: PointerButton,
    last: Vec2,
}

/// Shape being drawn by the current gesture.
#[derive(Debug, Clone, Copy)]
struct LiveShape {
    id: Uuid,
    kind: ShapeKind,
    time: RationalTime,
    all_frames: bool,
}

/// Inline text editor opened by a press in Text mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEdit {
    pub raster: Vec2,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
struct LaserFade {
    id: Uuid,
    fade: f32,
}

#[derive(Debug, Clone)]
struct HelpText {
    text: String,
    remaining: f64,
}

pub struct Viewport {
    pub state: ViewportState,
    hotkeys: HotkeyHandler,
    scrubber: Scrubber,
    readback: PixelReadback,
    gesture: Option<Gesture>,
    live: Option<LiveShape>,
    text_edit: Option<TextEdit>,
    lasers: Vec<LaserFade>,
    laser_clock: f64,
    spin: Vec2,
    spin_clock: f64,
    help: Option<HelpText>,
    pointer: Option<Vec2>,
    pixel: Option<PixelInfo>,
    area: Option<Info>,
    last_frame: Option<i64>,
    pixels_dirty: bool,
    needs_redraw: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::with_hotkeys(HotkeyHandler::with_defaults())
    }

    pub fn with_hotkeys(hotkeys: HotkeyHandler) -> Self {
        Self {
            state: ViewportState::new(),
            hotkeys,
            scrubber: Scrubber::new(),
            readback: PixelReadback::new(),
            gesture: None,
            live: None,
            text_edit: None,
            lasers: Vec::new(),
            laser_clock: 0.0,
            spin: Vec2::ZERO,
            spin_clock: 0.0,
            help: None,
            pointer: None,
            pixel: None,
            area: None,
            last_frame: None,
            pixels_dirty: true,
            needs_redraw: true,
        }
    }

    pub fn hotkeys(&self) -> &HotkeyHandler {
        &self.hotkeys
    }

    pub fn hotkeys_mut(&mut self) -> &mut HotkeyHandler {
        &mut self.hotkeys
    }

    /// Whether a redraw was requested since the last call; clears the flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    /// A timer still has work: fading lasers, spin inertia, help text or a scrub.
    pub fn is_animating(&self) -> bool {
        !self.lasers.is_empty() || self.spin != Vec2::ZERO || self.help.is_some() || self.scrubber.is_active()
    }

    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
        self.pixels_dirty = true;
    }

    /// Redraw this viewport and tell the others sharing the player to refresh.
    fn refresh(&mut self, ctx: &AppContext) {
        self.request_redraw();
        ctx.event_bus.emit(ViewportRefreshEvent);
    }

    pub fn text_edit(&self) -> Option<&TextEdit> {
        self.text_edit.as_ref()
    }

    /// Current help text and its opacity.
    pub fn help(&self) -> Option<(&str, f32)> {
        self.help
            .as_ref()
            .map(|h| (h.text.as_str(), (h.remaining / HELP_FADE).min(1.0) as f32))
    }

    pub fn set_help(&mut self, text: impl Into<String>, ctx: &AppContext) {
        let text = text.into();
        ctx.event_bus.emit(HelpTextEvent(text.clone()));
        self.help = Some(HelpText {
            text,
            remaining: HELP_DURATION,
        });
        self.needs_redraw = true;
    }

    pub fn pixel_info(&self) -> Option<PixelInfo> {
        self.pixel
    }

    /// Statistics of the current selection, for the color-area panels.
    pub fn color_area_info(&self) -> Option<Info> {
        self.area
    }

    pub fn readback_mode(&self) -> ReadbackMode {
        self.readback.mode()
    }

    /// Drop everything tied to the previous player.
    pub fn player_changed(&mut self) {
        debug!("player changed, resetting viewport drawing state");
        self.gesture = None;
        self.live = None;
        self.text_edit = None;
        self.lasers.clear();
        self.scrubber = Scrubber::new();
        self.readback.reset();
        self.state.clear_selection();
        self.pixel = None;
        self.area = None;
        self.last_frame = None;
        self.request_redraw();
    }

    // ----- input -----

    pub fn handle(&mut self, input: ViewportInput, player: Option<&mut Player>, ctx: &AppContext) {
        match input {
            ViewportInput::Press { pos, button, mods } => self.on_press(pos, button, mods, player, ctx),
            ViewportInput::Drag { pos, mods, .. } => self.on_drag(pos, mods, player, ctx),
            ViewportInput::Release { button, .. } => self.on_release(button, player, ctx),
            ViewportInput::Move { pos } => self.on_move(pos, player, ctx),
            ViewportInput::Wheel { pos, delta } => self.on_wheel(pos, delta, ctx),
            ViewportInput::Key { key, mods } => self.on_key(&key, mods, player, ctx),
            ViewportInput::DropText(text) => self.open_files(dropped_files(&text), ctx),
            ViewportInput::DropPaths(paths) => self.open_files(dropped_paths(paths), ctx),
            ViewportInput::Leave => self.on_leave(ctx),
        }
    }

    fn on_press(
        &mut self,
        pos: Vec2,
        button: PointerButton,
        mods: Modifiers,
        mut player: Option<&mut Player>,
        ctx: &AppContext,
    ) {
        self.pointer = Some(pos);
        self.gesture = Some(Gesture { button, last: pos });
        if button != PointerButton::Primary {
            return;
        }
        if self.compare_intercepts(mods) {
            self.drag_compare(pos, mods);
            return;
        }
        match self.state.action_mode {
            ActionMode::Scrub => self.scrubber.press(pos.x),
            ActionMode::Selection => {
                let p = self.state.clamped_pixel(pos);
                self.state.selection = Box2i::new(p, p);
                self.request_redraw();
            }
            ActionMode::Rotate => self.spin = Vec2::ZERO,
            ActionMode::Text => {
                if self.text_edit.is_some() {
                    self.commit_text(player.as_deref_mut(), ctx);
                }
                if player.is_some() {
                    self.text_edit = Some(TextEdit {
                        raster: self.state.window_to_raster(pos),
                        text: String::new(),
                    });
                    self.needs_redraw = true;
                }
            }
            mode if mode.is_edit() => trace!("{} ignores viewport presses", mode.display_name()),
            mode => {
                if let (Some(kind), Some(player)) = (mode.shape_kind(), player) {
                    self.press_shape(kind, pos, player, ctx);
                }
            }
        }
    }

    fn on_drag(&mut self, pos: Vec2, mods: Modifiers, player: Option<&mut Player>, ctx: &AppContext) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        let delta = pos - gesture.last;
        gesture.last = pos;
        let button = gesture.button;
        self.pointer = Some(pos);

        match button {
            PointerButton::Middle => {
                self.state.pan(delta);
                self.mirror_view(ctx);
                self.request_redraw();
                return;
            }
            PointerButton::Secondary => return,
            PointerButton::Primary => {}
        }
        if self.compare_intercepts(mods) {
            self.drag_compare(pos, mods);
            return;
        }
        match self.state.action_mode {
            ActionMode::Scrub => {
                if let Some(player) = player
                    && self.scrubber.drag(pos.x, mods.shift, &ctx.settings, player).is_some()
                {
                    self.request_redraw();
                }
            }
            ActionMode::Selection => {
                if !self.state.selection.is_none() {
                    self.state.selection.max = self.state.clamped_pixel(pos);
                    self.request_redraw();
                }
            }
            ActionMode::Rotate => self.drag_rotate(delta),
            ActionMode::Text => {}
            mode if mode.is_edit() => {}
            _ => {
                if let Some(player) = player {
                    self.drag_shape(pos, player, ctx);
                }
            }
        }
    }

    fn on_release(&mut self, button: PointerButton, player: Option<&mut Player>, ctx: &AppContext) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        if gesture.button != button || button != PointerButton::Primary {
            return;
        }
        match self.state.action_mode {
            ActionMode::Scrub => self.scrubber.release(player),
            ActionMode::Selection => self.finish_selection(ctx),
            ActionMode::Rotate => {
                if !self.state.env_map.spin {
                    self.spin = Vec2::ZERO;
                }
            }
            mode if mode.is_polygon() || mode.is_edit() || mode == ActionMode::Text => {}
            _ => {
                if let Some(player) = player {
                    self.finish_shape(player, ctx);
                }
            }
        }
    }

    fn on_move(&mut self, pos: Vec2, player: Option<&mut Player>, ctx: &AppContext) {
        self.pointer = Some(pos);
        self.pixels_dirty = true;
        // rubber band of the polygon being built
        if let (Some(live), Some(player)) = (self.live, player)
            && matches!(live.kind, ShapeKind::Polygon | ShapeKind::FilledPolygon)
        {
            self.drag_shape(pos, player, ctx);
        }
    }

    fn on_leave(&mut self, ctx: &AppContext) {
        self.pointer = None;
        if self.pixel.take().is_some() {
            ctx.event_bus.emit(PixelInfoEvent(None));
        }
    }

    fn on_wheel(&mut self, pos: Vec2, delta: f32, ctx: &AppContext) {
        if delta == 0.0 {
            return;
        }
        if self.state.env_map.is_active() {
            let env = &mut self.state.env_map;
            env.focal_length = (env.focal_length + FOCAL_STEP * delta.signum()).clamp(FOCAL_RANGE.0, FOCAL_RANGE.1);
            let focal = env.focal_length;
            self.set_help(format!("Focal Length {focal:.1}"), ctx);
            self.request_redraw();
            return;
        }
        let speed = ZOOM_SPEEDS[ctx.settings.zoom_speed().min(ZOOM_SPEEDS.len() - 1)];
        let factor = 1.0 + speed;
        let zoom = if delta > 0.0 {
            self.state.view_zoom * factor
        } else {
            self.state.view_zoom / factor
        };
        self.state.set_view_zoom(zoom, pos);
        self.mirror_view(ctx);
        self.request_redraw();
    }

    fn on_key(&mut self, key: &str, mods: Modifiers, player: Option<&mut Player>, ctx: &AppContext) {
        let Some(action) = self.hotkeys.handle_key_with_modifiers(key, mods.ctrl, mods.shift, mods.alt) else {
            trace!("unbound key {key}");
            return;
        };
        // the inline editor owns the keyboard
        if self.text_edit.is_some() && !matches!(action, ViewportAction::Commit | ViewportAction::Cancel) {
            return;
        }
        self.apply_action(action, player, ctx);
    }

    fn open_files(&mut self, files: Vec<PathBuf>, ctx: &AppContext) {
        if files.is_empty() {
            debug!("drop: nothing to open");
            return;
        }
        info!("drop: opening {} file(s)", files.len());
        ctx.event_bus.emit(OpenFilesEvent(files));
    }

    // ----- compare and rotation -----

    fn compare_intercepts(&self, mods: Modifiers) -> bool {
        self.state.compare.mode.is_wipe_or_overlay() && (mods.alt || mods.shift)
    }

    fn drag_compare(&mut self, pos: Vec2, mods: Modifiers) {
        let width = self.state.viewport_size.x.max(1) as f32;
        if mods.shift {
            self.state.compare.wipe_rotation = normalize_degrees(pos.x / width * 360.0);
        } else if self.state.compare.mode == CompareMode::Wipe {
            let raster = self.state.window_to_raster(pos);
            let size = self.state.render_size.as_vec2().max(Vec2::ONE);
            self.state.compare.wipe_center = (raster / size).clamp(Vec2::ZERO, Vec2::ONE);
        } else {
            self.state.compare.overlay = (pos.x / width).clamp(0.0, 1.0);
        }
        self.request_redraw();
    }

    fn drag_rotate(&mut self, delta: Vec2) {
        if !self.state.env_map.is_active() {
            trace!("rotate: no environment map");
            return;
        }
        let spin = (delta * ROTATE_SCALE).clamp(Vec2::splat(-MAX_SPIN), Vec2::splat(MAX_SPIN));
        self.rotate_env(spin);
        if self.state.env_map.spin {
            self.spin = spin;
        }
        self.request_redraw();
    }

    fn rotate_env(&mut self, spin: Vec2) {
        let env = &mut self.state.env_map;
        env.rotate_y = normalize_degrees(env.rotate_y + spin.x);
        env.rotate_x = (env.rotate_x + spin.y).clamp(-90.0, 90.0);
    }

    // ----- selection -----

    fn finish_selection(&mut self, ctx: &AppContext) {
        let Some(area) = self.state.normalized_selection() else {
            return;
        };
        self.state.selection = area;
        send_dyn(ctx.mirror.as_ref(), network::SELECTION_AREA, &SelectionArea { area });
        debug!("selection {:?}..{:?}", area.min, area.max);
        self.request_redraw();
    }

    // ----- shapes -----

    fn press_shape(&mut self, kind: ShapeKind, pos: Vec2, player: &mut Player, ctx: &AppContext) {
        let raster = self.state.window_to_raster(pos);

        if let Some(live) = self.live {
            if matches!(live.kind, ShapeKind::Polygon | ShapeKind::FilledPolygon) && live.kind == kind {
                self.press_polygon(live, pos, raster, player, ctx);
                return;
            }
            self.finish_shape(player, ctx);
        }

        let settings = &ctx.settings;
        let mut base = ShapeBase::new(settings.pen_color(), settings.pen_size());
        base.soft = settings.soft_brush();
        base.laser = settings.laser();
        let mut shape = Shape::start(kind, base, raster);
        if matches!(kind, ShapeKind::Polygon | ShapeKind::FilledPolygon) {
            // trailing vertex follows the pointer until the next press
            shape.push_point(raster);
        }
        let time = player.current_time();
        let all_frames = settings.all_frames();
        match player.annotations_mut().begin_shape(time, all_frames, shape.clone()) {
            Ok(id) => {
                trace!("begin {:?} {}", kind, id);
                self.live = Some(LiveShape {
                    id,
                    kind,
                    time,
                    all_frames,
                });
                send_dyn(
                    ctx.mirror.as_ref(),
                    network::CREATE_SHAPE,
                    &ShapeMessage {
                        time,
                        all_frames,
                        shape,
                    },
                );
                self.request_redraw();
            }
            Err(e) => self.report(e, ctx),
        }
    }

    fn press_polygon(&mut self, live: LiveShape, pos: Vec2, raster: Vec2, player: &mut Player, ctx: &AppContext) {
        let first = {
            let Some(shape) = player.annotations().shape(live.id) else {
                self.live = None;
                return;
            };
            let points = &shape.base().points;
            // the last point is the rubber band
            let vertices = points.len().saturating_sub(1);
            points
                .first()
                .copied()
                .filter(|_| vertices >= 3)
                .map(|p| self.state.raster_to_window(p))
        };
        if let Some(first) = first
            && first.distance(pos) <= POLYGON_CLOSE_DISTANCE
        {
            self.finish_shape(player, ctx);
            return;
        }
        let Some(shape) = player.annotations_mut().shape_mut(live.id) else {
            return;
        };
        if let Some(last) = shape.base_mut().points.last_mut() {
            *last = raster;
        }
        shape.push_point(raster);
        send_dyn(
            ctx.mirror.as_ref(),
            network::ADD_SHAPE_POINT,
            &ShapePoint {
                id: live.id,
                point: raster,
            },
        );
        self.request_redraw();
    }

    fn drag_shape(&mut self, pos: Vec2, player: &mut Player, ctx: &AppContext) {
        let Some(live) = self.live else {
            return;
        };
        let raster = self.state.window_to_raster(pos);
        let width = self.state.render_size.x;
        let Some(shape) = player.annotations_mut().shape_mut(live.id) else {
            return;
        };
        if shape.kind() != live.kind {
            return;
        }
        shape.drag_to(raster, width);
        match shape {
            Shape::Path(_) | Shape::ErasePath(_) => send_dyn(
                ctx.mirror.as_ref(),
                network::ADD_SHAPE_POINT,
                &ShapePoint {
                    id: live.id,
                    point: raster,
                },
            ),
            _ => send_dyn(
                ctx.mirror.as_ref(),
                network::UPDATE_SHAPE,
                &ShapeMessage {
                    time: live.time,
                    all_frames: live.all_frames,
                    shape: shape.clone(),
                },
            ),
        }
        self.request_redraw();
    }

    /// Finalize the shape being drawn. Polygons drop their rubber band and
    /// are discarded with fewer than two vertices.
    fn finish_shape(&mut self, player: &mut Player, ctx: &AppContext) {
        let Some(live) = self.live.take() else {
            return;
        };
        let list = player.annotations_mut();
        if matches!(live.kind, ShapeKind::Polygon | ShapeKind::FilledPolygon)
            && let Some(shape) = list.shape_mut(live.id)
        {
            let points = &mut shape.base_mut().points;
            points.pop();
            if points.len() < 2 {
                debug!("polygon {} discarded", live.id);
                list.remove_shape(live.id);
                self.refresh(ctx);
                return;
            }
        }
        if !list.end_shape(live.id) {
            return;
        }
        let Some(shape) = list.shape(live.id).cloned() else {
            return;
        };
        if shape.is_laser() {
            self.lasers.push(LaserFade { id: live.id, fade: 1.0 });
        }
        send_dyn(
            ctx.mirror.as_ref(),
            network::END_SHAPE,
            &ShapeMessage {
                time: live.time,
                all_frames: live.all_frames,
                shape,
            },
        );
        self.emit_undo_state(player, ctx);
        self.refresh(ctx);
    }

    /// Drop the shape being drawn without touching history.
    fn cancel_shape(&mut self, player: &mut Player, ctx: &AppContext) {
        if let Some(live) = self.live.take() {
            player.annotations_mut().remove_shape(live.id);
            self.refresh(ctx);
        }
    }

    // ----- text -----

    pub fn set_edit_text(&mut self, text: &str) {
        if let Some(edit) = self.text_edit.as_mut() {
            edit.text = text.to_string();
        }
    }

    /// Close the inline editor, creating a Text shape when it holds text.
    pub fn commit_text(&mut self, player: Option<&mut Player>, ctx: &AppContext) -> bool {
        let Some(edit) = self.text_edit.take() else {
            return false;
        };
        self.needs_redraw = true;
        if edit.text.trim().is_empty() {
            trace!("empty text discarded");
            return false;
        }
        let Some(player) = player else {
            return false;
        };
        let settings = &ctx.settings;
        let mut base = ShapeBase::new(settings.pen_color(), settings.pen_size());
        base.laser = settings.laser();
        let shape = Shape::text(base, edit.raster, edit.text, settings.font(), settings.font_size());
        let time = player.current_time();
        let all_frames = settings.all_frames();
        let id = match player.annotations_mut().begin_shape(time, all_frames, shape.clone()) {
            Ok(id) => id,
            Err(e) => {
                self.report(e, ctx);
                return false;
            }
        };
        player.annotations_mut().end_shape(id);
        let message = ShapeMessage {
            time,
            all_frames,
            shape,
        };
        send_dyn(ctx.mirror.as_ref(), network::CREATE_SHAPE, &message);
        send_dyn(ctx.mirror.as_ref(), network::END_SHAPE, &message);
        if message.shape.is_laser() {
            self.lasers.push(LaserFade { id, fade: 1.0 });
        }
        self.emit_undo_state(player, ctx);
        self.refresh(ctx);
        true
    }

    pub fn cancel_text(&mut self) {
        if self.text_edit.take().is_some() {
            self.needs_redraw = true;
        }
    }

    // ----- modes and actions -----

    pub fn set_action_mode(&mut self, mode: ActionMode, player: Option<&mut Player>, ctx: &AppContext) {
        if mode == self.state.action_mode {
            return;
        }
        if let Some(player) = player {
            self.finish_shape(player, ctx);
        } else {
            self.live = None;
        }
        if self.text_edit.take().is_some() {
            debug!("text edit discarded by mode switch");
        }
        self.gesture = None;
        self.scrubber = Scrubber::new();
        info!("action mode: {}", mode.display_name());
        self.state.action_mode = mode;
        ctx.event_bus.emit(ActionModeChangedEvent(mode));
        self.set_help(mode.display_name(), ctx);
    }

    pub fn apply_action(&mut self, action: ViewportAction, player: Option<&mut Player>, ctx: &AppContext) {
        use ViewportAction::*;

        let display = &mut self.state.display;
        match action {
            Zoom(z) => {
                self.state.set_view_zoom_centered(z);
                self.mirror_view(ctx);
                self.set_help(format!("Zoom {z:.2}x"), ctx);
            }
            FrameView => {
                self.state.frame_view();
                self.mirror_view(ctx);
            }
            ResetView => {
                self.state.reset_view();
                self.mirror_view(ctx);
            }
            CenterView => {
                self.state.center_view();
                self.mirror_view(ctx);
            }
            GainMore | GainLess => {
                display.exposure = if action == GainMore {
                    display.exposure * GAIN_STEP
                } else {
                    display.exposure / GAIN_STEP
                };
                let gain = display.exposure;
                self.set_help(format!("Gain {gain:.2}"), ctx);
            }
            GammaMore | GammaLess => {
                let step = if action == GammaMore { GAMMA_STEP } else { -GAMMA_STEP };
                display.gamma = (display.gamma + step).max(GAMMA_STEP);
                let gamma = display.gamma;
                self.set_help(format!("Gamma {gamma:.2}"), ctx);
            }
            SaturationMore | SaturationLess => {
                let step = if action == SaturationMore {
                    SATURATION_STEP
                } else {
                    -SATURATION_STEP
                };
                display.saturation = (display.saturation + step).max(0.0);
                let saturation = display.saturation;
                self.set_help(format!("Saturation {saturation:.2}"), ctx);
            }
            ResetAdjustments => {
                display.reset_adjustments();
                self.set_help("Reset gain/gamma/saturation", ctx);
            }
            Channel(channel) => display.toggle_channel(channel),
            SetMode(mode) => self.set_action_mode(mode, player, ctx),
            StepFrames(n) => {
                if let Some(player) = player {
                    player.stop();
                    player.step(n);
                }
            }
            ToStart => {
                if let Some(player) = player {
                    player.to_start();
                }
            }
            ToEnd => {
                if let Some(player) = player {
                    player.to_end();
                }
            }
            TogglePlayback => {
                if let Some(player) = player {
                    player.toggle_playback();
                }
            }
            PlayReverse => {
                if let Some(player) = player {
                    player.set_playback(Playback::Reverse);
                }
            }
            Stop => {
                if let Some(player) = player {
                    player.stop();
                }
            }
            Undo => {
                self.undo(player, ctx);
            }
            Redo => {
                self.redo(player, ctx);
            }
            ClearFrameAnnotations => {
                self.clear_frame_annotations(player, ctx);
            }
            ClearAllAnnotations => {
                self.clear_all_annotations(player, ctx);
            }
            Commit => {
                if self.text_edit.is_some() {
                    self.commit_text(player, ctx);
                } else if let Some(player) = player {
                    self.finish_shape(player, ctx);
                }
            }
            Cancel => {
                if self.text_edit.is_some() {
                    self.cancel_text();
                } else if self.live.is_some() {
                    if let Some(player) = player {
                        self.cancel_shape(player, ctx);
                    }
                } else if self.state.presentation || self.state.full_screen {
                    self.state.presentation = false;
                    self.state.full_screen = false;
                }
            }
            ToggleFullScreen => self.state.full_screen = !self.state.full_screen,
            TogglePresentation => self.state.presentation = !self.state.presentation,
            ToggleHud => {
                self.state.hud = if self.state.hud.is_empty() {
                    HudFlags(ctx.settings.hud())
                } else {
                    HudFlags::NONE
                };
            }
            ToggleSafeAreas => self.state.safe_areas = !self.state.safe_areas,
            ToggleDataWindow => self.state.data_window = !self.state.data_window,
            ToggleDisplayWindow => self.state.display_window = !self.state.display_window,
            ToggleAnnotations => self.state.show_annotations = !self.state.show_annotations,
        }
        self.request_redraw();
    }

    // ----- history -----

    pub fn undo(&mut self, player: Option<&mut Player>, ctx: &AppContext) -> bool {
        let Some(player) = player else {
            return false;
        };
        self.finish_shape(player, ctx);
        if !player.annotations_mut().undo() {
            return false;
        }
        send_dyn(ctx.mirror.as_ref(), network::UNDO_ANNOTATION, &());
        self.history_changed(player, ctx);
        true
    }

    pub fn redo(&mut self, player: Option<&mut Player>, ctx: &AppContext) -> bool {
        let Some(player) = player else {
            return false;
        };
        self.finish_shape(player, ctx);
        if !player.annotations_mut().redo() {
            return false;
        }
        send_dyn(ctx.mirror.as_ref(), network::REDO_ANNOTATION, &());
        self.history_changed(player, ctx);
        true
    }

    pub fn clear_frame_annotations(&mut self, player: Option<&mut Player>, ctx: &AppContext) -> bool {
        let Some(player) = player else {
            return false;
        };
        self.finish_shape(player, ctx);
        let time = player.current_time();
        if !player.annotations_mut().clear_frame(&time) {
            return false;
        }
        info!("cleared annotation at frame {}", time.frame());
        send_dyn(ctx.mirror.as_ref(), network::CLEAR_FRAME_ANNOTATIONS, &time);
        self.history_changed(player, ctx);
        true
    }

    pub fn clear_all_annotations(&mut self, player: Option<&mut Player>, ctx: &AppContext) -> bool {
        let Some(player) = player else {
            return false;
        };
        self.finish_shape(player, ctx);
        if !player.annotations_mut().clear_all() {
            return false;
        }
        info!("cleared all annotations");
        send_dyn(ctx.mirror.as_ref(), network::CLEAR_ALL_ANNOTATIONS, &());
        self.history_changed(player, ctx);
        true
    }

    fn history_changed(&mut self, player: &Player, ctx: &AppContext) {
        let list = player.annotations();
        self.lasers.retain(|l| list.shape(l.id).is_some());
        self.emit_undo_state(player, ctx);
        self.refresh(ctx);
    }

    fn emit_undo_state(&self, player: &Player, ctx: &AppContext) {
        let list = player.annotations();
        ctx.event_bus.emit(UndoRedoStateEvent {
            can_undo: list.can_undo(),
            can_redo: list.can_redo(),
        });
    }

    fn report(&mut self, e: ViewportError, ctx: &AppContext) {
        error!("{e}");
        ctx.event_bus.emit(ViewportErrorEvent(e.to_string()));
    }

    fn mirror_view(&self, ctx: &AppContext) {
        send_dyn(
            ctx.mirror.as_ref(),
            network::VIEW_POS_AND_ZOOM,
            &ViewPosAndZoom {
                pos: self.state.view_pos,
                zoom: self.state.view_zoom,
            },
        );
    }

    /// Change the display/view of this viewport's monitor and mirror it.
    pub fn set_ocio_options(&mut self, options: OcioOptions, ctx: &mut AppContext) {
        send_dyn(ctx.mirror.as_ref(), network::SET_OCIO_OPTIONS, &options);
        ctx.set_monitor_ocio(self.state.monitor, options);
        self.request_redraw();
    }

    // ----- timers -----

    /// Advance the cooperative timers by `dt` seconds.
    pub fn tick(&mut self, dt: f64, mut player: Option<&mut Player>, ctx: &AppContext) {
        self.scrubber.tick(dt, player.as_deref_mut());
        self.tick_lasers(dt, player, ctx);
        self.tick_spin(dt);
        self.tick_help(dt);
    }

    fn tick_lasers(&mut self, dt: f64, player: Option<&mut Player>, ctx: &AppContext) {
        if self.lasers.is_empty() {
            self.laser_clock = 0.0;
            return;
        }
        let Some(player) = player else {
            return;
        };
        self.laser_clock += dt;
        let mut steps = 0;
        while self.laser_clock >= TIMER_STEP {
            self.laser_clock -= TIMER_STEP;
            steps += 1;
        }
        if steps == 0 {
            return;
        }
        let list = player.annotations_mut();
        let mut removed = false;
        self.lasers.retain_mut(|laser| {
            laser.fade -= LASER_FADE_STEP * steps as f32;
            if laser.fade <= 0.0 {
                if list.remove_shape(laser.id).is_some() {
                    removed = true;
                    send_dyn(
                        ctx.mirror.as_ref(),
                        network::LASER_FADE,
                        &LaserFadeMessage { id: laser.id, fade: 0.0 },
                    );
                }
                return false;
            }
            match list.shape_mut(laser.id) {
                Some(shape) => {
                    shape.base_mut().fade = laser.fade;
                    true
                }
                None => false,
            }
        });
        if removed {
            self.emit_undo_state(player, ctx);
            self.refresh(ctx);
        } else {
            self.request_redraw();
        }
    }

    fn tick_spin(&mut self, dt: f64) {
        if self.gesture.is_some() || self.spin == Vec2::ZERO {
            self.spin_clock = 0.0;
            return;
        }
        self.spin_clock += dt;
        while self.spin_clock >= TIMER_STEP && self.spin != Vec2::ZERO {
            self.spin_clock -= TIMER_STEP;
            self.rotate_env(self.spin);
            self.spin = Vec2::new(decay(self.spin.x), decay(self.spin.y));
            self.needs_redraw = true;
        }
    }

    fn tick_help(&mut self, dt: f64) {
        let Some(help) = self.help.as_mut() else {
            return;
        };
        help.remaining -= dt;
        if help.remaining <= 0.0 {
            self.help = None;
        }
        self.needs_redraw = true;
    }

    // ----- drawing -----

    /// Size the render for the current video and build the frame plan.
    ///
    /// Hosts that draw on a deferred GL callback submit the plan themselves
    /// and call `update_pixels` on the next update.
    pub fn prepare(&mut self, player: Option<&Player>, ctx: &AppContext, actual_fps: Option<f64>) -> FramePlan {
        let video = player.map(|p| p.current_video()).unwrap_or(&[]);
        let size = render_size_for(video, self.state.compare.mode);
        if size != UVec2::ZERO {
            self.state.set_render_size(size);
        }
        let frame = player.map(|p| p.current_frame());
        if frame != self.last_frame {
            self.last_frame = frame;
            self.pixels_dirty = true;
        }
        self.needs_redraw = false;

        FramePlan::build(&FrameInputs {
            state: &self.state,
            settings: &ctx.settings,
            player,
            help: self.help(),
            actual_fps,
        })
    }

    /// Draw one frame and refresh the pixel/area statistics.
    pub fn draw<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        player: Option<&Player>,
        ctx: &AppContext,
        actual_fps: Option<f64>,
    ) -> FramePlan {
        let plan = self.prepare(player, ctx, actual_fps);
        let video = player.map(|p| p.current_video()).unwrap_or(&[]);
        let pass = VideoPass {
            compare: &self.state.compare,
            display: &self.state.display,
            ocio: ctx.ocio_for_monitor(self.state.monitor),
        };
        plan.submit(renderer, video, &pass, &self.state.env_map);
        self.update_pixels(renderer, player, ctx);
        plan
    }

    /// Read back the frame just drawn and emit pixel/area changes.
    ///
    /// Raw mode samples the decoded layers on the CPU and is forced while
    /// scrubbing; Full mode reads the displayed image back from the GPU.
    pub fn update_pixels<R: Renderer + ?Sized>(&mut self, renderer: &mut R, player: Option<&Player>, ctx: &AppContext) {
        let Some(player) = player else {
            return;
        };
        let stopped = player.is_stopped() && !self.scrubber.is_active();
        if self.pointer.is_none() && self.state.selection.is_none() {
            return;
        }
        if stopped && !self.pixels_dirty {
            return;
        }
        self.pixels_dirty = false;

        let settings = &ctx.settings;
        let mode = if settings.pixel_bar_raw() || self.scrubber.is_active() {
            ReadbackMode::Raw
        } else {
            ReadbackMode::Full
        };
        self.readback.set_mode(mode);
        let ready = match mode {
            ReadbackMode::Full => self.readback.update_gpu(renderer, self.state.render_size, stopped),
            ReadbackMode::Raw => self.readback.update_raw(player.current_video(), StereoEye::Both),
        };
        if !ready {
            trace!("pixel readback not ready");
        }

        let pixel = self.pointer.and_then(|pos| {
            let p: IVec2 = raster_to_pixel(self.state.window_to_raster(pos));
            let rgba = self.readback.read_pixel(&mut *renderer, p, stopped)?;
            let secondary = to_color_space(
                &rgba,
                settings.color_space(),
                settings.brightness_type(),
                settings.video_levels(),
            );
            Some(PixelInfo {
                pos: p,
                rgba,
                secondary,
                raw: mode == ReadbackMode::Raw,
            })
        });
        if pixel != self.pixel {
            self.pixel = pixel;
            ctx.event_bus.emit(PixelInfoEvent(pixel));
        }

        let opts = AreaOptions {
            space: settings.color_space(),
            brightness: settings.brightness_type(),
            levels: settings.video_levels(),
        };
        let area = self
            .state
            .normalized_selection()
            .and_then(|sel| self.readback.area_info(sel, &opts));
        if area != self.area {
            self.area = area;
            ctx.event_bus.emit(AreaInfoEvent(area));
        }
    }
}

fn decay(v: f32) -> f32 {
    if v.abs() <= SPIN_DECAY { 0.0 } else { v - SPIN_DECAY * v.signum() }
}
