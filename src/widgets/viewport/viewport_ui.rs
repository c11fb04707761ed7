//! Viewport widget - egui host
//!
//! Translates egui input into [`ViewportInput`], runs the viewport timers,
//! submits the frame plan to the GL renderer from a paint callback and
//! paints the text the plan leaves to the host (text shapes, HUD, help) and
//! the inline text editor.

use std::sync::{Arc, Mutex};

use eframe::egui;
use glam::{UVec2, Vec2};
use log::error;

use super::controller::{Modifiers, PointerButton, Viewport, ViewportInput};
use super::coords::{color32, screen_to_window, window_to_screen};
use super::display::FramePlan;
use super::gl_renderer::GlRenderer;
use super::options::{CompareOptions, DisplayOptions, EnvironmentMapOptions};
use super::renderer::VideoPass;
use crate::color::ocio::OcioOptions;
use crate::core::app_context::AppContext;
use crate::core::player::Player;
use crate::entities::frame::VideoData;

const HUD_FONT_SIZE: f32 = 13.0;
const HUD_LINE: f32 = 16.0;
const HELP_FONT_SIZE: f32 = 20.0;

/// Pointer bookkeeping kept in egui memory between frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerTrack {
    held: Option<PointerButton>,
    /// Modifiers at the press, carried by the drags of that gesture.
    mods: Modifiers,
    inside: bool,
    last: Vec2,
}

/// Frame data moved into the GL paint callback.
struct FrameJob {
    plan: FramePlan,
    video: Vec<VideoData>,
    compare: CompareOptions,
    display: DisplayOptions,
    ocio: OcioOptions,
    env_map: EnvironmentMapOptions,
}

impl FrameJob {
    fn submit(&self, renderer: &mut GlRenderer) {
        let pass = VideoPass {
            compare: &self.compare,
            display: &self.display,
            ocio: &self.ocio,
        };
        self.plan.submit(renderer, &self.video, &pass, &self.env_map);
    }
}

/// Render the viewport inside the available rect of `ui`.
pub fn render(
    ui: &mut egui::Ui,
    viewport: &mut Viewport,
    mut player: Option<&mut Player>,
    ctx: &AppContext,
    renderer: &Arc<Mutex<GlRenderer>>,
    actual_fps: Option<f64>,
) -> egui::Response {
    let egui_ctx = ui.ctx().clone();
    let rect = ui.max_rect();
    let id = ui.id().with("viewport_interaction");
    let response = ui.interact(rect, id, egui::Sense::click_and_drag());
    viewport
        .state
        .set_viewport_size(UVec2::new(rect.width().max(1.0) as u32, rect.height().max(1.0) as u32));

    // statistics of the frame the previous callback drew
    match renderer.lock() {
        Ok(mut r) => viewport.update_pixels(&mut *r, player.as_deref(), ctx),
        Err(e) => error!("Viewport renderer lock poisoned: {}", e),
    }

    let mut track = egui_ctx.data(|d| d.get_temp::<PointerTrack>(id)).unwrap_or_default();
    let keys = viewport.text_edit().is_none();
    let (mut inputs, dropped, dt) = egui_ctx.input(|i| {
        let inputs = collect_input(&i.events, rect, &mut track, keys);
        let dropped: Vec<_> = i.raw.dropped_files.iter().filter_map(|f| f.path.clone()).collect();
        (inputs, dropped, i.stable_dt)
    });
    egui_ctx.data_mut(|d| d.insert_temp(id, track));
    if !dropped.is_empty() && track.inside {
        inputs.push(ViewportInput::DropPaths(dropped));
    }

    for input in inputs {
        viewport.handle(input, player.as_deref_mut(), ctx);
    }
    viewport.tick(dt as f64, player.as_deref_mut(), ctx);

    let plan = viewport.prepare(player.as_deref(), ctx, actual_fps);
    let job = FrameJob {
        plan: plan.clone(),
        video: player.as_deref().map(|p| p.current_video().to_vec()).unwrap_or_default(),
        compare: viewport.state.compare,
        display: viewport.state.display.clone(),
        ocio: ctx.ocio_for_monitor(viewport.state.monitor).clone(),
        env_map: viewport.state.env_map,
    };
    let gl_renderer = renderer.clone();
    ui.painter().add(egui::PaintCallback {
        rect,
        callback: Arc::new(egui_glow::CallbackFn::new(move |_info, _painter| match gl_renderer.lock() {
            Ok(mut r) => job.submit(&mut r),
            Err(e) => error!("Viewport renderer lock poisoned: {}", e),
        })),
    });

    // text goes over the GL callback
    let painter = ui.painter_at(rect);
    draw_labels(&painter, rect, &plan);
    draw_hud(&painter, rect, &plan.hud);
    if let Some((text, alpha)) = &plan.help {
        draw_help(&painter, rect, text, *alpha);
    }
    text_editor(ui, rect, viewport, player.as_deref_mut(), ctx);

    let playing = player.as_deref().is_some_and(|p| !p.is_stopped());
    if viewport.take_redraw() || viewport.is_animating() || playing {
        egui_ctx.request_repaint();
    }
    response
}

/// Turn this frame's egui events into viewport input.
///
/// Presses count only inside `rect`; a held button keeps dragging outside it
/// until released. Keys are forwarded while the pointer is over the viewport
/// and `keys` is set.
pub fn collect_input(
    events: &[egui::Event],
    rect: egui::Rect,
    track: &mut PointerTrack,
    keys: bool,
) -> Vec<ViewportInput> {
    let mut out = Vec::new();
    for event in events {
        match event {
            egui::Event::PointerButton {
                pos,
                button,
                pressed,
                modifiers,
                ..
            } => {
                let Some(button) = map_button(*button) else {
                    continue;
                };
                let mods = map_modifiers(modifiers);
                let inside = rect.contains(*pos);
                let pos = screen_to_window(*pos, rect);
                track.last = pos;
                if *pressed && inside && track.held.is_none() {
                    track.held = Some(button);
                    track.mods = mods;
                    out.push(ViewportInput::Press { pos, button, mods });
                } else if !*pressed && track.held == Some(button) {
                    track.held = None;
                    out.push(ViewportInput::Release { pos, button, mods });
                }
            }
            egui::Event::PointerMoved(p) => {
                let pos = screen_to_window(*p, rect);
                track.last = pos;
                let inside = rect.contains(*p);
                if let Some(button) = track.held {
                    out.push(ViewportInput::Drag {
                        pos,
                        button,
                        mods: track.mods,
                    });
                } else if inside {
                    out.push(ViewportInput::Move { pos });
                } else if track.inside {
                    out.push(ViewportInput::Leave);
                }
                track.inside = inside;
            }
            egui::Event::PointerGone => {
                if track.inside && track.held.is_none() {
                    out.push(ViewportInput::Leave);
                }
                track.inside = false;
            }
            egui::Event::MouseWheel { delta, .. } => {
                if track.inside && delta.y.abs() > 0.1 {
                    out.push(ViewportInput::Wheel {
                        pos: track.last,
                        delta: delta.y.signum(),
                    });
                }
            }
            egui::Event::Key {
                key,
                pressed: true,
                repeat: false,
                modifiers,
                ..
            } if keys && (track.inside || track.held.is_some()) => {
                out.push(ViewportInput::Key {
                    key: format!("{:?}", key),
                    mods: map_modifiers(modifiers),
                });
            }
            _ => {}
        }
    }
    out
}

fn map_button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Primary),
        egui::PointerButton::Middle => Some(PointerButton::Middle),
        egui::PointerButton::Secondary => Some(PointerButton::Secondary),
        _ => None,
    }
}

fn map_modifiers(m: &egui::Modifiers) -> Modifiers {
    Modifiers {
        ctrl: m.ctrl || m.command,
        shift: m.shift,
        alt: m.alt,
    }
}

fn draw_labels(painter: &egui::Painter, rect: egui::Rect, plan: &FramePlan) {
    for label in &plan.labels {
        // egui has no per-family lookup by name; labels use the proportional family
        painter.text(
            window_to_screen(label.pos, rect),
            egui::Align2::LEFT_BOTTOM,
            &label.text,
            egui::FontId::proportional(label.size.max(1.0)),
            color32(label.color),
        );
    }
}

fn draw_hud(painter: &egui::Painter, rect: egui::Rect, lines: &[String]) {
    let font = egui::FontId::monospace(HUD_FONT_SIZE);
    for (i, line) in lines.iter().enumerate() {
        let pos = rect.min + egui::vec2(10.0, 10.0 + i as f32 * HUD_LINE);
        painter.text(
            pos + egui::vec2(1.0, 1.0),
            egui::Align2::LEFT_TOP,
            line,
            font.clone(),
            egui::Color32::BLACK,
        );
        painter.text(pos, egui::Align2::LEFT_TOP, line, font.clone(), egui::Color32::WHITE);
    }
}

fn draw_help(painter: &egui::Painter, rect: egui::Rect, text: &str, alpha: f32) {
    let a = (alpha.clamp(0.0, 1.0) * 255.0) as u8;
    painter.text(
        egui::pos2(rect.center().x, rect.max.y - 40.0),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(HELP_FONT_SIZE),
        egui::Color32::from_rgba_unmultiplied(255, 255, 255, a),
    );
}

/// Inline editor for the text shape being typed. Enter or clicking away
/// commits, Escape cancels.
fn text_editor(
    ui: &mut egui::Ui,
    rect: egui::Rect,
    viewport: &mut Viewport,
    player: Option<&mut Player>,
    ctx: &AppContext,
) {
    let Some(edit) = viewport.text_edit() else {
        return;
    };
    let pos = window_to_screen(viewport.state.raster_to_window(edit.raster), rect);
    let original = edit.text.clone();
    let mut text = original.clone();
    let mut finished = None;

    egui::Area::new(ui.id().with("viewport_text_edit"))
        .fixed_pos(pos)
        .order(egui::Order::Foreground)
        .show(ui.ctx(), |ui| {
            let response = ui.add(egui::TextEdit::singleline(&mut text).desired_width(240.0).hint_text("Text"));
            if response.lost_focus() {
                finished = Some(!ui.input(|i| i.key_pressed(egui::Key::Escape)));
            } else if !response.has_focus() {
                response.request_focus();
            }
        });

    if text != original {
        viewport.set_edit_text(&text);
    }
    match finished {
        Some(true) => {
            viewport.commit_text(player, ctx);
        }
        Some(false) => viewport.cancel_text(),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(100.0, 50.0), egui::vec2(400.0, 300.0))
    }

    fn press(x: f32, y: f32, pressed: bool, modifiers: egui::Modifiers) -> egui::Event {
        egui::Event::PointerButton {
            pos: egui::pos2(x, y),
            button: egui::PointerButton::Primary,
            pressed,
            modifiers,
        }
    }

    #[test]
    fn test_drag_leaves_rect_until_release() {
        let mut track = PointerTrack::default();
        let events = vec![
            egui::Event::PointerMoved(egui::pos2(110.0, 60.0)),
            press(110.0, 60.0, true, egui::Modifiers::ALT),
            egui::Event::PointerMoved(egui::pos2(700.0, 60.0)),
            press(700.0, 60.0, false, egui::Modifiers::NONE),
        ];
        let inputs = collect_input(&events, rect(), &mut track, true);
        let alt = Modifiers {
            alt: true,
            ..Default::default()
        };
        assert_eq!(
            inputs,
            vec![
                ViewportInput::Move { pos: Vec2::new(10.0, 10.0) },
                ViewportInput::Press {
                    pos: Vec2::new(10.0, 10.0),
                    button: PointerButton::Primary,
                    mods: alt,
                },
                ViewportInput::Drag {
                    pos: Vec2::new(600.0, 10.0),
                    button: PointerButton::Primary,
                    mods: alt,
                },
                ViewportInput::Release {
                    pos: Vec2::new(600.0, 10.0),
                    button: PointerButton::Primary,
                    mods: Modifiers::default(),
                },
            ]
        );
        assert!(track.held.is_none());
    }

    #[test]
    fn test_press_outside_and_leave() {
        let mut track = PointerTrack::default();
        let events = vec![
            press(10.0, 10.0, true, egui::Modifiers::NONE),
            egui::Event::PointerMoved(egui::pos2(150.0, 100.0)),
            egui::Event::PointerMoved(egui::pos2(10.0, 10.0)),
        ];
        let inputs = collect_input(&events, rect(), &mut track, true);
        assert_eq!(
            inputs,
            vec![ViewportInput::Move { pos: Vec2::new(50.0, 50.0) }, ViewportInput::Leave]
        );
    }

    #[test]
    fn test_keys_need_hover_and_no_editor() {
        let key = egui::Event::Key {
            key: egui::Key::ArrowLeft,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::SHIFT,
        };
        let mut track = PointerTrack::default();
        assert!(collect_input(std::slice::from_ref(&key), rect(), &mut track, true).is_empty());

        track.inside = true;
        let inputs = collect_input(std::slice::from_ref(&key), rect(), &mut track, true);
        assert_eq!(
            inputs,
            vec![ViewportInput::Key {
                key: "ArrowLeft".to_string(),
                mods: Modifiers {
                    shift: true,
                    ..Default::default()
                },
            }]
        );
        assert!(collect_input(&[key], rect(), &mut track, false).is_empty());
    }
}
