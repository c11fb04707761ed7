//! Standalone viewport window.
//!
//! Loads an image or sequence (or a test pattern), then runs one viewport
//! with playback controls and a pixel/area status bar.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, anyhow};
use clap::Parser;
use eframe::egui;
use glam::UVec2;
use log::{error, info, warn};

use mrv::cli::Args;
use mrv::core::event_bus::downcast_event;
use mrv::shell::{self, Clip};
use mrv::widgets::viewport::viewport_events::{
    AreaInfoEvent, OpenFilesEvent, PixelInfo, PixelInfoEvent, UndoRedoStateEvent, ViewportErrorEvent,
};
use mrv::widgets::viewport::{render, GlRenderer, Shaders, ViewportState};
use mrv::{AppContext, Player, Settings, Viewport};

const STATE_KEY: &str = "mrv.viewport";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    shell::init_logger(args.log_filter());

    let settings = match &args.settings {
        Some(path) => Settings::load(path).with_context(|| format!("loading settings {}", path.display()))?,
        None => Settings::new(),
    };
    let clip = match &args.file_path {
        Some(path) => Clip::open(path).with_context(|| format!("opening {}", path.display()))?,
        None => Clip::test_pattern(UVec2::new(960, 540), 48)?,
    };

    let fullscreen = args.fullscreen || args.presentation;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(args.window_size())
            .with_fullscreen(fullscreen)
            .with_drag_and_drop(true)
            .with_title("mrv - Viewport"),
        ..Default::default()
    };

    eframe::run_native(
        "mrv-viewport",
        options,
        Box::new(move |cc| {
            let gl = cc.gl.clone().ok_or("OpenGL context unavailable; run with the glow backend")?;
            let mut shaders = Shaders::new();
            if let Some(dir) = &args.shader_dir {
                match shaders.load_shader_directory(dir) {
                    Ok(n) => info!("{} shader override(s) from {}", n, dir.display()),
                    Err(e) => warn!("{}", e),
                }
            }
            let renderer = GlRenderer::new(gl, shaders);
            let restored: Option<ViewportState> = cc.storage.and_then(|s| eframe::get_value(s, STATE_KEY));
            Ok(Box::new(ViewportApp::new(clip, settings, renderer, restored, &args)))
        }),
    )
    .map_err(|e| anyhow!("viewport window failed: {e}"))
}

struct ViewportApp {
    clip: Clip,
    player: Player,
    ctx: AppContext,
    viewport: Viewport,
    renderer: Arc<Mutex<GlRenderer>>,
    fps: f64,
    pixel: Option<PixelInfo>,
    area: Option<String>,
    can_undo: bool,
    can_redo: bool,
    status: Option<String>,
}

impl ViewportApp {
    fn new(clip: Clip, settings: Settings, renderer: GlRenderer, restored: Option<ViewportState>, args: &Args) -> Self {
        let mut viewport = Viewport::new();
        if let Some(state) = restored {
            viewport.state = state;
        }
        viewport.state.presentation = args.presentation;
        viewport.state.full_screen = args.fullscreen || args.presentation;

        let mut player = clip.player(args.fps);
        if args.autoplay {
            player.toggle_playback();
        }

        Self {
            clip,
            player,
            ctx: AppContext::new(settings),
            viewport,
            renderer: Arc::new(Mutex::new(renderer)),
            fps: args.fps,
            pixel: None,
            area: None,
            can_undo: false,
            can_redo: false,
            status: None,
        }
    }

    fn open(&mut self, path: &Path) {
        match Clip::open(path) {
            Ok(clip) => {
                info!("Opened {}", path.display());
                self.player = clip.player(self.fps);
                self.clip = clip;
                self.viewport.request_redraw();
                self.status = None;
            }
            Err(e) => {
                error!("Failed to open {}: {}", path.display(), e);
                self.status = Some(format!("Failed to open {}: {}", path.display(), e));
            }
        }
    }

    /// Drain the bus after the viewport ran; other event types are dropped.
    fn handle_events(&mut self) {
        let mut open: Option<PathBuf> = None;
        for event in self.ctx.event_bus.poll() {
            if let Some(ViewportErrorEvent(msg)) = downcast_event::<ViewportErrorEvent>(&event) {
                self.status = Some(msg.clone());
            } else if let Some(OpenFilesEvent(paths)) = downcast_event::<OpenFilesEvent>(&event) {
                open = paths.first().cloned();
            } else if let Some(PixelInfoEvent(info)) = downcast_event::<PixelInfoEvent>(&event) {
                self.pixel = *info;
            } else if let Some(AreaInfoEvent(info)) = downcast_event::<AreaInfoEvent>(&event) {
                self.area = info.map(|i| {
                    let m = i.rgba.mean;
                    format!(
                        "Area {}x{}  mean {:.4} {:.4} {:.4} {:.4}",
                        i.bbox.width(),
                        i.bbox.height(),
                        m.r,
                        m.g,
                        m.b,
                        m.a
                    )
                });
            } else if let Some(e) = downcast_event::<UndoRedoStateEvent>(&event) {
                self.can_undo = e.can_undo;
                self.can_redo = e.can_redo;
            }
        }
        if let Some(path) = open {
            self.open(&path);
        }
    }

    fn status_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let stopped = self.player.is_stopped();
                ui.label(format!("Frame: {}", self.player.current_frame()));
                ui.separator();
                ui.label(self.player.current_time().to_timecode());
                ui.separator();

                if ui.button("|<").clicked() {
                    self.player.to_start();
                }
                if ui.button("<").clicked() {
                    self.player.step(-1);
                }
                if ui.button(if stopped { ">" } else { "||" }).clicked() {
                    self.player.toggle_playback();
                }
                if ui.button(">").clicked() {
                    self.player.step(1);
                }
                if ui.button(">|").clicked() {
                    self.player.to_end();
                }
                ui.checkbox(&mut self.player.loop_enabled, "Loop");
                ui.separator();

                ui.label(format!("Zoom: {:.0}%", self.viewport.state.view_zoom * 100.0));
                ui.separator();
                if let Some(p) = &self.pixel {
                    ui.monospace(format!(
                        "{:>5},{:<5} {:.4} {:.4} {:.4} {:.4}{}",
                        p.pos.x,
                        p.pos.y,
                        p.rgba.r,
                        p.rgba.g,
                        p.rgba.b,
                        p.rgba.a,
                        if p.raw { "" } else { " (display)" }
                    ));
                }
                if let Some(area) = &self.area {
                    ui.separator();
                    ui.monospace(area);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(match (self.can_undo, self.can_redo) {
                        (true, true) => "undo/redo",
                        (true, false) => "undo",
                        (false, true) => "redo",
                        (false, false) => "",
                    });
                });
            });
        });
    }
}

impl eframe::App for ViewportApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let dt = ctx.input(|i| i.stable_dt) as f64;
        self.player.update(dt);
        self.clip.sync(&mut self.player);

        if let Some(msg) = self.status.clone() {
            egui::TopBottomPanel::top("error_panel").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::RED, msg);
                    if ui.button("X").clicked() {
                        self.status = None;
                    }
                });
            });
        }

        if !self.viewport.state.presentation {
            self.status_panel(ctx);
        }

        let actual_fps = (dt > 0.0 && !self.player.is_stopped()).then(|| 1.0 / dt);
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                render(ui, &mut self.viewport, Some(&mut self.player), &self.ctx, &self.renderer, actual_fps);
            });

        self.handle_events();

        let fullscreen = ctx.input(|i| i.viewport().fullscreen).unwrap_or(false);
        if fullscreen != self.viewport.state.full_screen {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.viewport.state.full_screen));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, STATE_KEY, &self.viewport.state);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        match self.renderer.lock() {
            Ok(mut r) => r.destroy(),
            Err(e) => e.into_inner().destroy(),
        }
    }
}
