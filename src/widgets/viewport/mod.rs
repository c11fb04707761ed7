//! Viewport widget - view transforms, interaction, pixel readback and drawing
//!
//! `Viewport` (controller) holds the interaction core and is backend
//! agnostic; `GlRenderer` draws its frame plans with OpenGL and
//! `viewport_ui::render` hosts both inside egui.

pub mod controller;
pub mod coords;
pub mod display;
pub mod drop;
pub mod gl_renderer;
pub mod hotkeys;
pub mod hud;
pub mod options;
pub mod readback;
pub mod renderer;
pub mod scrub;
pub mod shaders;
pub mod tool;
mod viewport;
mod viewport_ui;
pub mod viewport_events;

pub use controller::{Modifiers, PointerButton, Viewport, ViewportInput};
pub use display::FramePlan;
pub use gl_renderer::GlRenderer;
pub use hotkeys::{HotkeyHandler, ViewportAction};
pub use renderer::Renderer;
pub use shaders::Shaders;
pub use tool::ActionMode;
pub use viewport::{ViewportMode, ViewportState};
pub use viewport_ui::{collect_input, render};
pub use viewport_events::ViewportRefreshEvent;
