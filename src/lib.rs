//! mrv - viewport rendering and color pipeline library
//!
//! Re-exports all modules for use by binary targets.

// Player, settings, events, network mirror
pub mod core;

pub mod cli;
pub mod color;
pub mod entities;
pub mod error;
pub mod shell;
pub mod utils;
pub mod widgets;

pub use core::app_context::AppContext;
pub use core::event_bus::{EventBus, EventEmitter};
pub use core::player::Player;
pub use core::settings::Settings;

pub use entities::{Annotation, AnnotationList, Attrs, AttrValue, Image, VideoData};
pub use error::{ViewportError, ViewportResult};
pub use widgets::viewport::{GlRenderer, Viewport};
