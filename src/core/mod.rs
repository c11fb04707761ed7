//! Core modules - player, settings, events, network mirror
//!
//! These modules are independent of UI.

pub mod app_context;
pub mod event_bus;
pub mod network;
pub mod player;
pub mod settings;

pub use app_context::AppContext;
pub use event_bus::EventBus;
pub use network::{NetworkMirror, NullMirror, QueueMirror};
pub use player::{Playback, Player};
pub use settings::Settings;
