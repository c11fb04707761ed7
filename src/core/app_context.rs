//! Process-wide state shared read-only by every viewport.
//!
//! Preferences, the default color-management selection and per-monitor
//! overrides live here. The host creates one context at startup, passes it
//! to viewport calls and drops it on shutdown.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;

use super::event_bus::EventBus;
use super::network::{NetworkMirror, NullMirror};
use super::settings::Settings;
use crate::color::ocio::OcioOptions;

pub struct AppContext {
    pub settings: Settings,
    pub event_bus: EventBus,
    pub mirror: Arc<dyn NetworkMirror>,
    default_ocio: OcioOptions,
    monitor_ocio: HashMap<usize, OcioOptions>,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl AppContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            event_bus: EventBus::new(),
            mirror: Arc::new(NullMirror),
            default_ocio: OcioOptions::default(),
            monitor_ocio: HashMap::new(),
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn NetworkMirror>) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn default_ocio(&self) -> &OcioOptions {
        &self.default_ocio
    }

    pub fn set_default_ocio(&mut self, options: OcioOptions) {
        info!("default display/view: {}", options.display_view());
        self.default_ocio = options;
    }

    /// Options for `monitor`: its override, else the default.
    pub fn ocio_for_monitor(&self, monitor: usize) -> &OcioOptions {
        self.monitor_ocio.get(&monitor).unwrap_or(&self.default_ocio)
    }

    pub fn set_monitor_ocio(&mut self, monitor: usize, options: OcioOptions) {
        info!("monitor {} display/view: {}", monitor, options.display_view());
        self.monitor_ocio.insert(monitor, options);
    }

    pub fn clear_monitor_ocio(&mut self, monitor: usize) {
        self.monitor_ocio.remove(&monitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_override_falls_back_to_default() {
        let mut ctx = AppContext::default();
        ctx.set_default_ocio(OcioOptions::new("sRGB", "Film"));
        ctx.set_monitor_ocio(1, OcioOptions::new("P3", "Film"));
        assert_eq!(ctx.ocio_for_monitor(0).display, "sRGB");
        assert_eq!(ctx.ocio_for_monitor(1).display, "P3");
        ctx.clear_monitor_ocio(1);
        assert_eq!(ctx.ocio_for_monitor(1).display, "sRGB");
    }
}
