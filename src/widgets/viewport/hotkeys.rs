//! Viewport keyboard shortcuts.
//!
//! Flat table of key combo -> action. Combos are egui key names with
//! `Ctrl+`, `Shift+`, `Alt+` prefixes in that order ("Ctrl+Shift+Z").
//! Dispatch of the actions lives in the viewport controller.

use std::collections::HashMap;

use eframe::egui;
use serde::{Deserialize, Serialize};

use super::options::Channels;
use super::tool::ActionMode;

/// Multiplicative step of gain nudges.
pub const GAIN_STEP: f32 = 1.1;
/// Additive step of gamma and saturation nudges.
pub const GAMMA_STEP: f32 = 0.1;
pub const SATURATION_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ViewportAction {
    /// Absolute zoom factor, centered.
    Zoom(f32),
    FrameView,
    ResetView,
    CenterView,
    GainMore,
    GainLess,
    GammaMore,
    GammaLess,
    SaturationMore,
    SaturationLess,
    ResetAdjustments,
    Channel(Channels),
    SetMode(ActionMode),
    StepFrames(i64),
    ToStart,
    ToEnd,
    TogglePlayback,
    PlayReverse,
    Stop,
    Undo,
    Redo,
    ClearFrameAnnotations,
    ClearAllAnnotations,
    /// Enter: close the polygon or commit the text being edited.
    Commit,
    /// Escape: drop the polygon or text being edited, leave presentation.
    Cancel,
    ToggleFullScreen,
    TogglePresentation,
    ToggleHud,
    ToggleSafeAreas,
    ToggleDataWindow,
    ToggleDisplayWindow,
    ToggleAnnotations,
}

/// Hotkey table for one viewport.
#[derive(Debug, Clone, Default)]
pub struct HotkeyHandler {
    bindings: HashMap<String, ViewportAction>,
}

impl HotkeyHandler {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the default viewport bindings.
    pub fn with_defaults() -> Self {
        let mut h = Self::new();
        h.setup_default_bindings();
        h
    }

    pub fn handle_key(&self, combo: &str) -> Option<ViewportAction> {
        self.bindings.get(combo).copied()
    }

    /// Look up `key` under the held modifiers.
    pub fn handle_key_with_modifiers(&self, key: &str, ctrl: bool, shift: bool, alt: bool) -> Option<ViewportAction> {
        self.handle_key(&key_combo(key, ctrl, shift, alt))
    }

    pub fn add_binding(&mut self, combo: impl Into<String>, action: ViewportAction) {
        self.bindings.insert(combo.into(), action);
    }

    pub fn remove_binding(&mut self, combo: &str) {
        self.bindings.remove(combo);
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn setup_default_bindings(&mut self) {
        use ViewportAction::*;

        const DIGITS: [&str; 9] = ["Num1", "Num2", "Num3", "Num4", "Num5", "Num6", "Num7", "Num8", "Num9"];
        for (i, key) in DIGITS.iter().enumerate() {
            let n = (i + 1) as f32;
            self.add_binding(*key, Zoom(n));
            self.add_binding(format!("Ctrl+{key}"), Zoom(1.0 / n));
        }
        self.add_binding("F", FrameView);
        self.add_binding("H", ResetView);
        self.add_binding("Shift+H", CenterView);

        self.add_binding("Equals", GainMore);
        self.add_binding("Plus", GainMore);
        self.add_binding("Minus", GainLess);
        self.add_binding("CloseBracket", GammaMore);
        self.add_binding("OpenBracket", GammaLess);
        self.add_binding("Shift+CloseBracket", SaturationMore);
        self.add_binding("Shift+OpenBracket", SaturationLess);
        self.add_binding("Ctrl+R", ResetAdjustments);

        self.add_binding("C", Channel(Channels::Color));
        self.add_binding("R", Channel(Channels::Red));
        self.add_binding("G", Channel(Channels::Green));
        self.add_binding("B", Channel(Channels::Blue));
        self.add_binding("A", Channel(Channels::Alpha));
        self.add_binding("L", Channel(Channels::Lumma));

        self.add_binding("Shift+S", SetMode(ActionMode::Scrub));
        self.add_binding("Ctrl+Shift+S", SetMode(ActionMode::Selection));
        self.add_binding("Shift+F", SetMode(ActionMode::Draw));
        self.add_binding("Shift+E", SetMode(ActionMode::Erase));
        self.add_binding("Shift+A", SetMode(ActionMode::Arrow));
        self.add_binding("Shift+C", SetMode(ActionMode::Circle));
        self.add_binding("Shift+R", SetMode(ActionMode::Rectangle));
        self.add_binding("Shift+P", SetMode(ActionMode::Polygon));
        self.add_binding("Shift+T", SetMode(ActionMode::Text));
        self.add_binding("Shift+O", SetMode(ActionMode::Rotate));

        self.add_binding("ArrowLeft", StepFrames(-1));
        self.add_binding("ArrowRight", StepFrames(1));
        self.add_binding("Shift+ArrowLeft", StepFrames(-10));
        self.add_binding("Shift+ArrowRight", StepFrames(10));
        self.add_binding("Home", ToStart);
        self.add_binding("End", ToEnd);
        self.add_binding("Space", TogglePlayback);
        self.add_binding("J", PlayReverse);
        self.add_binding("K", Stop);

        self.add_binding("Ctrl+Z", Undo);
        self.add_binding("Ctrl+Shift+Z", Redo);
        self.add_binding("Ctrl+Y", Redo);
        self.add_binding("Delete", ClearFrameAnnotations);
        self.add_binding("Shift+Delete", ClearAllAnnotations);
        self.add_binding("Enter", Commit);
        self.add_binding("Escape", Cancel);

        self.add_binding("F11", ToggleFullScreen);
        self.add_binding("F12", TogglePresentation);
        self.add_binding("Ctrl+H", ToggleHud);
        self.add_binding("Ctrl+A", ToggleSafeAreas);
        self.add_binding("Ctrl+D", ToggleDataWindow);
        self.add_binding("Ctrl+Shift+D", ToggleDisplayWindow);
        self.add_binding("Ctrl+N", ToggleAnnotations);
    }

    /// Actions of the keys pressed this frame (not held keys, so no repeats).
    pub fn handle_input(&self, input: &egui::InputState) -> Vec<ViewportAction> {
        input
            .events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    repeat: false,
                    modifiers,
                    ..
                } => self.handle_key_with_modifiers(
                    &format!("{:?}", key),
                    modifiers.command || modifiers.ctrl,
                    modifiers.shift,
                    modifiers.alt,
                ),
                _ => None,
            })
            .collect()
    }
}

/// Canonical combo string.
pub fn key_combo(key: &str, ctrl: bool, shift: bool, alt: bool) -> String {
    let mut combo = String::new();
    if ctrl {
        combo.push_str("Ctrl+");
    }
    if shift {
        combo.push_str("Shift+");
    }
    if alt {
        combo.push_str("Alt+");
    }
    combo.push_str(key);
    combo
}
