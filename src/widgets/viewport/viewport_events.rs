//! Viewport widget events.
//!
//! Emitted on the `EventBus` for the panels around the viewport (pixel bar,
//! color-area panel, undo/redo buttons, file opener, status line).

use std::path::PathBuf;

use glam::IVec2;

use super::tool::ActionMode;
use crate::color::area::Info;
use crate::color::spaces::Color4f;

/// Force viewport to redraw (e.g., after annotation or option changes)
#[derive(Clone, Debug)]
pub struct ViewportRefreshEvent;

/// User-visible failure, emitted once per failed operation.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportErrorEvent(pub String);

/// Undo/redo button state after any annotation history change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UndoRedoStateEvent {
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Files dropped on the viewport, directories already expanded.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenFilesEvent(pub Vec<PathBuf>);

/// Pixel under the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelInfo {
    pub pos: IVec2,
    pub rgba: Color4f,
    /// Secondary color space value, brightness in `a`.
    pub secondary: Color4f,
    /// True when read from the CPU composite rather than the displayed image.
    pub raw: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelInfoEvent(pub Option<PixelInfo>);

/// Color-area statistics of the selection; None clears the panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaInfoEvent(pub Option<Info>);

#[derive(Clone, Debug, PartialEq)]
pub struct ActionModeChangedEvent(pub ActionMode);

/// Transient help text shown over the video.
#[derive(Clone, Debug, PartialEq)]
pub struct HelpTextEvent(pub String);
