//! Viewport action modes.
//!
//! The action mode decides what a primary-button gesture does:
//! - Scrub: horizontal drag seeks the timeline
//! - Selection: drag a pixel rectangle for area statistics
//! - Draw/Erase/shape tools/Text: annotate the current frame
//! - Rotate: spin an environment map
//! - Edit*: timeline edit tools, inert inside the viewport

use serde::{Deserialize, Serialize};

use crate::entities::shapes::ShapeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActionMode {
    #[default]
    Scrub,
    Selection,
    Draw,
    Erase,
    Arrow,
    Circle,
    FilledCircle,
    Rectangle,
    FilledRectangle,
    Polygon,
    FilledPolygon,
    Text,
    Rotate,
    EditTrim,
    EditSlip,
    EditSlide,
    EditRipple,
    EditRoll,
}

impl ActionMode {
    pub const ALL: [ActionMode; 18] = [
        ActionMode::Scrub,
        ActionMode::Selection,
        ActionMode::Draw,
        ActionMode::Erase,
        ActionMode::Arrow,
        ActionMode::Circle,
        ActionMode::FilledCircle,
        ActionMode::Rectangle,
        ActionMode::FilledRectangle,
        ActionMode::Polygon,
        ActionMode::FilledPolygon,
        ActionMode::Text,
        ActionMode::Rotate,
        ActionMode::EditTrim,
        ActionMode::EditSlip,
        ActionMode::EditSlide,
        ActionMode::EditRipple,
        ActionMode::EditRoll,
    ];

    /// Shape a press creates in this mode.
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        Some(match self {
            ActionMode::Draw => ShapeKind::Path,
            ActionMode::Erase => ShapeKind::ErasePath,
            ActionMode::Arrow => ShapeKind::Arrow,
            ActionMode::Circle => ShapeKind::Circle,
            ActionMode::FilledCircle => ShapeKind::FilledCircle,
            ActionMode::Rectangle => ShapeKind::Rectangle,
            ActionMode::FilledRectangle => ShapeKind::FilledRectangle,
            ActionMode::Polygon => ShapeKind::Polygon,
            ActionMode::FilledPolygon => ShapeKind::FilledPolygon,
            ActionMode::Text => ShapeKind::Text,
            _ => return None,
        })
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self, ActionMode::Polygon | ActionMode::FilledPolygon)
    }

    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            ActionMode::EditTrim
                | ActionMode::EditSlip
                | ActionMode::EditSlide
                | ActionMode::EditRipple
                | ActionMode::EditRoll
        )
    }

    /// Display name for UI and help text.
    pub fn display_name(&self) -> &'static str {
        match self {
            ActionMode::Scrub => "Scrub",
            ActionMode::Selection => "Selection",
            ActionMode::Draw => "Draw",
            ActionMode::Erase => "Erase",
            ActionMode::Arrow => "Arrow",
            ActionMode::Circle => "Circle",
            ActionMode::FilledCircle => "Filled Circle",
            ActionMode::Rectangle => "Rectangle",
            ActionMode::FilledRectangle => "Filled Rectangle",
            ActionMode::Polygon => "Polygon",
            ActionMode::FilledPolygon => "Filled Polygon",
            ActionMode::Text => "Text",
            ActionMode::Rotate => "Rotate",
            ActionMode::EditTrim => "Trim",
            ActionMode::EditSlip => "Slip",
            ActionMode::EditSlide => "Slide",
            ActionMode::EditRipple => "Ripple",
            ActionMode::EditRoll => "Roll",
        }
    }
}
