//! Color-management selections threaded through to the render pass.
//!
//! The viewport only picks a config, input space, display, view and look;
//! the transform itself belongs to the color-management provider.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OcioOptions {
    pub enabled: bool,
    /// Config file path.
    pub file_name: String,
    pub input: String,
    pub display: String,
    pub view: String,
    pub look: String,
}

impl OcioOptions {
    pub fn new(display: &str, view: &str) -> Self {
        Self {
            enabled: true,
            display: display.to_string(),
            view: view.to_string(),
            ..Default::default()
        }
    }

    /// "display / view" label for the HUD and menus.
    pub fn display_view(&self) -> String {
        if self.view.is_empty() {
            self.display.clone()
        } else {
            format!("{} / {}", self.display, self.view)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LutOrder {
    #[default]
    PostColorConfig,
    PreColorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LutOptions {
    pub enabled: bool,
    pub file_name: String,
    pub order: LutOrder,
}
