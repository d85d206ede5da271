//! Canvas tool modes.

use serde::{Deserialize, Serialize};

/// The active interaction mode of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Select, move and resize existing annotations.
    #[default]
    Select,
    /// Drag out bounding boxes.
    Box,
    /// Click polygon vertices.
    Polygon,
    /// Drag the viewport.
    Pan,
}

impl Tool {
    /// Display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Box => "Bounding Box",
            Tool::Polygon => "Polygon",
            Tool::Pan => "Pan",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[Tool::Select, Tool::Box, Tool::Polygon, Tool::Pan]
    }

    /// Whether this tool creates new annotations.
    pub fn is_drawing_tool(&self) -> bool {
        matches!(self, Tool::Box | Tool::Polygon)
    }
}
