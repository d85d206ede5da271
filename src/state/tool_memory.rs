//! Per-image tool memory.

use std::collections::HashMap;

use crate::model::{ImageId, Tool};

/// Remembers the last tool used on each image, with a fallback for images
/// that have never been opened.
#[derive(Debug, Clone, Default)]
pub struct ToolMemory {
    per_image: HashMap<ImageId, Tool>,
    fallback: Tool,
}

impl ToolMemory {
    pub fn new(fallback: Tool) -> Self {
        Self {
            per_image: HashMap::new(),
            fallback,
        }
    }

    /// Tool to activate when `image` is opened.
    pub fn tool_for(&self, image: &ImageId) -> Tool {
        self.per_image.get(image).copied().unwrap_or(self.fallback)
    }

    pub fn remember(&mut self, image: ImageId, tool: Tool) {
        self.per_image.insert(image, tool);
    }

    pub fn fallback(&self) -> Tool {
        self.fallback
    }

    pub fn set_fallback(&mut self, tool: Tool) {
        self.fallback = tool;
    }

    pub fn forget(&mut self, image: &ImageId) {
        self.per_image.remove(image);
    }
}
