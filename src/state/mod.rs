//! Editing state for the active image and project.

mod labels;
mod selection;
mod store;
mod tool_memory;

pub use labels::{LabelDirectory, LabelError, NewLabel};
pub use selection::Selection;
pub use store::AnnotationStore;
pub use tool_memory::ToolMemory;
