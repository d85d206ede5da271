//! Data models for the annotation canvas.

mod annotation;
mod label;
mod tool;

pub use annotation::{
    Annotation, AnnotationId, GeometryPatch, ImageId, ImageInfo, Shape, ShapeKind,
};
pub use label::{
    DEFAULT_PALETTE, FALLBACK_COLOR, Label, LabelId, ProjectId, is_hex_color, palette_color,
};
pub use tool::Tool;
