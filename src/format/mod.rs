//! Dataset export of the annotation set.
//!
//! Only YOLO is supported: detection (boxes) and segmentation (polygons).

mod error;
pub mod yolo;

pub use error::ExportError;
pub use yolo::{ExportResult, YoloExporter, YoloVariant, label_file_name};
