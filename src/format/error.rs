//! Error types for annotation export.

use thiserror::Error;

use crate::model::{ImageId, LabelId};

/// Errors that can occur while exporting annotations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An annotation references a label that is not in the directory
    #[error("Annotation {annotation} on image {image} uses unknown label '{label}'")]
    MissingLabel {
        image: ImageId,
        annotation: String,
        label: LabelId,
    },

    /// Normalised coordinates need a non-zero image size
    #[error("Image {image} has invalid dimensions {width}x{height}")]
    InvalidImageDimensions {
        image: ImageId,
        width: u32,
        height: u32,
    },
}
