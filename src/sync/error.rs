//! Error types for persistence sync.

use thiserror::Error;

use crate::model::{ImageId, LabelId};
use crate::state::LabelError;

/// Errors surfaced by load, save and label operations.
///
/// Stale responses are not errors; they are reported as
/// [`SyncOutcome::Stale`](crate::sync::SyncOutcome::Stale).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Network or transport failure; safe to retry.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service refused the batch (missing fields, bad payload).
    #[error("batch rejected: {0}")]
    Rejected(String),

    /// Optimistic-lock failure on an update or delete.
    #[error(
        "annotation {id} was modified by another user (expected version {expected}, found {found})"
    )]
    Conflict { id: String, expected: u32, found: u32 },

    /// Geometry payload that is neither a box nor a polygon.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// An annotation references a label the directory does not know.
    #[error("annotation references unknown label '{0}'")]
    UnknownLabel(LabelId),

    #[error("a save is already in progress for image {0}")]
    SaveInProgress(ImageId),

    #[error("no image is open")]
    NoActiveImage,

    #[error("image {0} not found")]
    ImageNotFound(ImageId),

    #[error("label {0} not found")]
    LabelNotFound(LabelId),

    /// Local label validation failed before anything was sent.
    #[error(transparent)]
    Label(#[from] LabelError),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl SyncError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(_) | SyncError::SaveInProgress(_))
    }
}
