//! Synchronisation between the annotation store and remote persistence.

mod auto_save;
mod dump;
mod error;
mod ops;
mod reconcile;
mod service;
mod tracker;
pub mod wire;

pub use auto_save::SaveScheduler;
pub use dump::{ImageDump, ProjectDump};
pub use error::SyncError;
pub use ops::build_ops;
pub use reconcile::{Reconciled, match_created, reconcile};
pub use service::{AnnotationService, ImageService, InMemoryService, LabelService};
pub use tracker::{LoadTicket, SaveTicket, SyncOutcome, SyncTracker};
pub use wire::{AnnotationOp, OpAction, RemoteAnnotation, WireGeometry};
