//! Load and save bookkeeping for the active image.
//!
//! Network calls are split in two phases so hosts can run them however they
//! like: `begin_*` hands out a ticket, the host performs the request, then
//! `complete_*` applies the result. Tickets remember the image and the
//! open-generation they were issued for; a completion whose ticket no
//! longer matches is stale and is dropped without touching the store.

use std::collections::HashMap;

use crate::model::ImageId;
use crate::state::AnnotationStore;
use crate::sync::SyncError;
use crate::sync::ops::build_ops;
use crate::sync::reconcile::reconcile;
use crate::sync::wire::{AnnotationOp, RemoteAnnotation, into_local};
use crate::undo::HistoryEntry;

/// What happened to a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The result was installed into the store.
    Applied,
    /// The image changed since the request was issued; result dropped.
    Stale,
    /// There was nothing to send.
    Skipped,
}

/// Pending fetch of an image's annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    image: ImageId,
    generation: u64,
}

impl LoadTicket {
    pub fn image(&self) -> &ImageId {
        &self.image
    }
}

/// Pending save batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    image: ImageId,
    generation: u64,
    ops: Vec<AnnotationOp>,
    sent: HistoryEntry,
    revision: u64,
}

impl SaveTicket {
    pub fn image(&self) -> &ImageId {
        &self.image
    }

    /// The batch to submit.
    pub fn ops(&self) -> &[AnnotationOp] {
        &self.ops
    }

    /// Store revision the batch was built from.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Tracks which image is active and whether a save is in flight.
#[derive(Debug, Clone, Default)]
pub struct SyncTracker {
    active: Option<ImageId>,
    generation: u64,
    save_in_flight: bool,
    /// Last known server version per annotation id, for delete ops.
    known_versions: HashMap<String, u32>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_image(&self) -> Option<&ImageId> {
        self.active.as_ref()
    }

    pub fn is_saving(&self) -> bool {
        self.save_in_flight
    }

    fn is_current(&self, image: &ImageId, generation: u64) -> bool {
        self.generation == generation && self.active.as_ref() == Some(image)
    }

    fn remember_versions(&mut self, remote: &[RemoteAnnotation]) {
        self.known_versions = remote.iter().map(|r| (r.id.clone(), r.version)).collect();
    }

    /// Switch to `image`. Any outstanding load or save becomes stale.
    pub fn open_image(&mut self, image: ImageId) -> LoadTicket {
        self.generation += 1;
        self.save_in_flight = false;
        self.known_versions.clear();
        self.active = Some(image.clone());
        log::debug!("Opening image {} (generation {})", image, self.generation);
        LoadTicket {
            image,
            generation: self.generation,
        }
    }

    /// Close the active image; outstanding requests become stale.
    pub fn close_image(&mut self) {
        self.generation += 1;
        self.save_in_flight = false;
        self.known_versions.clear();
        self.active = None;
    }

    /// Install a fetch result.
    ///
    /// A failed load leaves the store as it was and returns the error.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<RemoteAnnotation>, SyncError>,
        store: &mut AnnotationStore,
    ) -> Result<SyncOutcome, SyncError> {
        if !self.is_current(&ticket.image, ticket.generation) {
            log::debug!("Discarding stale load for image {}", ticket.image);
            return Ok(SyncOutcome::Stale);
        }
        let remote = result.inspect_err(|err| {
            log::warn!("Failed to load annotations for {}: {}", ticket.image, err);
        })?;

        self.remember_versions(&remote);
        let annotations = into_local(&remote);
        log::info!(
            "Loaded {} annotation(s) for image {}",
            annotations.len(),
            ticket.image
        );
        store.set_annotations(annotations);
        Ok(SyncOutcome::Applied)
    }

    /// Build a save batch from the store.
    ///
    /// Returns `Ok(None)` when there is nothing to send. Only one save may
    /// be in flight; a second call is rejected until the first completes.
    pub fn begin_save(&mut self, store: &AnnotationStore) -> Result<Option<SaveTicket>, SyncError> {
        let image = self.active.clone().ok_or(SyncError::NoActiveImage)?;
        if self.save_in_flight {
            return Err(SyncError::SaveInProgress(image));
        }

        let sent = store.snapshot();
        let ops = build_ops(&sent, &self.known_versions);
        if ops.is_empty() {
            log::debug!("Nothing to save for image {}", image);
            return Ok(None);
        }

        self.save_in_flight = true;
        log::info!("Saving {} op(s) for image {}", ops.len(), image);
        Ok(Some(SaveTicket {
            image,
            generation: self.generation,
            ops,
            sent,
            revision: store.revision(),
        }))
    }

    /// Install a save result.
    ///
    /// On failure the store is untouched and the error is returned so the
    /// user can retry. On success the store takes the server's list,
    /// reconciled with any edits made while the request was in flight.
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<Vec<RemoteAnnotation>, SyncError>,
        store: &mut AnnotationStore,
    ) -> Result<SyncOutcome, SyncError> {
        if !self.is_current(&ticket.image, ticket.generation) {
            log::debug!("Discarding stale save response for image {}", ticket.image);
            return Ok(SyncOutcome::Stale);
        }
        self.save_in_flight = false;

        let remote = result.inspect_err(|err| {
            log::warn!("Save failed for image {}: {}", ticket.image, err);
        })?;

        self.remember_versions(&remote);
        let changed = store.revision() != ticket.revision;
        if changed {
            log::debug!("Store changed during save, reconciling");
        }
        let merged = reconcile(&ticket.sent, &store.snapshot(), into_local(&remote), changed);
        log::info!(
            "Saved image {}: {} annotation(s), {} pending delete(s)",
            ticket.image,
            merged.annotations.len(),
            merged.deleted_ids.len()
        );
        store.apply_synced(merged.annotations, merged.deleted_ids, &merged.renamed);
        Ok(SyncOutcome::Applied)
    }
}
