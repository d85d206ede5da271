//! The authoritative in-memory annotation state for the active image.
//!
//! Every document mutation goes through a named method on
//! [`AnnotationStore`], which captures a [`HistoryEntry`] before applying the
//! change. Capture and apply happen in the same `&mut self` call, so no other
//! mutation can slip in between. Operations that would change nothing (unknown
//! id, identical value) return `false` and leave the history untouched.

use std::collections::{HashMap, HashSet};

use crate::model::{Annotation, AnnotationId, GeometryPatch, LabelId, Tool};
use crate::state::Selection;
use crate::undo::{DEFAULT_HISTORY_CAPACITY, HistoryEntry, UndoStack};

/// Annotations, pending deletions, selection and history for one image.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    /// Live annotations in render order (last is topmost)
    annotations: Vec<Annotation>,
    /// Server ids deleted since the last sync
    deleted_ids: Vec<String>,
    selection: Selection,
    active_tool: Tool,
    active_label: Option<LabelId>,
    history: UndoStack<HistoryEntry>,
    /// Next local sequence number; never reset so ids stay unique across undo
    next_local_seq: u64,
    /// Bumped on every document change
    revision: u64,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl AnnotationStore {
    /// Empty store keeping at most `history_capacity` undo steps.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            annotations: Vec::new(),
            deleted_ids: Vec::new(),
            selection: Selection::new(),
            active_tool: Tool::default(),
            active_label: None,
            history: UndoStack::new(history_capacity),
            next_local_seq: 1,
            revision: 0,
        }
    }

    // ========================================================================
    // Selectors
    // ========================================================================

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &AnnotationId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Server ids deleted since the last sync, in deletion order.
    pub fn deleted_ids(&self) -> &[String] {
        &self.deleted_ids
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected annotations in render order.
    pub fn selected_annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(|a| self.selection.contains(&a.id))
    }

    pub fn active_tool(&self) -> Tool {
        self.active_tool
    }

    pub fn active_label(&self) -> Option<&LabelId> {
        self.active_label.as_ref()
    }

    /// Monotonic counter of document changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_count(&self) -> usize {
        self.history.undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.history.redo_count()
    }

    /// Copy of the document state (annotations and pending deletions).
    pub fn snapshot(&self) -> HistoryEntry {
        HistoryEntry {
            annotations: self.annotations.clone(),
            deleted_ids: self.deleted_ids.clone(),
        }
    }

    /// The next local sequence number that will be handed out.
    pub fn local_watermark(&self) -> u64 {
        self.next_local_seq
    }

    // ========================================================================
    // Session settings (not part of the undoable document)
    // ========================================================================

    pub fn set_active_tool(&mut self, tool: Tool) {
        self.active_tool = tool;
    }

    pub fn set_active_label(&mut self, label: Option<LabelId>) {
        self.active_label = label;
    }

    /// Hand out a fresh local id.
    pub fn allocate_local_id(&mut self) -> AnnotationId {
        let id = AnnotationId::Local(self.next_local_seq);
        self.next_local_seq += 1;
        id
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Capture the pre-mutation state. Clears the redo stack.
    fn record(&mut self) {
        let snapshot = self.snapshot();
        self.history.push(snapshot);
        self.revision += 1;
    }

    fn index_of(&self, id: &AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|a| &a.id == id)
    }

    /// Append an annotation (user-drawn shape or a freshly fetched prediction).
    ///
    /// Rejects duplicate ids and invalid shapes.
    pub fn add_annotation(&mut self, annotation: Annotation) -> bool {
        if self.contains(&annotation.id) {
            log::warn!("Annotation {} already exists, not adding", annotation.id);
            return false;
        }
        if !annotation.shape.is_valid() {
            log::debug!("Refusing to add invalid shape for {}", annotation.id);
            return false;
        }
        if let Some(seq) = annotation.id.local_seq() {
            self.next_local_seq = self.next_local_seq.max(seq + 1);
        }

        self.record();
        log::debug!(
            "Added {:?} annotation {} (total: {})",
            annotation.kind(),
            annotation.id,
            self.annotations.len() + 1
        );
        self.annotations.push(annotation);
        true
    }

    /// Merge a geometry patch onto an annotation.
    pub fn update_annotation_geometry(&mut self, id: &AnnotationId, patch: &GeometryPatch) -> bool {
        let Some(index) = self.index_of(id) else {
            log::debug!("update_annotation_geometry: unknown id {}", id);
            return false;
        };
        let Some(shape) = patch.apply(&self.annotations[index].shape) else {
            log::debug!("Geometry patch not applicable to {}", id);
            return false;
        };
        if shape == self.annotations[index].shape {
            return false;
        }

        self.record();
        self.annotations[index].shape = shape;
        log::debug!("Updated geometry of {}", id);
        true
    }

    /// Reassign an annotation to another label.
    pub fn update_annotation_label(&mut self, id: &AnnotationId, label_id: LabelId) -> bool {
        let Some(index) = self.index_of(id) else {
            log::debug!("update_annotation_label: unknown id {}", id);
            return false;
        };
        if self.annotations[index].label_id == label_id {
            return false;
        }

        self.record();
        log::debug!("Relabelled {} -> {}", id, label_id);
        self.annotations[index].label_id = label_id;
        true
    }

    /// Relabel several annotations as a single undo step.
    ///
    /// Ids that are unknown or already carry `label_id` are skipped; nothing
    /// is recorded when none change. Returns how many were relabelled.
    pub fn update_annotations_label(&mut self, ids: &[AnnotationId], label_id: &LabelId) -> usize {
        let targets: HashSet<&AnnotationId> = ids.iter().collect();
        let count = self
            .annotations
            .iter()
            .filter(|a| targets.contains(&a.id) && a.label_id != *label_id)
            .count();
        if count == 0 {
            return 0;
        }

        self.record();
        for annotation in &mut self.annotations {
            if targets.contains(&annotation.id) {
                annotation.label_id = label_id.clone();
            }
        }
        log::debug!("Relabelled {} annotation(s) -> {}", count, label_id);
        count
    }

    /// Remove one annotation.
    pub fn delete_annotation(&mut self, id: &AnnotationId) -> bool {
        self.delete_annotations(std::slice::from_ref(id)) == 1
    }

    /// Remove several annotations as a single undo step.
    ///
    /// Persisted ids go to the pending-delete list; local ids vanish without
    /// a trace since the server never saw them. Returns how many were removed.
    pub fn delete_annotations(&mut self, ids: &[AnnotationId]) -> usize {
        let targets: HashSet<&AnnotationId> = ids.iter().collect();
        let count = self
            .annotations
            .iter()
            .filter(|a| targets.contains(&a.id))
            .count();
        if count == 0 {
            return 0;
        }

        self.record();
        let mut kept = Vec::with_capacity(self.annotations.len() - count);
        for annotation in self.annotations.drain(..) {
            if !targets.contains(&annotation.id) {
                kept.push(annotation);
                continue;
            }
            if let AnnotationId::Persisted(server_id) = &annotation.id
                && !self.deleted_ids.contains(server_id)
            {
                self.deleted_ids.push(server_id.clone());
            }
        }
        self.annotations = kept;
        self.selection.retain(|id| !targets.contains(id));
        log::debug!(
            "Deleted {} annotation(s), {} pending server deletes",
            count,
            self.deleted_ids.len()
        );
        count
    }

    /// Delete everything currently selected.
    pub fn delete_selected(&mut self) -> usize {
        let ids: Vec<AnnotationId> = self.selection.iter().cloned().collect();
        self.delete_annotations(&ids)
    }

    /// Shift-click semantics: `additive` toggles, otherwise replace. `None` clears.
    ///
    /// Selection is view state and does not create history entries.
    pub fn select_annotation(&mut self, id: Option<&AnnotationId>, additive: bool) {
        match id {
            None => self.selection.clear(),
            Some(id) if !self.contains(id) => {
                log::debug!("select_annotation: unknown id {}", id);
            }
            Some(id) if additive => {
                self.selection.toggle(id.clone());
            }
            Some(id) => self.selection.replace(id.clone()),
        }
    }

    /// Select every annotation.
    pub fn select_all(&mut self) {
        for annotation in &self.annotations {
            if !self.selection.contains(&annotation.id) {
                self.selection.toggle(annotation.id.clone());
            }
        }
    }

    /// Restore the state before the last mutation.
    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        let Some(previous) = self.history.undo(current) else {
            return false;
        };
        self.restore(previous);
        log::debug!("Undo (remaining: {})", self.history.undo_count());
        true
    }

    /// Re-apply the last undone mutation.
    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        let Some(next) = self.history.redo(current) else {
            return false;
        };
        self.restore(next);
        log::debug!("Redo (remaining: {})", self.history.redo_count());
        true
    }

    fn restore(&mut self, entry: HistoryEntry) {
        self.annotations = entry.annotations;
        self.deleted_ids = entry.deleted_ids;
        self.prune_selection();
        self.revision += 1;
    }

    fn prune_selection(&mut self) {
        let live: HashSet<&AnnotationId> = self.annotations.iter().map(|a| &a.id).collect();
        self.selection.retain(|id| live.contains(id));
    }

    /// Replace the whole list, as on image load. Drops history, pending
    /// deletions and selection so undo cannot cross the load boundary.
    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        log::debug!("Loaded {} annotation(s) into store", annotations.len());
        self.annotations = annotations;
        self.deleted_ids.clear();
        self.selection.clear();
        self.history.clear();
        self.revision += 1;
    }

    /// Install the result of a successful save.
    ///
    /// `renamed` maps local ids to the server ids they were given, so the
    /// selection survives the rename. History is dropped because its
    /// snapshots still carry the pre-save ids.
    pub fn apply_synced(
        &mut self,
        annotations: Vec<Annotation>,
        deleted_ids: Vec<String>,
        renamed: &HashMap<AnnotationId, AnnotationId>,
    ) {
        self.annotations = annotations;
        self.deleted_ids = deleted_ids;
        self.selection.remap(renamed);
        self.prune_selection();
        self.history.clear();
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Point};
    use crate::model::Shape;

    fn label() -> LabelId {
        LabelId::new("car")
    }

    fn server_box(id: &str, x: f32) -> Annotation {
        Annotation::new(
            AnnotationId::persisted(id),
            label(),
            Shape::Box(BoundingBox::new(x, 0.0, 10.0, 10.0)),
        )
    }

    fn local_box(store: &mut AnnotationStore, x: f32) -> Annotation {
        let id = store.allocate_local_id();
        Annotation::new(id, label(), Shape::Box(BoundingBox::new(x, 0.0, 10.0, 10.0)))
    }

    #[test]
    fn test_add_pushes_history_and_clears_redo() {
        let mut store = AnnotationStore::default();
        let a = local_box(&mut store, 0.0);
        assert!(store.add_annotation(a));
        assert_eq!(store.undo_count(), 1);
        assert!(store.undo());
        assert!(store.can_redo());

        let b = local_box(&mut store, 5.0);
        store.add_annotation(b);
        assert!(!store.can_redo());
    }

    #[test]
    fn test_update_unknown_id_is_noop_without_history() {
        let mut store = AnnotationStore::default();
        let patch = GeometryPatch::Translate { dx: 1.0, dy: 1.0 };
        assert!(!store.update_annotation_geometry(&AnnotationId::Local(42), &patch));
        assert!(!store.update_annotation_label(&AnnotationId::Local(42), label()));
        assert_eq!(store.undo_count(), 0);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_identical_update_does_not_push_history() {
        let mut store = AnnotationStore::default();
        store.set_annotations(vec![server_box("a1", 0.0)]);
        let id = AnnotationId::persisted("a1");

        let same = GeometryPatch::Box {
            x: Some(0.0),
            y: None,
            width: None,
            height: None,
        };
        assert!(!store.update_annotation_geometry(&id, &same));
        assert!(!store.update_annotation_label(&id, label()));
        assert_eq!(store.undo_count(), 0);

        assert!(store.update_annotation_label(&id, LabelId::new("truck")));
        assert_eq!(store.undo_count(), 1);
    }

    #[test]
    fn test_delete_tracks_only_persisted_ids() {
        let mut store = AnnotationStore::default();
        store.set_annotations(vec![server_box("a1", 0.0)]);
        let local = local_box(&mut store, 20.0);
        let local_id = local.id.clone();
        store.add_annotation(local);

        assert!(store.delete_annotation(&local_id));
        assert!(store.deleted_ids().is_empty());

        assert!(store.delete_annotation(&AnnotationId::persisted("a1")));
        assert_eq!(store.deleted_ids(), &["a1".to_string()]);
        assert!(store.is_empty());

        // Double delete from two event sources.
        assert!(!store.delete_annotation(&AnnotationId::persisted("a1")));
        assert_eq!(store.deleted_ids().len(), 1);
    }

    #[test]
    fn test_undo_redo_symmetry() {
        let mut store = AnnotationStore::default();
        store.set_annotations(vec![server_box("a1", 0.0), server_box("b1", 50.0)]);
        let before = store.snapshot();

        let a = local_box(&mut store, 100.0);
        let a_id = a.id.clone();
        store.add_annotation(a);
        store.update_annotation_geometry(&a_id, &GeometryPatch::Translate { dx: 3.0, dy: 4.0 });
        store.delete_annotation(&AnnotationId::persisted("a1"));
        store.update_annotation_label(&AnnotationId::persisted("b1"), LabelId::new("bus"));
        let after = store.snapshot();

        for _ in 0..4 {
            assert!(store.undo());
        }
        assert!(!store.undo());
        assert_eq!(store.snapshot(), before);

        for _ in 0..4 {
            assert!(store.redo());
        }
        assert!(!store.redo());
        assert_eq!(store.snapshot(), after);
    }

    #[test]
    fn test_set_annotations_clears_history() {
        let mut store = AnnotationStore::default();
        let a = local_box(&mut store, 0.0);
        store.add_annotation(a);
        store.set_annotations(vec![server_box("x", 0.0)]);
        assert!(!store.can_undo());
        assert!(!store.undo());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_shift_select_toggles() {
        let mut store = AnnotationStore::default();
        store.set_annotations(vec![server_box("a", 0.0), server_box("b", 20.0)]);
        let a = AnnotationId::persisted("a");
        let b = AnnotationId::persisted("b");

        store.select_annotation(Some(&a), false);
        store.select_annotation(Some(&b), true);
        assert_eq!(store.selection().len(), 2);

        store.select_annotation(Some(&a), true);
        assert!(!store.selection().contains(&a));
        assert!(store.selection().contains(&b));

        store.select_annotation(None, false);
        assert!(store.selection().is_empty());
        assert_eq!(store.undo_count(), 0);
    }

    #[test]
    fn test_undo_prunes_selection() {
        let mut store = AnnotationStore::default();
        let a = local_box(&mut store, 0.0);
        let id = a.id.clone();
        store.add_annotation(a);
        store.select_annotation(Some(&id), false);
        store.undo();
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_delete_selected_is_one_undo_step() {
        let mut store = AnnotationStore::default();
        store.set_annotations(vec![
            server_box("a", 0.0),
            server_box("b", 20.0),
            server_box("c", 40.0),
        ]);
        store.select_annotation(Some(&AnnotationId::persisted("a")), false);
        store.select_annotation(Some(&AnnotationId::persisted("c")), true);
        assert_eq!(store.delete_selected(), 2);
        assert_eq!(store.deleted_ids(), &["a".to_string(), "c".to_string()]);
        assert_eq!(store.undo_count(), 1);

        store.undo();
        assert_eq!(store.len(), 3);
        assert!(store.deleted_ids().is_empty());
    }

    #[test]
    fn test_relabel_many_is_one_undo_step() {
        let mut store = AnnotationStore::default();
        store.set_annotations(vec![
            server_box("a", 0.0),
            server_box("b", 20.0),
            server_box("c", 40.0),
        ]);
        let ids = [
            AnnotationId::persisted("a"),
            AnnotationId::persisted("c"),
            AnnotationId::Local(99),
        ];
        let bus = LabelId::new("bus");
        assert_eq!(store.update_annotations_label(&ids, &bus), 2);
        assert_eq!(store.undo_count(), 1);
        assert_eq!(store.annotations()[1].label_id, label());

        // Already relabelled: nothing changes, nothing recorded.
        assert_eq!(store.update_annotations_label(&ids, &bus), 0);
        assert_eq!(store.undo_count(), 1);

        assert!(store.undo());
        assert!(store.annotations().iter().all(|a| a.label_id == label()));
    }

    #[test]
    fn test_rejects_invalid_polygon() {
        let mut store = AnnotationStore::default();
        let id = store.allocate_local_id();
        let poly = Annotation::new(
            id,
            label(),
            Shape::Polygon(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]),
        );
        assert!(!store.add_annotation(poly));
        assert!(store.is_empty());
    }

    #[test]
    fn test_history_capacity_is_bounded() {
        let mut store = AnnotationStore::new(3);
        for i in 0..6 {
            let a = local_box(&mut store, i as f32 * 20.0);
            store.add_annotation(a);
        }
        assert_eq!(store.undo_count(), 3);
    }

    #[test]
    fn test_empty_store_operations_are_noops() {
        let mut store = AnnotationStore::default();
        assert_eq!(store.delete_selected(), 0);
        assert!(!store.undo());
        assert!(!store.redo());
        store.select_all();
        assert!(store.selection().is_empty());
    }
}
