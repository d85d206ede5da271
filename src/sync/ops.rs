//! Save batch construction.

use std::collections::HashMap;

use crate::model::AnnotationId;
use crate::sync::wire::AnnotationOp;
use crate::undo::HistoryEntry;

/// Build the ordered op batch for a document state.
///
/// Order is deletes, then creates, then updates, each in store order.
/// Updates are sent for every persisted annotation whether or not it
/// changed. `versions` supplies the last known server version of deleted
/// annotations, which are no longer in the list to read it from.
pub fn build_ops(document: &HistoryEntry, versions: &HashMap<String, u32>) -> Vec<AnnotationOp> {
    let mut ops = Vec::with_capacity(document.deleted_ids.len() + document.annotations.len());

    ops.extend(
        document
            .deleted_ids
            .iter()
            .map(|id| AnnotationOp::delete(id, versions.get(id).copied())),
    );
    ops.extend(
        document
            .annotations
            .iter()
            .filter(|a| a.is_local())
            .map(AnnotationOp::create),
    );
    ops.extend(document.annotations.iter().filter_map(|a| match &a.id {
        AnnotationId::Persisted(id) => Some(AnnotationOp::update(id, a)),
        AnnotationId::Local(_) => None,
    }));

    ops
}
