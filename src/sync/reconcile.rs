//! Merging a save response into a store that may have changed meanwhile.

use std::collections::{HashMap, HashSet};

use crate::model::{Annotation, AnnotationId};
use crate::undo::HistoryEntry;

/// Store contents to install after a successful save.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciled {
    pub annotations: Vec<Annotation>,
    pub deleted_ids: Vec<String>,
    /// Local ids that received a server id in this save.
    pub renamed: HashMap<AnnotationId, AnnotationId>,
}

/// Pair each local annotation that was sent with the server annotation
/// created for it, by label and geometry. Each server entry is claimed once.
pub fn match_created(sent: &[Annotation], server: &[Annotation]) -> HashMap<AnnotationId, AnnotationId> {
    let known: HashSet<&AnnotationId> = sent.iter().map(|a| &a.id).collect();
    let mut claimed: HashSet<&AnnotationId> = HashSet::new();
    let mut renamed = HashMap::new();

    for local in sent.iter().filter(|a| a.is_local()) {
        let found = server.iter().find(|s| {
            !known.contains(&s.id)
                && !claimed.contains(&s.id)
                && s.label_id == local.label_id
                && s.shape == local.shape
        });
        match found {
            Some(s) => {
                claimed.insert(&s.id);
                renamed.insert(local.id.clone(), s.id.clone());
            }
            None => log::warn!("No server annotation matches created {}", local.id),
        }
    }
    renamed
}

/// Combine the server's canonical list with the current document.
///
/// `sent` is the document the batch was built from. When `changed` is
/// false nothing happened during the flight and the server list is taken
/// verbatim. Otherwise:
/// - annotations present at save time keep their current content but take
///   the server id and version
/// - annotations created during the flight stay local
/// - deletions recorded during the flight stay pending, including created
///   annotations the server has just persisted
/// - anything else the server returned is appended
pub fn reconcile(
    sent: &HistoryEntry,
    current: &HistoryEntry,
    server: Vec<Annotation>,
    changed: bool,
) -> Reconciled {
    let renamed = match_created(&sent.annotations, &server);
    if !changed {
        return Reconciled {
            annotations: server,
            deleted_ids: Vec::new(),
            renamed,
        };
    }

    let server_by_id: HashMap<&AnnotationId, &Annotation> =
        server.iter().map(|s| (&s.id, s)).collect();
    let mut used: HashSet<AnnotationId> = HashSet::new();
    let mut annotations = Vec::with_capacity(current.annotations.len());

    for annotation in &current.annotations {
        let target = renamed.get(&annotation.id).unwrap_or(&annotation.id);
        match server_by_id.get(target) {
            Some(remote) => {
                let mut merged = annotation.clone();
                merged.id = remote.id.clone();
                merged.version = remote.version;
                used.insert(remote.id.clone());
                annotations.push(merged);
            }
            None if annotation.is_local() => annotations.push(annotation.clone()),
            None => log::debug!("Dropping {}: no longer on the server", annotation.id),
        }
    }

    let mut deleted_ids: Vec<String> = current
        .deleted_ids
        .iter()
        .filter(|id| !sent.deleted_ids.contains(*id))
        .cloned()
        .collect();
    for (local, persisted) in &renamed {
        if used.contains(persisted) {
            continue;
        }
        // Created by this save but deleted locally while it was in flight.
        if !current.annotations.iter().any(|a| &a.id == local)
            && let Some(server_id) = persisted.as_persisted()
            && !deleted_ids.iter().any(|d| d == server_id)
        {
            deleted_ids.push(server_id.to_string());
        }
    }

    for remote in server {
        let pending_delete = remote
            .id
            .as_persisted()
            .is_some_and(|id| deleted_ids.iter().any(|d| d == id));
        if !used.contains(&remote.id) && !pending_delete {
            annotations.push(remote);
        }
    }

    Reconciled {
        annotations,
        deleted_ids,
        renamed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::model::{LabelId, Shape};

    fn boxed(id: AnnotationId, x: f32) -> Annotation {
        Annotation::new(
            id,
            LabelId::new("car"),
            Shape::Box(BoundingBox::new(x, 0.0, 10.0, 10.0)),
        )
    }

    fn persisted(id: &str, x: f32, version: u32) -> Annotation {
        boxed(AnnotationId::persisted(id), x).with_version(version)
    }

    #[test]
    fn test_unchanged_takes_server_verbatim() {
        let sent = HistoryEntry {
            annotations: vec![boxed(AnnotationId::Local(1), 5.0)],
            deleted_ids: vec!["gone".to_string()],
        };
        let server = vec![persisted("s1", 5.0, 1)];
        let result = reconcile(&sent, &sent, server.clone(), false);
        assert_eq!(result.annotations, server);
        assert!(result.deleted_ids.is_empty());
        assert_eq!(
            result.renamed.get(&AnnotationId::Local(1)),
            Some(&AnnotationId::persisted("s1"))
        );
    }

    #[test]
    fn test_match_created_claims_each_server_entry_once() {
        let sent = vec![
            boxed(AnnotationId::Local(1), 5.0),
            boxed(AnnotationId::Local(2), 5.0),
        ];
        let server = vec![persisted("s1", 5.0, 1), persisted("s2", 5.0, 1)];
        let renamed = match_created(&sent, &server);
        assert_eq!(renamed.len(), 2);
        assert_ne!(
            renamed.get(&AnnotationId::Local(1)),
            renamed.get(&AnnotationId::Local(2))
        );
    }

    #[test]
    fn test_edits_during_flight_are_kept() {
        let sent = HistoryEntry {
            annotations: vec![persisted("b1", 0.0, 1), boxed(AnnotationId::Local(1), 50.0)],
            deleted_ids: vec![],
        };
        // During the flight: b1 moved, local#1 moved, local#2 drawn.
        let current = HistoryEntry {
            annotations: vec![
                persisted("b1", 7.0, 1),
                boxed(AnnotationId::Local(1), 60.0),
                boxed(AnnotationId::Local(2), 90.0),
            ],
            deleted_ids: vec![],
        };
        let server = vec![persisted("b1", 0.0, 2), persisted("s9", 50.0, 1)];

        let result = reconcile(&sent, &current, server, true);
        assert_eq!(result.annotations.len(), 3);
        assert_eq!(result.annotations[0], persisted("b1", 7.0, 2));
        assert_eq!(result.annotations[1], persisted("s9", 60.0, 1));
        assert_eq!(result.annotations[2].id, AnnotationId::Local(2));
        assert!(result.deleted_ids.is_empty());
    }

    #[test]
    fn test_deletions_during_flight_stay_pending() {
        let sent = HistoryEntry {
            annotations: vec![persisted("b1", 0.0, 1), boxed(AnnotationId::Local(1), 50.0)],
            deleted_ids: vec!["a1".to_string()],
        };
        // During the flight both annotations were deleted.
        let current = HistoryEntry {
            annotations: vec![],
            deleted_ids: vec!["a1".to_string(), "b1".to_string()],
        };
        let server = vec![persisted("b1", 0.0, 2), persisted("s9", 50.0, 1)];

        let result = reconcile(&sent, &current, server, true);
        assert!(result.annotations.is_empty());
        assert_eq!(result.deleted_ids, vec!["b1".to_string(), "s9".to_string()]);
    }

    #[test]
    fn test_foreign_additions_are_appended() {
        let sent = HistoryEntry {
            annotations: vec![persisted("b1", 0.0, 1)],
            deleted_ids: vec![],
        };
        let current = HistoryEntry {
            annotations: vec![persisted("b1", 3.0, 1)],
            deleted_ids: vec![],
        };
        let server = vec![persisted("b1", 0.0, 2), persisted("other", 80.0, 1)];
        let result = reconcile(&sent, &current, server, true);
        assert_eq!(result.annotations.len(), 2);
        assert_eq!(result.annotations[1].id, AnnotationId::persisted("other"));
    }
}
