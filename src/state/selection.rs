//! Selection set for the active image.

use std::collections::{HashMap, HashSet};

use crate::model::AnnotationId;

/// Selected annotation ids plus the most recently clicked one.
///
/// Membership is order-independent; `last_clicked` drives range operations
/// and decides whose handles render when exactly one shape is selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: HashSet<AnnotationId>,
    last_clicked: Option<AnnotationId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &AnnotationId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationId> {
        self.ids.iter()
    }

    pub fn last_clicked(&self) -> Option<&AnnotationId> {
        self.last_clicked.as_ref()
    }

    /// The selected id when exactly one annotation is selected.
    pub fn single(&self) -> Option<&AnnotationId> {
        if self.ids.len() == 1 {
            self.ids.iter().next()
        } else {
            None
        }
    }

    /// Replace the selection with `{id}`.
    pub fn replace(&mut self, id: AnnotationId) {
        self.ids.clear();
        self.ids.insert(id.clone());
        self.last_clicked = Some(id);
    }

    /// Toggle membership of `id`, leaving other members alone.
    ///
    /// Returns true when `id` is selected afterwards.
    pub fn toggle(&mut self, id: AnnotationId) -> bool {
        if self.ids.remove(&id) {
            if self.last_clicked.as_ref() == Some(&id) {
                self.last_clicked = None;
            }
            false
        } else {
            self.ids.insert(id.clone());
            self.last_clicked = Some(id);
            true
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.last_clicked = None;
    }

    /// Keep only ids for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&AnnotationId) -> bool) {
        self.ids.retain(|id| keep(id));
        if let Some(last) = &self.last_clicked
            && !self.ids.contains(last)
        {
            self.last_clicked = None;
        }
    }

    /// Rename ids, e.g. local ids that the server has just assigned.
    pub fn remap(&mut self, mapping: &HashMap<AnnotationId, AnnotationId>) {
        if mapping.is_empty() {
            return;
        }
        self.ids = self
            .ids
            .drain()
            .map(|id| mapping.get(&id).cloned().unwrap_or(id))
            .collect();
        if let Some(last) = self.last_clicked.take() {
            self.last_clicked = Some(mapping.get(&last).cloned().unwrap_or(last));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> AnnotationId {
        AnnotationId::Local(n)
    }

    #[test]
    fn test_replace_selects_single() {
        let mut sel = Selection::new();
        sel.replace(id(1));
        sel.replace(id(2));
        assert_eq!(sel.single(), Some(&id(2)));
        assert_eq!(sel.last_clicked(), Some(&id(2)));
    }

    #[test]
    fn test_toggle_removes_only_that_id() {
        let mut sel = Selection::new();
        sel.replace(id(1));
        sel.toggle(id(2));
        sel.toggle(id(3));
        assert_eq!(sel.len(), 3);

        assert!(!sel.toggle(id(2)));
        assert!(sel.contains(&id(1)));
        assert!(!sel.contains(&id(2)));
        assert!(sel.contains(&id(3)));
        assert_eq!(sel.last_clicked(), Some(&id(3)));
    }

    #[test]
    fn test_retain_drops_stale_last_clicked() {
        let mut sel = Selection::new();
        sel.replace(id(1));
        sel.retain(|_| false);
        assert!(sel.is_empty());
        assert_eq!(sel.last_clicked(), None);
    }

    #[test]
    fn test_remap_renames_ids() {
        let mut sel = Selection::new();
        sel.replace(id(7));
        let mapping = HashMap::from([(id(7), AnnotationId::persisted("srv-7"))]);
        sel.remap(&mapping);
        assert!(sel.contains(&AnnotationId::persisted("srv-7")));
        assert_eq!(sel.last_clicked(), Some(&AnnotationId::persisted("srv-7")));
    }
}
