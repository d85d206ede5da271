//! Undo/redo history for the annotation store.
//!
//! History is kept as full snapshots of the mutable document state taken
//! *before* each mutation.

use std::collections::VecDeque;

use crate::model::Annotation;

/// Default number of undo steps kept per image.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Document state captured before a mutation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryEntry {
    /// The full annotation list.
    pub annotations: Vec<Annotation>,
    /// Server ids pending deletion.
    pub deleted_ids: Vec<String>,
}

/// Bounded undo/redo stacks over any cloneable state.
///
/// Push the current state *before* changing it. `undo`/`redo` take the
/// live state so it can be moved onto the opposite stack.
#[derive(Debug, Clone)]
pub struct UndoStack<T: Clone> {
    /// States that can be undone, most recent at the back
    undo_stack: VecDeque<T>,
    /// States that can be redone, most recent at the back
    redo_stack: Vec<T>,
    /// Maximum undo depth
    capacity: usize,
}

impl<T: Clone> Default for UndoStack<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl<T: Clone> UndoStack<T> {
    /// Create an empty stack holding at most `capacity` undo steps.
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record the state before a change. Clears the redo stack.
    pub fn push(&mut self, state: T) {
        self.undo_stack.push_back(state);
        self.redo_stack.clear();

        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
            log::trace!("Undo history full, dropped oldest entry");
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pop the previous state, moving `current` onto the redo stack.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let prev = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        Some(prev)
    }

    /// Pop the next state, moving `current` onto the undo stack.
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(current);
        Some(next)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("Undo history cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_stack_basic() {
        let mut stack: UndoStack<i32> = UndoStack::new(10);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());

        stack.push(1);
        assert!(stack.can_undo());
        assert_eq!(stack.undo(2), Some(1));
        assert!(stack.can_redo());
        assert_eq!(stack.redo(1), Some(2));
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut stack: UndoStack<i32> = UndoStack::new(10);
        stack.push(1);
        stack.undo(2);
        assert!(stack.can_redo());

        stack.push(3);
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut stack: UndoStack<i32> = UndoStack::new(3);
        for i in 0..5 {
            stack.push(i);
        }
        assert_eq!(stack.undo_count(), 3);
        assert_eq!(stack.undo(99), Some(4));
        assert_eq!(stack.undo(4), Some(3));
        assert_eq!(stack.undo(3), Some(2));
        assert_eq!(stack.undo(2), None);
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut stack: UndoStack<i32> = UndoStack::default();
        assert_eq!(stack.undo(1), None);
        assert_eq!(stack.redo(1), None);
        assert_eq!(stack.redo_count(), 0);
    }
}
