//! Undo/redo history over annotation store snapshots.
//!
//! Each committed user action (a finished draw, a finished move, a removal)
//! pushes one full deep copy of the store - pointer moves never do - so undo
//! always corresponds to one discrete action. Whole-state snapshots trade
//! O(n) memory per entry for simplicity; with bounded depth and small
//! per-document annotation counts the cost stays negligible.

use crate::constants::HISTORY_DEPTH;
use crate::store::AnnotationStore;

/// Linear undo/redo stack with a movable index.
///
/// `index` always points at the snapshot matching the live store. Pushing
/// truncates any redo states beyond it; depth is capped by dropping the
/// oldest entry.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<AnnotationStore>,
    index: usize,
    max_depth: usize,
}

impl History {
    /// Create a history seeded with the initial store state.
    pub fn new(initial: AnnotationStore) -> Self {
        Self::with_depth(initial, HISTORY_DEPTH)
    }

    /// Create with a custom depth cap (at least 2: current plus one undo).
    pub fn with_depth(initial: AnnotationStore, max_depth: usize) -> Self {
        Self {
            snapshots: vec![initial],
            index: 0,
            max_depth: max_depth.max(2),
        }
    }

    /// Record a committed mutation.
    pub fn push(&mut self, snapshot: AnnotationStore) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(snapshot);
        if self.snapshots.len() > self.max_depth {
            self.snapshots.remove(0);
        } else {
            self.index += 1;
        }
        log::debug!(
            "History: pushed snapshot {}/{}",
            self.index + 1,
            self.snapshots.len()
        );
    }

    /// Step back one snapshot. No-op at the oldest entry.
    pub fn undo(&mut self) -> Option<&AnnotationStore> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        log::debug!("History: undo to snapshot {}", self.index + 1);
        Some(&self.snapshots[self.index])
    }

    /// Step forward one snapshot. No-op at the newest entry.
    pub fn redo(&mut self) -> Option<&AnnotationStore> {
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        log::debug!("History: redo to snapshot {}", self.index + 1);
        Some(&self.snapshots[self.index])
    }

    /// Whether an undo is available.
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Whether a redo is available.
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Drop everything and reseed (new document).
    pub fn reset(&mut self, initial: AnnotationStore) {
        self.snapshots = vec![initial];
        self.index = 0;
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// A history always holds at least the seed snapshot.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Current position, for session persistence.
    pub fn index(&self) -> usize {
        self.index
    }
}
