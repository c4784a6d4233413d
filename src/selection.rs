//! Selected note ids for bulk operations.
//!
//! The selection only ever holds ids that exist in the registry. Every mutator
//! takes the registry so ids outside it are ignored on the way in, and
//! [`Selection::retain_loaded`] drops ids whose notes have gone away.

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use std::collections::BTreeSet;

use crate::doc::{NoteId, NoteRegistry};

#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: BTreeSet<NoteId>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the selection state of `id`. Returns whether it is now selected.
    pub fn toggle(&mut self, id: NoteId, notes: &NoteRegistry) -> bool {
        if self.ids.remove(&id) {
            return false;
        }
        if notes.contains(id) {
            self.ids.insert(id);
            return true;
        }
        false
    }

    /// Select exactly the given ids that are loaded.
    pub fn select_all(&mut self, ids: impl IntoIterator<Item = NoteId>, notes: &NoteRegistry) {
        self.ids = ids.into_iter().filter(|id| notes.contains(*id)).collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    #[must_use]
    pub fn is_selected(&self, id: NoteId) -> bool {
        self.ids.contains(&id)
    }

    /// Selected ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<NoteId> {
        self.ids.iter().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Drop ids whose notes are no longer in the registry.
    pub fn retain_loaded(&mut self, notes: &NoteRegistry) {
        self.ids.retain(|id| notes.contains(*id));
    }

    pub fn remove(&mut self, id: NoteId) {
        self.ids.remove(&id);
    }

    /// Replace `old` with `new` if `old` was selected.
    pub fn rekey(&mut self, old: NoteId, new: NoteId) {
        if self.ids.remove(&old) {
            self.ids.insert(new);
        }
    }
}
