//! Committed change summaries published after every successful save.

use crate::model::{EntityKind, NoteId, NotebookId, PhotographId};

/// Ids touched by one save for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityChanges<Id> {
    pub inserted: Vec<Id>,
    pub updated: Vec<Id>,
    pub deleted: Vec<Id>,
}

impl<Id> EntityChanges<Id> {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserted.len() + self.updated.len() + self.deleted.len()
    }
}

impl<Id> Default for EntityChanges<Id> {
    fn default() -> Self {
        Self {
            inserted: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

/// Everything one committed save (or store destruction) changed.
///
/// A change set is published only after its transaction commits, so a
/// receiver never sees part of a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Name of the context that produced the change.
    pub origin: String,
    pub notebooks: EntityChanges<NotebookId>,
    pub notes: EntityChanges<NoteId>,
    pub photographs: EntityChanges<PhotographId>,
    /// The whole store was destroyed and re-created empty.
    pub store_reset: bool,
}

impl ChangeSet {
    pub(crate) fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn store_reset(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            store_reset: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.store_reset
            && self.notebooks.is_empty()
            && self.notes.is_empty()
            && self.photographs.is_empty()
    }

    /// Whether records of `kind` may have changed.
    pub fn touches(&self, kind: EntityKind) -> bool {
        self.store_reset
            || match kind {
                EntityKind::Notebook => !self.notebooks.is_empty(),
                EntityKind::Note => !self.notes.is_empty(),
                EntityKind::Photograph => !self.photographs.is_empty(),
            }
    }

    pub(crate) fn counts(&self) -> (usize, usize, usize) {
        let inserted =
            self.notebooks.inserted.len() + self.notes.inserted.len() + self.photographs.inserted.len();
        let updated =
            self.notebooks.updated.len() + self.notes.updated.len() + self.photographs.updated.len();
        let deleted =
            self.notebooks.deleted.len() + self.notes.deleted.len() + self.photographs.deleted.len();
        (inserted, updated, deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeSet;
    use crate::model::{EntityKind, NoteId};

    #[test]
    fn store_reset_touches_every_kind() {
        let changes = ChangeSet::store_reset("view");
        assert!(!changes.is_empty());
        assert!(changes.touches(EntityKind::Photograph));
    }

    #[test]
    fn touches_only_changed_kinds() {
        let mut changes = ChangeSet::new("background");
        changes.notes.inserted.push(NoteId::new());
        assert!(changes.touches(EntityKind::Note));
        assert!(!changes.touches(EntityKind::Notebook));
        assert_eq!(changes.counts(), (1, 0, 0));
    }
}
