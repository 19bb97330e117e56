//! Staged (unsaved) record changes of one context.

use crate::model::note::Note;
use crate::model::notebook::Notebook;
use crate::model::photograph::Photograph;
use crate::model::{NoteId, NotebookId, PhotographId};
use std::collections::HashMap;
use std::hash::Hash;

/// Pending state of one record inside a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged<T> {
    /// New record; `ordinal` is its position in the context's insert order.
    Inserted { ordinal: usize, record: T },
    /// Persisted record with replaced values; `row_order` is its `rowid`.
    Updated { row_order: i64, record: T },
    /// Persisted record scheduled for removal.
    Deleted,
}

impl<T> Staged<T> {
    pub fn map<U>(&self, convert: impl FnOnce(&T) -> U) -> Staged<U> {
        match self {
            Self::Inserted { ordinal, record } => Staged::Inserted {
                ordinal: *ordinal,
                record: convert(record),
            },
            Self::Updated { row_order, record } => Staged::Updated {
                row_order: *row_order,
                record: convert(record),
            },
            Self::Deleted => Staged::Deleted,
        }
    }

    /// Current record value, or `None` when staged for deletion.
    pub fn record(&self) -> Option<&T> {
        match self {
            Self::Inserted { record, .. } | Self::Updated { record, .. } => Some(record),
            Self::Deleted => None,
        }
    }
}

/// Staged changes for one record type.
#[derive(Debug)]
pub struct StagedTable<Id, T> {
    entries: HashMap<Id, Staged<T>>,
    next_ordinal: usize,
}

impl<Id: Copy + Eq + Hash + Ord, T: Clone> StagedTable<Id, T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_ordinal: 0,
        }
    }

    pub fn get(&self, id: &Id) -> Option<&Staged<T>> {
        self.entries.get(id)
    }

    pub fn insert(&mut self, id: Id, record: T) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.entries.insert(id, Staged::Inserted { ordinal, record });
    }

    /// Replaces the staged value of an inserted or updated record, or stages
    /// an update of a persisted record found at `row_order`.
    pub fn update(&mut self, id: Id, record: T, row_order: i64) {
        match self.entries.get_mut(&id) {
            Some(Staged::Inserted { record: current, .. })
            | Some(Staged::Updated {
                record: current, ..
            }) => *current = record,
            Some(Staged::Deleted) | None => {
                self.entries
                    .insert(id, Staged::Updated { row_order, record });
            }
        }
    }

    /// Unsaved inserts vanish; persisted records become tombstones.
    pub fn delete(&mut self, id: Id) {
        match self.entries.get(&id) {
            Some(Staged::Inserted { .. }) => {
                self.entries.remove(&id);
            }
            _ => {
                self.entries.insert(id, Staged::Deleted);
            }
        }
    }

    pub fn forget(&mut self, id: &Id) {
        self.entries.remove(id);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_ordinal = 0;
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Id, &Staged<T>)> {
        self.entries.iter()
    }

    /// Inserted records in the order they were staged.
    pub fn inserted(&self) -> Vec<&T> {
        let mut inserted: Vec<(usize, &T)> = self
            .entries
            .values()
            .filter_map(|entry| match entry {
                Staged::Inserted { ordinal, record } => Some((*ordinal, record)),
                _ => None,
            })
            .collect();
        inserted.sort_by_key(|(ordinal, _)| *ordinal);
        inserted.into_iter().map(|(_, record)| record).collect()
    }

    /// Updated records, sorted by id for deterministic replay.
    pub fn updated(&self) -> Vec<(Id, &T)> {
        let mut updated: Vec<(Id, &T)> = self
            .entries
            .iter()
            .filter_map(|(id, entry)| match entry {
                Staged::Updated { record, .. } => Some((*id, record)),
                _ => None,
            })
            .collect();
        updated.sort_by_key(|(id, _)| *id);
        updated
    }

    /// Ids staged for deletion, sorted.
    pub fn deleted(&self) -> Vec<Id> {
        let mut deleted: Vec<Id> = self
            .entries
            .iter()
            .filter(|(_, entry)| matches!(entry, Staged::Deleted))
            .map(|(id, _)| *id)
            .collect();
        deleted.sort();
        deleted
    }
}

impl<Id: Copy + Eq + Hash + Ord, T: Clone> Default for StagedTable<Id, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// All staged changes of one context.
#[derive(Debug, Default)]
pub struct Staging {
    pub notebooks: StagedTable<NotebookId, Notebook>,
    pub notes: StagedTable<NoteId, Note>,
    pub photographs: StagedTable<PhotographId, Photograph>,
}

impl Staging {
    pub fn is_empty(&self) -> bool {
        self.notebooks.is_empty() && self.notes.is_empty() && self.photographs.is_empty()
    }

    pub fn clear(&mut self) {
        self.notebooks.clear();
        self.notes.clear();
        self.photographs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{Staged, StagedTable};

    #[test]
    fn deleting_unsaved_insert_leaves_no_trace() {
        let mut table: StagedTable<u32, &str> = StagedTable::new();
        table.insert(1, "draft");
        table.delete(1);
        assert!(table.is_empty());
    }

    #[test]
    fn updating_unsaved_insert_keeps_insert_position() {
        let mut table: StagedTable<u32, &str> = StagedTable::new();
        table.insert(7, "first");
        table.insert(3, "second");
        table.update(7, "first edited", 0);
        assert_eq!(table.inserted(), vec![&"first edited", &"second"]);
    }

    #[test]
    fn deleting_persisted_record_stages_tombstone() {
        let mut table: StagedTable<u32, &str> = StagedTable::new();
        table.update(5, "edited", 42);
        table.delete(5);
        assert_eq!(table.get(&5), Some(&Staged::Deleted));
        assert_eq!(table.deleted(), vec![5]);
    }
}
