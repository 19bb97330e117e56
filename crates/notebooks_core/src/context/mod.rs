//! Transactional working sets of record changes.
//!
//! # Responsibility
//! - Stage inserts, updates and deletes without touching the store.
//! - Answer fetches as "store + my staged changes".
//! - Persist staged changes atomically on `save` and publish one change set.
//!
//! # Invariants
//! - A context is bound to exactly one store connection (view or background)
//!   and is used from one thread at a time (`&mut self` for mutations).
//! - `save` replays every staged change in one `IMMEDIATE` transaction; other
//!   connections observe all of it or none of it.
//! - A failed save leaves the staged changes in place.
//! - Deleting a notebook stages the deletion of its notes and photographs,
//!   so unsaved fetches agree with the store's `ON DELETE CASCADE`.

use crate::model::note::Note;
use crate::model::notebook::Notebook;
use crate::model::photograph::{PhotoOwner, Photograph, PhotographFault};
use crate::model::{EntityKind, NoteId, NotebookId, PhotographId};
use crate::query::{FetchRequest, Predicate};
use crate::repo::{
    note_repo, notebook_repo, photograph_repo, row_order_of, SqlRecord, StoreError, StoreResult,
};
use crate::store::shared::{ConnectionRole, StoreShared};
use log::{debug, error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::HashMap;
use std::sync::{Arc, MutexGuard};
use std::time::Instant;

mod changes;
mod fetch;
mod staging;

pub use changes::{ChangeSet, EntityChanges};
pub use fetch::Fetchable;
use staging::{Staged, Staging};

/// A working set of staged changes bound to one store connection.
pub struct Context {
    shared: Arc<StoreShared>,
    role: ConnectionRole,
    staging: Staging,
    materialized: HashMap<PhotographId, Photograph>,
}

impl Context {
    pub(crate) fn new(shared: Arc<StoreShared>, role: ConnectionRole) -> Self {
        Self {
            shared,
            role,
            staging: Staging::default(),
            materialized: HashMap::new(),
        }
    }

    /// `"view"` or `"background"`.
    pub fn name(&self) -> &'static str {
        self.role.name()
    }

    /// Whether this context holds unsaved changes.
    pub fn has_changes(&self) -> bool {
        !self.staging.is_empty()
    }

    /// Fetches records matching `request`, including unsaved changes of this
    /// context.
    pub fn fetch<T: Fetchable>(&self, request: &FetchRequest<T>) -> StoreResult<Vec<T>> {
        request.validate()?;
        let persisted = {
            let conn = self.connection();
            T::load_persisted(&conn, request.predicate())?
        };
        fetch::overlay(persisted, &self.staging, request)
    }

    pub fn count<T: Fetchable>(&self, request: &FetchRequest<T>) -> StoreResult<usize> {
        Ok(self.fetch(request)?.len())
    }

    pub fn notebook(&self, id: NotebookId) -> StoreResult<Option<Notebook>> {
        let request = FetchRequest::new().filter(Predicate::InNotebook(id));
        Ok(self.fetch(&request)?.into_iter().next())
    }

    pub fn note(&self, id: NoteId) -> StoreResult<Option<Note>> {
        let request = FetchRequest::new().filter(Predicate::OfNote(id));
        Ok(self.fetch(&request)?.into_iter().next())
    }

    /// Cover photograph of a notebook, as a fault.
    pub fn notebook_photo(&self, notebook_id: NotebookId) -> StoreResult<Option<PhotographFault>> {
        let request = FetchRequest::new().filter(Predicate::InNotebook(notebook_id));
        Ok(self.fetch(&request)?.into_iter().next())
    }

    /// Photographs attached to a note, as faults in insertion order.
    pub fn note_photos(&self, note_id: NoteId) -> StoreResult<Vec<PhotographFault>> {
        self.fetch(&FetchRequest::new().filter(Predicate::OfNote(note_id)))
    }

    /// Fires the fault for one photograph, loading its image bytes.
    ///
    /// Materialized photographs are cached until the next `reset` or a merge
    /// that touches them.
    pub fn photograph(&mut self, id: PhotographId) -> StoreResult<Option<Photograph>> {
        Ok(self.photographs(&[id])?.into_iter().next())
    }

    /// Fires many faults with a single store round trip.
    ///
    /// Output follows the order of `ids`; unknown or deleted ids are skipped.
    pub fn photographs(&mut self, ids: &[PhotographId]) -> StoreResult<Vec<Photograph>> {
        let missing: Vec<PhotographId> = ids
            .iter()
            .copied()
            .filter(|id| {
                self.staging.photographs.get(id).is_none() && !self.materialized.contains_key(id)
            })
            .collect();

        if !missing.is_empty() {
            let loaded = {
                let conn = self.connection();
                photograph_repo::load_photographs(&conn, &missing)?
            };
            debug!(
                "event=fault_fire module=context context={} requested={} loaded={}",
                self.name(),
                missing.len(),
                loaded.len()
            );
            for photograph in loaded {
                self.materialized.insert(photograph.id, photograph);
            }
        }

        let mut photographs = Vec::with_capacity(ids.len());
        for id in ids {
            let current = match self.staging.photographs.get(id) {
                Some(entry) => entry.record().cloned(),
                None => self.materialized.get(id).cloned(),
            };
            if let Some(photograph) = current {
                photographs.push(photograph);
            }
        }
        Ok(photographs)
    }

    pub(crate) fn insert_notebook(&mut self, notebook: Notebook) -> StoreResult<()> {
        notebook.validate()?;
        self.staging.notebooks.insert(notebook.id, notebook);
        Ok(())
    }

    pub(crate) fn insert_note(&mut self, note: Note) -> StoreResult<()> {
        note.validate()?;
        self.require_notebook(note.notebook_id)?;
        self.staging.notes.insert(note.id, note);
        Ok(())
    }

    pub(crate) fn insert_photograph(&mut self, mut photograph: Photograph) -> StoreResult<()> {
        photograph.validate()?;
        let owner = photograph.owner.take();
        if let Some(owner) = owner {
            self.require_owner(owner)?;
        }
        let id = photograph.id;
        self.staging.photographs.insert(id, photograph);
        if let Some(owner) = owner {
            self.assign_owner(id, Some(owner))?;
        }
        Ok(())
    }

    /// Stages new values for an existing notebook.
    pub fn update_notebook(&mut self, notebook: &Notebook) -> StoreResult<()> {
        notebook.validate()?;
        let row_order = self.staged_row_order(
            self.staging.notebooks.get(&notebook.id),
            <Notebook as SqlRecord>::TABLE,
            EntityKind::Notebook,
            notebook.id.as_uuid(),
        )?;
        self.staging
            .notebooks
            .update(notebook.id, notebook.clone(), row_order);
        Ok(())
    }

    /// Stages new values for an existing note; moving it to another live
    /// notebook is allowed.
    pub fn update_note(&mut self, note: &Note) -> StoreResult<()> {
        note.validate()?;
        self.require_notebook(note.notebook_id)?;
        let row_order = self.staged_row_order(
            self.staging.notes.get(&note.id),
            <Note as SqlRecord>::TABLE,
            EntityKind::Note,
            note.id.as_uuid(),
        )?;
        self.staging.notes.update(note.id, note.clone(), row_order);
        Ok(())
    }

    /// Stages deletion of a notebook together with its notes, their
    /// photographs and the notebook's cover.
    pub fn delete_notebook(&mut self, id: NotebookId) -> StoreResult<()> {
        self.require_notebook(id)?;

        let notes = self.fetch(&FetchRequest::<Note>::new().filter(Predicate::InNotebook(id)))?;
        for note in notes {
            self.delete_note(note.id)?;
        }
        if let Some(cover) = self.notebook_photo(id)? {
            self.stage_photograph_delete(cover.id);
        }
        self.staging.notebooks.delete(id);
        Ok(())
    }

    /// Stages deletion of a note and its photographs.
    pub fn delete_note(&mut self, id: NoteId) -> StoreResult<()> {
        if self.note(id)?.is_none() {
            return Err(not_found(EntityKind::Note, id.as_uuid()));
        }
        for photo in self.note_photos(id)? {
            self.stage_photograph_delete(photo.id);
        }
        self.staging.notes.delete(id);
        Ok(())
    }

    pub fn delete_photograph(&mut self, id: PhotographId) -> StoreResult<()> {
        self.require_photograph(id)?;
        self.stage_photograph_delete(id);
        Ok(())
    }

    /// Makes `photo_id` the cover of `notebook_id`, detaching any previous
    /// cover.
    pub fn set_notebook_photo(
        &mut self,
        notebook_id: NotebookId,
        photo_id: PhotographId,
    ) -> StoreResult<()> {
        self.require_notebook(notebook_id)?;
        self.assign_owner(photo_id, Some(PhotoOwner::Notebook(notebook_id)))
    }

    pub fn add_note_photo(&mut self, note_id: NoteId, photo_id: PhotographId) -> StoreResult<()> {
        if self.note(note_id)?.is_none() {
            return Err(not_found(EntityKind::Note, note_id.as_uuid()));
        }
        self.assign_owner(photo_id, Some(PhotoOwner::Note(note_id)))
    }

    /// Leaves the photograph in the store without an owner.
    pub fn detach_photograph(&mut self, photo_id: PhotographId) -> StoreResult<()> {
        self.assign_owner(photo_id, None)
    }

    /// Persists every staged change atomically.
    ///
    /// Returns `Ok(None)` when there was nothing to save.
    ///
    /// # Errors
    /// Any validation or SQLite failure. The failure is logged, the
    /// transaction is rolled back and staged changes are kept.
    pub fn save(&mut self) -> StoreResult<Option<ChangeSet>> {
        if !self.has_changes() {
            return Ok(None);
        }

        let started_at = Instant::now();
        match self.write_staged() {
            Ok(changes) => {
                self.staging.clear();
                let (inserted, updated, deleted) = changes.counts();
                info!(
                    "event=context_save module=context status=ok context={} inserted={} updated={} deleted={} duration_ms={}",
                    self.name(),
                    inserted,
                    updated,
                    deleted,
                    started_at.elapsed().as_millis()
                );
                self.shared.notifier().publish(&changes);
                Ok(Some(changes))
            }
            Err(err) => {
                error!(
                    "event=context_save module=context status=error context={} duration_ms={} error={}",
                    self.name(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Discards staged changes and materialized photographs.
    pub fn reset(&mut self) {
        self.staging.clear();
        self.materialized.clear();
    }

    /// Folds change sets committed elsewhere into this context.
    ///
    /// Cached photographs touched by a change are dropped and staged updates
    /// of records deleted elsewhere are discarded.
    pub(crate) fn merge(&mut self, changes: &[ChangeSet]) {
        for change in changes {
            if change.store_reset {
                self.reset();
                continue;
            }
            for id in &change.notebooks.deleted {
                if matches!(self.staging.notebooks.get(id), Some(Staged::Updated { .. })) {
                    self.staging.notebooks.forget(id);
                }
            }
            for id in &change.notes.deleted {
                if matches!(self.staging.notes.get(id), Some(Staged::Updated { .. })) {
                    self.staging.notes.forget(id);
                }
            }
            for id in &change.photographs.deleted {
                if matches!(self.staging.photographs.get(id), Some(Staged::Updated { .. })) {
                    self.staging.photographs.forget(id);
                }
                self.materialized.remove(id);
            }
            for id in &change.photographs.updated {
                self.materialized.remove(id);
            }
        }
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.shared.lock_connection(self.role)
    }

    fn write_staged(&self) -> StoreResult<ChangeSet> {
        self.validate_staged()?;

        let mut conn = self.connection();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Cascades and re-parenting are replayed in table order, not the
        // order they were staged in.
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

        let mut changes = ChangeSet::new(self.name());
        let staging = &self.staging;

        // Owners are cleared first: covers may swap notebooks under the
        // single-cover index, and cascading deletes below must not reach a
        // photograph that moved elsewhere.
        let updated_photographs = staging.photographs.updated();
        let deleted_photographs = staging.photographs.deleted();
        for id in updated_photographs
            .iter()
            .map(|(id, _)| *id)
            .chain(deleted_photographs.iter().copied())
        {
            photograph_repo::detach_photograph(&tx, id)?;
        }
        for id in deleted_photographs {
            photograph_repo::delete_photograph(&tx, id)?;
            changes.photographs.deleted.push(id);
        }

        // Re-parenting lands before notebook and note deletes; `ON DELETE
        // CASCADE` is not deferred.
        for (id, notebook) in staging.notebooks.updated() {
            if !notebook_repo::update_notebook(&tx, notebook)? {
                return Err(not_found(EntityKind::Notebook, id.as_uuid()));
            }
            changes.notebooks.updated.push(id);
        }
        for (id, note) in staging.notes.updated() {
            if !note_repo::update_note(&tx, note)? {
                return Err(not_found(EntityKind::Note, id.as_uuid()));
            }
            changes.notes.updated.push(id);
        }
        for (id, photograph) in &updated_photographs {
            if !photograph_repo::update_photograph(&tx, photograph)? {
                return Err(not_found(EntityKind::Photograph, id.as_uuid()));
            }
            changes.photographs.updated.push(*id);
        }

        for id in staging.notes.deleted() {
            note_repo::delete_note(&tx, id)?;
            changes.notes.deleted.push(id);
        }
        for id in staging.notebooks.deleted() {
            notebook_repo::delete_notebook(&tx, id)?;
            changes.notebooks.deleted.push(id);
        }

        for notebook in staging.notebooks.inserted() {
            notebook_repo::insert_notebook(&tx, notebook)?;
            changes.notebooks.inserted.push(notebook.id);
        }
        for note in staging.notes.inserted() {
            note_repo::insert_note(&tx, note)?;
            changes.notes.inserted.push(note.id);
        }
        for photograph in staging.photographs.inserted() {
            photograph_repo::insert_photograph(&tx, photograph)?;
            changes.photographs.inserted.push(photograph.id);
        }

        tx.commit()?;
        Ok(changes)
    }

    fn validate_staged(&self) -> StoreResult<()> {
        for (_, entry) in self.staging.notebooks.entries() {
            if let Some(notebook) = entry.record() {
                notebook.validate()?;
            }
        }
        for (_, entry) in self.staging.notes.entries() {
            if let Some(note) = entry.record() {
                note.validate()?;
            }
        }
        for (_, entry) in self.staging.photographs.entries() {
            if let Some(photograph) = entry.record() {
                photograph.validate()?;
            }
        }
        Ok(())
    }

    /// Resolves the `rowid` to stage an update under, rejecting records that
    /// are unknown or already staged for deletion.
    fn staged_row_order<T>(
        &self,
        staged: Option<&Staged<T>>,
        table: &str,
        kind: EntityKind,
        id: uuid::Uuid,
    ) -> StoreResult<i64> {
        match staged {
            Some(Staged::Inserted { .. }) => Ok(0),
            Some(Staged::Updated { row_order, .. }) => Ok(*row_order),
            Some(Staged::Deleted) => Err(not_found(kind, id)),
            None => {
                let conn = self.connection();
                row_order_of(&conn, table, id)?.ok_or_else(|| not_found(kind, id))
            }
        }
    }

    fn require_notebook(&self, id: NotebookId) -> StoreResult<()> {
        let live = match self.staging.notebooks.get(&id) {
            Some(entry) => entry.record().is_some(),
            None => {
                let conn = self.connection();
                notebook_repo::notebook_exists(&conn, id)?
            }
        };
        if live {
            Ok(())
        } else {
            Err(not_found(EntityKind::Notebook, id.as_uuid()))
        }
    }

    fn require_note(&self, id: NoteId) -> StoreResult<()> {
        let live = match self.staging.notes.get(&id) {
            Some(entry) => entry.record().is_some(),
            None => {
                let conn = self.connection();
                note_repo::note_exists(&conn, id)?
            }
        };
        if live {
            Ok(())
        } else {
            Err(not_found(EntityKind::Note, id.as_uuid()))
        }
    }

    fn require_photograph(&self, id: PhotographId) -> StoreResult<()> {
        let live = match self.staging.photographs.get(&id) {
            Some(entry) => entry.record().is_some(),
            None => {
                let conn = self.connection();
                let table = <PhotographFault as SqlRecord>::TABLE;
                row_order_of(&conn, table, id.as_uuid())?.is_some()
            }
        };
        if live {
            Ok(())
        } else {
            Err(not_found(EntityKind::Photograph, id.as_uuid()))
        }
    }

    fn require_owner(&self, owner: PhotoOwner) -> StoreResult<()> {
        match owner {
            PhotoOwner::Notebook(id) => self.require_notebook(id),
            PhotoOwner::Note(id) => self.require_note(id),
        }
    }

    fn assign_owner(&mut self, photo_id: PhotographId, owner: Option<PhotoOwner>) -> StoreResult<()> {
        let mut photograph = self
            .photograph(photo_id)?
            .ok_or_else(|| not_found(EntityKind::Photograph, photo_id.as_uuid()))?;

        if let Some(PhotoOwner::Notebook(notebook_id)) = owner {
            if let Some(previous) = self.notebook_photo(notebook_id)? {
                if previous.id != photo_id {
                    let mut detached = self
                        .photograph(previous.id)?
                        .ok_or_else(|| not_found(EntityKind::Photograph, previous.id.as_uuid()))?;
                    detached.owner = None;
                    self.stage_photograph_update(detached)?;
                }
            }
        }

        photograph.owner = owner;
        self.stage_photograph_update(photograph)
    }

    fn stage_photograph_update(&mut self, photograph: Photograph) -> StoreResult<()> {
        let row_order = self.staged_row_order(
            self.staging.photographs.get(&photograph.id),
            <PhotographFault as SqlRecord>::TABLE,
            EntityKind::Photograph,
            photograph.id.as_uuid(),
        )?;
        self.materialized.remove(&photograph.id);
        self.staging
            .photographs
            .update(photograph.id, photograph, row_order);
        Ok(())
    }

    fn stage_photograph_delete(&mut self, id: PhotographId) {
        self.materialized.remove(&id);
        self.staging.photographs.delete(id);
    }
}

fn not_found(kind: EntityKind, id: uuid::Uuid) -> StoreError {
    StoreError::NotFound { kind, id }
}
