//! Note record.

use crate::context::Context;
use crate::model::{validate_title, Entity, EntityKind, NoteId, NotebookId, ValidationError};
use crate::repo::StoreResult;
use serde::{Deserialize, Serialize};

/// A titled note that belongs to exactly one notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub notebook_id: NotebookId,
    pub title: String,
    pub comment: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Note {
    pub fn new(notebook_id: NotebookId, title: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: NoteId::new(),
            notebook_id,
            title: title.into(),
            comment: None,
            created_at,
        }
    }

    /// Stages a new note under a notebook (or its id) in `ctx` and returns it.
    ///
    /// # Errors
    /// - `StoreError::Validation` when `title` is blank.
    /// - `StoreError::NotFound` when the notebook is unknown to `ctx` or
    ///   already staged for deletion.
    pub fn create(
        ctx: &mut Context,
        notebook: impl Into<NotebookId>,
        title: impl Into<String>,
        created_at: i64,
    ) -> StoreResult<Self> {
        let note = Self::new(notebook.into(), title, created_at);
        ctx.insert_note(note.clone())?;
        Ok(note)
    }

    /// Same as [`Note::create`] with a free-text comment attached.
    pub fn create_with_comment(
        ctx: &mut Context,
        notebook: impl Into<NotebookId>,
        title: impl Into<String>,
        comment: impl Into<String>,
        created_at: i64,
    ) -> StoreResult<Self> {
        let mut note = Self::new(notebook.into(), title, created_at);
        note.comment = Some(comment.into());
        ctx.insert_note(note.clone())?;
        Ok(note)
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate_title(EntityKind::Note, &self.title)
    }
}

impl Entity for Note {
    type Id = NoteId;

    const KIND: EntityKind = EntityKind::Note;

    fn id(&self) -> NoteId {
        self.id
    }
}
