//! Notebook record.

use crate::context::Context;
use crate::model::{validate_title, Entity, EntityKind, NotebookId};
use crate::repo::StoreResult;
use serde::{Deserialize, Serialize};

/// Top-level container of notes, optionally carrying one cover photograph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: NotebookId,
    pub title: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Notebook {
    /// Builds a notebook with a generated id without staging it anywhere.
    pub fn new(title: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: NotebookId::new(),
            title: title.into(),
            created_at,
        }
    }

    /// Stages a new notebook in `ctx` and returns it.
    ///
    /// Nothing reaches the store until `ctx.save()`.
    ///
    /// # Errors
    /// - `StoreError::Validation` when `title` is blank.
    pub fn create(
        ctx: &mut Context,
        title: impl Into<String>,
        created_at: i64,
    ) -> StoreResult<Self> {
        let notebook = Self::new(title, created_at);
        ctx.insert_notebook(notebook.clone())?;
        Ok(notebook)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::model::ValidationError> {
        validate_title(EntityKind::Notebook, &self.title)
    }
}

impl Entity for Notebook {
    type Id = NotebookId;

    const KIND: EntityKind = EntityKind::Notebook;

    fn id(&self) -> NotebookId {
        self.id
    }
}

impl From<&Notebook> for NotebookId {
    fn from(notebook: &Notebook) -> Self {
        notebook.id
    }
}
