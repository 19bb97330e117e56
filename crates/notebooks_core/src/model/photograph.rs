//! Photograph record and its unmaterialized fault.
//!
//! # Invariants
//! - A photograph has at most one owner: a notebook cover or a note.
//! - Image bytes are never empty.
//! - List fetches return `PhotographFault`; image bytes load only when the
//!   fault fires through `Context::photograph`/`Context::photographs`.

use crate::context::Context;
use crate::model::{Entity, EntityKind, NoteId, NotebookId, PhotographId, ValidationError};
use crate::repo::StoreResult;
use serde::{Deserialize, Serialize};

/// Back-reference from a photograph to the record that shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PhotoOwner {
    /// Cover photograph of a notebook.
    Notebook(NotebookId),
    /// One of the photographs attached to a note.
    Note(NoteId),
}

/// Fully materialized photograph including image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photograph {
    pub id: PhotographId,
    pub image_data: Vec<u8>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub owner: Option<PhotoOwner>,
}

impl Photograph {
    pub fn new(image_data: Vec<u8>, created_at: i64) -> Self {
        Self {
            id: PhotographId::new(),
            image_data,
            created_at,
            owner: None,
        }
    }

    /// Stages a new, unowned photograph in `ctx` and returns it.
    ///
    /// Attach it with `Context::set_notebook_photo` or
    /// `Context::add_note_photo`.
    ///
    /// # Errors
    /// - `StoreError::Validation` when `image_data` is empty.
    pub fn create(ctx: &mut Context, image_data: Vec<u8>, created_at: i64) -> StoreResult<Self> {
        let photograph = Self::new(image_data, created_at);
        ctx.insert_photograph(photograph.clone())?;
        Ok(photograph)
    }

    /// Returns the blob-free view of this photograph.
    pub fn to_fault(&self) -> PhotographFault {
        PhotographFault {
            id: self.id,
            created_at: self.created_at,
            owner: self.owner,
            byte_len: self.image_data.len(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.image_data.is_empty() {
            return Err(ValidationError::EmptyImageData);
        }
        Ok(())
    }
}

/// Photograph reference whose image bytes are not loaded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotographFault {
    pub id: PhotographId,
    pub created_at: i64,
    pub owner: Option<PhotoOwner>,
    /// Size of the image bytes in storage.
    pub byte_len: usize,
}

impl Entity for Photograph {
    type Id = PhotographId;

    const KIND: EntityKind = EntityKind::Photograph;

    fn id(&self) -> PhotographId {
        self.id
    }
}

impl Entity for PhotographFault {
    type Id = PhotographId;

    const KIND: EntityKind = EntityKind::Photograph;

    fn id(&self) -> PhotographId {
        self.id
    }
}
