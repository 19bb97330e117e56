//! Domain records for notebooks, notes and photographs.
//!
//! # Responsibility
//! - Define the records persisted by the store and their typed ids.
//! - Provide factory helpers that stage new records in a `Context`.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - Titles are never blank after trimming.
//! - Timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::hash::Hash;
use uuid::Uuid;

pub mod note;
pub mod notebook;
pub mod photograph;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    };
}

entity_id!(
    /// Stable notebook identifier.
    NotebookId
);
entity_id!(
    /// Stable note identifier.
    NoteId
);
entity_id!(
    /// Stable photograph identifier.
    PhotographId
);

/// Record types held by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Notebook,
    Note,
    Photograph,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Notebook => "notebook",
            Self::Note => "note",
            Self::Photograph => "photograph",
        };
        f.write_str(name)
    }
}

/// Identity shared by every record a fetch can return.
pub trait Entity: Clone {
    type Id: Copy + Eq + Hash + std::fmt::Debug;

    const KIND: EntityKind;

    fn id(&self) -> Self::Id;
}

/// Required-field violations raised by factories and on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BlankTitle(EntityKind),
    EmptyImageData,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle(kind) => write!(f, "{kind} title must not be blank"),
            Self::EmptyImageData => write!(f, "photograph image data must not be empty"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn validate_title(kind: EntityKind, title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::BlankTitle(kind));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_title, EntityKind, NotebookId, ValidationError};

    #[test]
    fn ids_are_unique_and_display_as_uuid() {
        let first = NotebookId::new();
        let second = NotebookId::new();
        assert_ne!(first, second);
        assert_eq!(first.to_string(), first.as_uuid().to_string());
    }

    #[test]
    fn blank_titles_are_rejected() {
        assert_eq!(
            validate_title(EntityKind::Note, "  \n"),
            Err(ValidationError::BlankTitle(EntityKind::Note))
        );
        assert!(validate_title(EntityKind::Note, "groceries").is_ok());
    }
}
