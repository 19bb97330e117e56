//! Declarative record filters.
//!
//! # Responsibility
//! - Describe filters independent of storage.
//! - Compile filters to parameterized SQL for persisted rows.
//! - Evaluate the same filters in memory for staged, unsaved records.
//!
//! # Invariants
//! - SQL and in-memory evaluation agree for every predicate: text matching
//!   is ASCII case-insensitive on both sides, references use null-safe
//!   equality, and a missing comment behaves as an empty string.
//! - A predicate on a field the entity does not have is an error, never a
//!   silent non-match.

use crate::model::{Entity, EntityKind, NoteId, NotebookId};
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Record attributes a predicate or sort descriptor can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Comment,
    CreatedAt,
    /// Owning notebook (the notebook itself for notebook records).
    Notebook,
    /// Owning note.
    Note,
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Comment => "comment",
            Self::CreatedAt => "created_at",
            Self::Notebook => "notebook",
            Self::Note => "note",
        };
        f.write_str(name)
    }
}

/// Borrowed attribute value read from an in-memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    OptionalText(Option<&'a str>),
    Timestamp(i64),
    Reference(Option<Uuid>),
}

/// Column mapping and attribute access used by predicates and sorting.
pub trait Queryable: Entity {
    /// SQL column for `field`, or `None` when the entity has no such field.
    fn column(field: Field) -> Option<&'static str>;

    /// In-memory value for `field`, or `None` when the entity has no such field.
    fn field_value(&self, field: Field) -> Option<FieldValue<'_>>;
}

/// Query construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    UnsupportedField { kind: EntityKind, field: Field },
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedField { kind, field } => {
                write!(f, "{kind} records have no `{field}` field")
            }
        }
    }
}

impl Error for QueryError {}

/// Filter over one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Exact, case-sensitive title match.
    TitleEquals(String),
    /// Case-insensitive substring match on the title.
    TitleContains(String),
    /// Case-insensitive substring match on the note comment.
    CommentContains(String),
    InNotebook(NotebookId),
    OfNote(NoteId),
    /// `created_at` strictly after the given epoch milliseconds.
    CreatedAfter(i64),
    /// `created_at` strictly before the given epoch milliseconds.
    CreatedBefore(i64),
    /// All sub-predicates hold; empty means always true.
    And(Vec<Predicate>),
    /// Any sub-predicate holds; empty means always false.
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Combines two predicates, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Combines two predicates, flattening nested disjunctions.
    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Predicate {
        Self::Not(Box::new(self))
    }

    /// Compiles this predicate into a SQL boolean expression for `T`.
    ///
    /// Positional parameters are appended to `binds` in order.
    pub(crate) fn to_sql<T: Queryable>(&self, binds: &mut Vec<Value>) -> Result<String, QueryError> {
        match self {
            Self::TitleEquals(title) => {
                let column = column_for::<T>(Field::Title)?;
                binds.push(Value::Text(title.clone()));
                Ok(format!("{column} = ?"))
            }
            Self::TitleContains(text) => {
                let column = column_for::<T>(Field::Title)?;
                binds.push(Value::Text(text.to_ascii_lowercase()));
                Ok(format!("instr(lower({column}), ?) > 0"))
            }
            Self::CommentContains(text) => {
                let column = column_for::<T>(Field::Comment)?;
                binds.push(Value::Text(text.to_ascii_lowercase()));
                Ok(format!("instr(lower(coalesce({column}, '')), ?) > 0"))
            }
            Self::InNotebook(id) => {
                let column = column_for::<T>(Field::Notebook)?;
                binds.push(Value::Text(id.to_string()));
                Ok(format!("{column} IS ?"))
            }
            Self::OfNote(id) => {
                let column = column_for::<T>(Field::Note)?;
                binds.push(Value::Text(id.to_string()));
                Ok(format!("{column} IS ?"))
            }
            Self::CreatedAfter(epoch_ms) => {
                let column = column_for::<T>(Field::CreatedAt)?;
                binds.push(Value::Integer(*epoch_ms));
                Ok(format!("{column} > ?"))
            }
            Self::CreatedBefore(epoch_ms) => {
                let column = column_for::<T>(Field::CreatedAt)?;
                binds.push(Value::Integer(*epoch_ms));
                Ok(format!("{column} < ?"))
            }
            Self::And(parts) => join_sql::<T>(parts, " AND ", "1 = 1", binds),
            Self::Or(parts) => join_sql::<T>(parts, " OR ", "1 = 0", binds),
            Self::Not(inner) => Ok(format!("NOT ({})", inner.to_sql::<T>(binds)?)),
        }
    }

    /// Evaluates this predicate against an in-memory record.
    pub(crate) fn matches<T: Queryable>(&self, record: &T) -> Result<bool, QueryError> {
        match self {
            Self::TitleEquals(title) => Ok(text_of(record, Field::Title)? == title.as_str()),
            Self::TitleContains(text) => Ok(text_of(record, Field::Title)?
                .to_ascii_lowercase()
                .contains(&text.to_ascii_lowercase())),
            Self::CommentContains(text) => Ok(text_of(record, Field::Comment)?
                .to_ascii_lowercase()
                .contains(&text.to_ascii_lowercase())),
            Self::InNotebook(id) => Ok(reference_of(record, Field::Notebook)? == Some(id.as_uuid())),
            Self::OfNote(id) => Ok(reference_of(record, Field::Note)? == Some(id.as_uuid())),
            Self::CreatedAfter(epoch_ms) => Ok(timestamp_of(record)? > *epoch_ms),
            Self::CreatedBefore(epoch_ms) => Ok(timestamp_of(record)? < *epoch_ms),
            Self::And(parts) => {
                for part in parts {
                    if !part.matches(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(parts) => {
                for part in parts {
                    if part.matches(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(inner) => Ok(!inner.matches(record)?),
        }
    }
}

fn join_sql<T: Queryable>(
    parts: &[Predicate],
    separator: &str,
    empty: &str,
    binds: &mut Vec<Value>,
) -> Result<String, QueryError> {
    if parts.is_empty() {
        return Ok(empty.to_string());
    }
    let mut clauses = Vec::with_capacity(parts.len());
    for part in parts {
        clauses.push(format!("({})", part.to_sql::<T>(binds)?));
    }
    Ok(clauses.join(separator))
}

fn column_for<T: Queryable>(field: Field) -> Result<&'static str, QueryError> {
    T::column(field).ok_or(QueryError::UnsupportedField {
        kind: T::KIND,
        field,
    })
}

fn value_of<T: Queryable>(record: &T, field: Field) -> Result<FieldValue<'_>, QueryError> {
    record.field_value(field).ok_or(QueryError::UnsupportedField {
        kind: T::KIND,
        field,
    })
}

fn text_of<T: Queryable>(record: &T, field: Field) -> Result<&str, QueryError> {
    match value_of(record, field)? {
        FieldValue::Text(value) => Ok(value),
        FieldValue::OptionalText(value) => Ok(value.unwrap_or("")),
        _ => Err(QueryError::UnsupportedField {
            kind: T::KIND,
            field,
        }),
    }
}

fn reference_of<T: Queryable>(record: &T, field: Field) -> Result<Option<Uuid>, QueryError> {
    match value_of(record, field)? {
        FieldValue::Reference(value) => Ok(value),
        _ => Err(QueryError::UnsupportedField {
            kind: T::KIND,
            field,
        }),
    }
}

fn timestamp_of<T: Queryable>(record: &T) -> Result<i64, QueryError> {
    match value_of(record, Field::CreatedAt)? {
        FieldValue::Timestamp(value) => Ok(value),
        _ => Err(QueryError::UnsupportedField {
            kind: T::KIND,
            field: Field::CreatedAt,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{Predicate, QueryError};
    use crate::model::note::Note;
    use crate::model::notebook::Notebook;
    use crate::model::photograph::Photograph;
    use crate::model::{EntityKind, NotebookId};
    use crate::query::Field;
    use rusqlite::types::Value;

    #[test]
    fn compiles_nested_predicate_with_ordered_binds() {
        let notebook_id = NotebookId::new();
        let predicate =
            Predicate::InNotebook(notebook_id).and(Predicate::TitleContains("Milk".to_string()));
        let mut binds = Vec::new();
        let sql = predicate.to_sql::<Note>(&mut binds).unwrap();

        assert_eq!(sql, "(notebook_id IS ?) AND (instr(lower(title), ?) > 0)");
        assert_eq!(
            binds,
            vec![
                Value::Text(notebook_id.to_string()),
                Value::Text("milk".to_string())
            ]
        );
    }

    #[test]
    fn empty_connectives_have_identity_semantics() {
        let notebook = Notebook::new("any", 1);
        assert!(Predicate::And(Vec::new()).matches(&notebook).unwrap());
        assert!(!Predicate::Or(Vec::new()).matches(&notebook).unwrap());

        let mut binds = Vec::new();
        assert_eq!(
            Predicate::Or(Vec::new()).to_sql::<Notebook>(&mut binds).unwrap(),
            "1 = 0"
        );
    }

    #[test]
    fn title_contains_ignores_ascii_case_in_memory() {
        let note = Note::new(NotebookId::new(), "Buy MILK", 1);
        assert!(Predicate::TitleContains("milk".to_string())
            .matches(&note)
            .unwrap());
        assert!(!Predicate::TitleEquals("buy milk".to_string())
            .matches(&note)
            .unwrap());
    }

    #[test]
    fn unowned_photograph_matches_negated_owner_filter() {
        let photo = Photograph::new(vec![1], 1).to_fault();
        let predicate = Predicate::InNotebook(NotebookId::new()).negate();
        assert!(predicate.matches(&photo).unwrap());
    }

    #[test]
    fn unsupported_field_is_reported() {
        let photo = Photograph::new(vec![1], 1).to_fault();
        let err = Predicate::TitleEquals("x".to_string())
            .matches(&photo)
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::UnsupportedField {
                kind: EntityKind::Photograph,
                field: Field::Title,
            }
        );
    }
}
