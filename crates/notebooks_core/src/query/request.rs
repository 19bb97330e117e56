//! Fetch request description: filter, ordering, limit and sectioning.

use crate::format::day_key;
use crate::query::predicate::{Field, FieldValue, Predicate, QueryError, Queryable};
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Attribute a fetch can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    CreatedAt,
}

impl SortKey {
    fn field(self) -> Field {
        match self {
            Self::Title => Field::Title,
            Self::CreatedAt => Field::CreatedAt,
        }
    }
}

/// One ordering criterion; earlier descriptors take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortDescriptor {
    pub key: SortKey,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            ascending: true,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            ascending: false,
        }
    }

    pub(crate) fn compare<T: Queryable>(&self, left: &T, right: &T) -> Result<Ordering, QueryError> {
        let field = self.key.field();
        let unsupported = || QueryError::UnsupportedField {
            kind: T::KIND,
            field,
        };
        let left_value = left.field_value(field).ok_or_else(unsupported)?;
        let right_value = right.field_value(field).ok_or_else(unsupported)?;

        let ordering = match (left_value, right_value) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::OptionalText(a), FieldValue::OptionalText(b)) => a.cmp(&b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(&b),
            (FieldValue::Reference(a), FieldValue::Reference(b)) => a.cmp(&b),
            _ => Ordering::Equal,
        };

        Ok(if self.ascending {
            ordering
        } else {
            ordering.reverse()
        })
    }
}

/// Grouping applied by live result sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKey {
    /// UTC calendar day of `created_at` (`YYYY-MM-DD`).
    CreatedDay,
    /// Owning notebook id; empty name for records without one.
    Notebook,
}

impl SectionKey {
    pub(crate) fn section_name<T: Queryable>(self, record: &T) -> Result<String, QueryError> {
        let field = match self {
            Self::CreatedDay => Field::CreatedAt,
            Self::Notebook => Field::Notebook,
        };
        match record.field_value(field) {
            Some(FieldValue::Timestamp(epoch_ms)) => Ok(day_key(epoch_ms).unwrap_or_default()),
            Some(FieldValue::Reference(id)) => {
                Ok(id.map(|value| value.to_string()).unwrap_or_default())
            }
            _ => Err(QueryError::UnsupportedField {
                kind: T::KIND,
                field,
            }),
        }
    }
}

/// Declarative description of which records to fetch and in what order.
///
/// Without sort descriptors records come back in insertion order. Insertion
/// order is also the final tie-breaker after all descriptors.
pub struct FetchRequest<T> {
    predicate: Option<Predicate>,
    sort: Vec<SortDescriptor>,
    limit: Option<usize>,
    section_key: Option<SectionKey>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Queryable> FetchRequest<T> {
    /// Matches every record of `T` in insertion order.
    pub fn new() -> Self {
        Self {
            predicate: None,
            sort: Vec::new(),
            limit: None,
            section_key: None,
            _record: PhantomData,
        }
    }

    /// Adds a filter; repeated calls are combined with AND.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn sort_by(mut self, key: SortKey, ascending: bool) -> Self {
        self.sort.push(SortDescriptor { key, ascending });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sectioned_by(mut self, key: SectionKey) -> Self {
        self.section_key = Some(key);
        self
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn sort_descriptors(&self) -> &[SortDescriptor] {
        &self.sort
    }

    pub fn fetch_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn section_key(&self) -> Option<SectionKey> {
        self.section_key
    }

    /// Rejects sort descriptors on fields `T` does not have.
    pub(crate) fn validate(&self) -> Result<(), QueryError> {
        for descriptor in &self.sort {
            let field = descriptor.key.field();
            if T::column(field).is_none() {
                return Err(QueryError::UnsupportedField {
                    kind: T::KIND,
                    field,
                });
            }
        }
        Ok(())
    }
}

impl<T: Queryable> Default for FetchRequest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FetchRequest<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            sort: self.sort.clone(),
            limit: self.limit,
            section_key: self.section_key,
            _record: PhantomData,
        }
    }
}

impl<T> Debug for FetchRequest<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRequest")
            .field("predicate", &self.predicate)
            .field("sort", &self.sort)
            .field("limit", &self.limit)
            .field("section_key", &self.section_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{FetchRequest, SectionKey, SortDescriptor, SortKey};
    use crate::model::note::Note;
    use crate::model::photograph::Photograph;
    use crate::model::NotebookId;
    use crate::query::{Predicate, QueryError};
    use std::cmp::Ordering;

    #[test]
    fn repeated_filters_are_combined() {
        let request = FetchRequest::<Note>::new()
            .filter(Predicate::TitleEquals("a".to_string()))
            .filter(Predicate::CreatedAfter(5));
        assert_eq!(
            request.predicate(),
            Some(&Predicate::And(vec![
                Predicate::TitleEquals("a".to_string()),
                Predicate::CreatedAfter(5),
            ]))
        );
    }

    #[test]
    fn descending_descriptor_reverses_order() {
        let notebook_id = NotebookId::new();
        let older = Note::new(notebook_id, "a", 1);
        let newer = Note::new(notebook_id, "b", 2);
        let descriptor = SortDescriptor::descending(SortKey::CreatedAt);
        assert_eq!(
            descriptor.compare(&older, &newer).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn sorting_photographs_by_title_is_rejected() {
        let request = FetchRequest::<crate::model::photograph::PhotographFault>::new()
            .sort_by(SortKey::Title, true);
        assert!(matches!(
            request.validate(),
            Err(QueryError::UnsupportedField { .. })
        ));
    }

    #[test]
    fn notes_section_by_owning_notebook() {
        let notebook_id = NotebookId::new();
        let note = Note::new(notebook_id, "a", 0);
        assert_eq!(
            SectionKey::Notebook.section_name(&note).unwrap(),
            notebook_id.to_string()
        );
        assert_eq!(
            SectionKey::CreatedDay.section_name(&note).unwrap(),
            "1970-01-01"
        );

        let unowned = Photograph::new(vec![1], 0).to_fault();
        assert_eq!(SectionKey::Notebook.section_name(&unowned).unwrap(), "");
    }
}
