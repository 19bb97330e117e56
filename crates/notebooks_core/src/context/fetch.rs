//! Fetch overlay: persisted rows merged with a context's staged changes.

use super::staging::{Staged, Staging};
use crate::model::note::Note;
use crate::model::notebook::Notebook;
use crate::model::photograph::PhotographFault;
use crate::query::{FetchRequest, Predicate, QueryError, Queryable, SortDescriptor};
use crate::repo::{load_matching, StoreResult};
use rusqlite::Connection;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Record types a context can fetch.
///
/// Implemented for [`Notebook`], [`Note`] and [`PhotographFault`].
pub trait Fetchable: Queryable + Sized {
    #[doc(hidden)]
    fn load_persisted(
        conn: &Connection,
        predicate: Option<&Predicate>,
    ) -> StoreResult<Vec<(i64, Self)>>;

    #[doc(hidden)]
    fn staged_entries(staging: &Staging) -> Vec<(Self::Id, Staged<Self>)>;
}

impl Fetchable for Notebook {
    fn load_persisted(
        conn: &Connection,
        predicate: Option<&Predicate>,
    ) -> StoreResult<Vec<(i64, Self)>> {
        load_matching(conn, predicate)
    }

    fn staged_entries(staging: &Staging) -> Vec<(Self::Id, Staged<Self>)> {
        staging
            .notebooks
            .entries()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect()
    }
}

impl Fetchable for Note {
    fn load_persisted(
        conn: &Connection,
        predicate: Option<&Predicate>,
    ) -> StoreResult<Vec<(i64, Self)>> {
        load_matching(conn, predicate)
    }

    fn staged_entries(staging: &Staging) -> Vec<(Self::Id, Staged<Self>)> {
        staging
            .notes
            .entries()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect()
    }
}

impl Fetchable for PhotographFault {
    fn load_persisted(
        conn: &Connection,
        predicate: Option<&Predicate>,
    ) -> StoreResult<Vec<(i64, Self)>> {
        load_matching(conn, predicate)
    }

    fn staged_entries(staging: &Staging) -> Vec<(Self::Id, Staged<Self>)> {
        staging
            .photographs
            .entries()
            .map(|(id, entry)| (*id, entry.map(|photo| photo.to_fault())))
            .collect()
    }
}

/// Insertion position: persisted rows first by `rowid`, then unsaved inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RowOrder {
    Persisted(i64),
    Pending(usize),
}

/// Applies `staging` on top of `persisted`, then filters, sorts and limits.
pub(super) fn overlay<T: Fetchable>(
    persisted: Vec<(i64, T)>,
    staging: &Staging,
    request: &FetchRequest<T>,
) -> StoreResult<Vec<T>> {
    let staged: HashMap<T::Id, Staged<T>> = T::staged_entries(staging).into_iter().collect();
    let predicate = request.predicate();
    let matches = |record: &T| -> Result<bool, QueryError> {
        predicate.map_or(Ok(true), |predicate| predicate.matches(record))
    };

    let mut rows: Vec<(RowOrder, T)> = Vec::with_capacity(persisted.len());
    let mut replaced: HashSet<T::Id> = HashSet::new();

    for (row_order, record) in persisted {
        let id = record.id();
        match staged.get(&id) {
            None => rows.push((RowOrder::Persisted(row_order), record)),
            Some(Staged::Updated {
                row_order,
                record: staged_record,
            }) => {
                replaced.insert(id);
                if matches(staged_record)? {
                    rows.push((RowOrder::Persisted(*row_order), staged_record.clone()));
                }
            }
            Some(Staged::Deleted) | Some(Staged::Inserted { .. }) => {}
        }
    }

    for (id, entry) in &staged {
        match entry {
            Staged::Updated { row_order, record } if !replaced.contains(id) => {
                if matches(record)? {
                    rows.push((RowOrder::Persisted(*row_order), record.clone()));
                }
            }
            Staged::Inserted { ordinal, record } => {
                if matches(record)? {
                    rows.push((RowOrder::Pending(*ordinal), record.clone()));
                }
            }
            _ => {}
        }
    }

    sort_rows(&mut rows, request.sort_descriptors())?;

    let mut records: Vec<T> = rows.into_iter().map(|(_, record)| record).collect();
    if let Some(limit) = request.fetch_limit() {
        records.truncate(limit);
    }
    Ok(records)
}

fn sort_rows<T: Queryable>(
    rows: &mut [(RowOrder, T)],
    descriptors: &[SortDescriptor],
) -> Result<(), QueryError> {
    let mut failure: Option<QueryError> = None;
    rows.sort_by(|(left_order, left), (right_order, right)| {
        for descriptor in descriptors {
            match descriptor.compare(left, right) {
                Ok(Ordering::Equal) => continue,
                Ok(ordering) => return ordering,
                Err(err) => {
                    failure.get_or_insert(err);
                    return Ordering::Equal;
                }
            }
        }
        left_order.cmp(right_order)
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
