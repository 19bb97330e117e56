//! SQL persistence for notebooks, notes and photographs.
//!
//! # Responsibility
//! - Map records to and from SQLite rows.
//! - Compile fetch predicates into parameterized SQL.
//! - Provide the statement-level writes replayed by `Context::save`.
//!
//! # Invariants
//! - Persisted rows come back in insertion (`rowid`) order; callers sort.
//! - Read paths reject malformed persisted ids instead of masking them.
//! - Nothing here opens transactions; the caller owns atomicity.

use crate::db::DbError;
use crate::model::{EntityKind, ValidationError};
use crate::query::{Predicate, QueryError, Queryable};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub(crate) mod note_repo;
pub(crate) mod notebook_repo;
pub(crate) mod photograph_repo;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by contexts, fetches and the store manager.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Query(QueryError),
    Validation(ValidationError),
    NotFound { kind: EntityKind, id: Uuid },
    InvalidData(String),
    /// The background writer thread is gone; queued work cannot run.
    WriterStopped,
    /// A background task panicked before producing a result.
    TaskAborted,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::WriterStopped => write!(f, "background writer is not running"),
            Self::TaskAborted => write!(f, "background task aborted"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Query(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
            Self::WriterStopped | Self::TaskAborted => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<QueryError> for StoreError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Row mapping for a record type that fetches can load.
pub(crate) trait SqlRecord: Queryable + Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> StoreResult<Self>;
}

/// Loads persisted rows of `T` matching `predicate`, paired with their `rowid`.
pub(crate) fn load_matching<T: SqlRecord>(
    conn: &Connection,
    predicate: Option<&Predicate>,
) -> StoreResult<Vec<(i64, T)>> {
    let mut sql = format!(
        "SELECT rowid AS row_order, {} FROM {}",
        T::COLUMNS,
        T::TABLE
    );
    let mut binds = Vec::new();
    if let Some(predicate) = predicate {
        sql.push_str(" WHERE ");
        sql.push_str(&predicate.to_sql::<T>(&mut binds)?);
    }
    sql.push_str(" ORDER BY rowid ASC;");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(binds))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let row_order: i64 = row.get("row_order")?;
        records.push((row_order, T::from_row(row)?));
    }
    Ok(records)
}

/// Returns the `rowid` of one persisted record, or `None` when absent.
pub(crate) fn row_order_of(conn: &Connection, table: &str, id: Uuid) -> StoreResult<Option<i64>> {
    let row_order = conn
        .query_row(
            &format!("SELECT rowid FROM {table} WHERE id = ?1;"),
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(row_order)
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(value: Option<String>, column: &str) -> StoreResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}
