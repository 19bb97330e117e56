//! Declarative fetches and live result sets.
//!
//! # Responsibility
//! - Describe filters, orderings, limits and sectioning of a fetch.
//! - Evaluate the same filter in SQL and against in-memory staged records.
//! - Keep live result sets current and report their changes as batches.
//!
//! # Invariants
//! - SQL and in-memory evaluation of a predicate agree for every record.
//! - Insertion order is the last tie-breaker of every ordering.

mod diff;
mod predicate;
mod request;
mod results;

pub use diff::{ChangeBatch, IndexPath, RowChange, SectionChange};
pub use predicate::{Field, FieldValue, Predicate, QueryError, Queryable};
pub use request::{FetchRequest, SectionKey, SortDescriptor, SortKey};
pub use results::{FetchedResultsController, ResultsSection};
