//! Persistence core for a notebooks app: notebooks, notes and photographs in
//! one SQLite store, a foreground view context, a serial background write
//! path and live result sets fed by committed change sets.

pub mod config;
mod context;
pub mod db;
pub mod format;
pub mod logging;
pub mod model;
pub mod query;
mod repo;
pub mod service;
mod store;

pub use config::{ConfigError, StoreConfig};
pub use context::{ChangeSet, Context, EntityChanges, Fetchable};
pub use db::{DbError, DbResult};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::note::Note;
pub use model::notebook::Notebook;
pub use model::photograph::{PhotoOwner, Photograph, PhotographFault};
pub use model::{Entity, EntityKind, NoteId, NotebookId, PhotographId, ValidationError};
pub use query::{
    ChangeBatch, FetchRequest, FetchedResultsController, IndexPath, Predicate, QueryError,
    ResultsSection, RowChange, SectionChange, SectionKey, SortDescriptor, SortKey,
};
pub use repo::{StoreError, StoreResult};
pub use store::{BackgroundTask, DataController};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
