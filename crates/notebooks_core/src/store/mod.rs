//! Store manager: owns the store, the view context and the background path.
//!
//! # Responsibility
//! - Open the store (two connections over one SQLite file) and run migrations.
//! - Expose the foreground view context and a serial background queue.
//! - Collect committed change sets and merge them into the view context.
//! - Destroy and re-create the store on demand.
//!
//! # Invariants
//! - Background tasks run one at a time in submission order.
//! - Change sets are delivered only after their transaction committed.
//! - The view context only sees other contexts' work after it was committed.

use crate::config::StoreConfig;
use crate::context::{ChangeSet, Context, Fetchable};
use crate::db::{DbError, DbResult};
use crate::query::FetchRequest;
use crate::repo::StoreResult;
use crossbeam::channel::Receiver;
use log::{error, info};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

mod notify;
pub(crate) mod shared;
mod writer;

use shared::{ConnectionRole, StoreShared};
pub use writer::BackgroundTask;
use writer::BackgroundWriter;

const LOADER_THREAD_NAME: &str = "notebooks-loader";

/// Loads a store and coordinates its contexts.
pub struct DataController {
    config: StoreConfig,
    shared: Arc<StoreShared>,
    view: Context,
    merges: Receiver<ChangeSet>,
    writer: BackgroundWriter,
}

impl DataController {
    /// Opens (creating if needed) the store described by `config`.
    ///
    /// # Errors
    /// - `DbError::Sqlite`/`DbError::Io` when the store cannot be opened.
    /// - `DbError::UnsupportedSchemaVersion` when the file was written by a
    ///   newer build.
    pub fn load(config: StoreConfig) -> DbResult<Self> {
        let started_at = Instant::now();
        let path = config.store_path();
        info!(
            "event=store_load module=store status=start store={}",
            config.store_file_name()
        );

        let result = Self::open(config);
        match &result {
            Ok(_) => info!(
                "event=store_load module=store status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_load module=store status=error path={} duration_ms={} error={}",
                path.display(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn open(config: StoreConfig) -> DbResult<Self> {
        let shared = Arc::new(StoreShared::open(
            config.store_path(),
            config.busy_timeout(),
        )?);
        let merges = shared.notifier().subscribe();
        let writer = BackgroundWriter::start(Arc::clone(&shared))?;
        let view = Context::new(Arc::clone(&shared), ConnectionRole::View);
        Ok(Self {
            config,
            shared,
            view,
            merges,
            writer,
        })
    }

    /// Loads the store on a loader thread and hands the outcome to
    /// `completion` exactly once.
    ///
    /// # Errors
    /// - `DbError::Io` when the loader thread cannot be spawned; `completion`
    ///   is not called in that case.
    pub fn load_with<F>(config: StoreConfig, completion: F) -> DbResult<JoinHandle<()>>
    where
        F: FnOnce(DbResult<DataController>) + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(LOADER_THREAD_NAME.to_string())
            .spawn(move || completion(Self::load(config)))?;
        Ok(handle)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn store_path(&self) -> &Path {
        self.shared.path()
    }

    pub fn view_context(&self) -> &Context {
        &self.view
    }

    pub fn view_context_mut(&mut self) -> &mut Context {
        &mut self.view
    }

    /// Fetches through the view context.
    pub fn fetch<T: Fetchable>(&self, request: &FetchRequest<T>) -> StoreResult<Vec<T>> {
        self.view.fetch(request)
    }

    /// Queues `task` on the background writer with a fresh background context.
    ///
    /// The task must call `ctx.save()` itself; unsaved changes are dropped
    /// when it returns.
    ///
    /// # Errors
    /// - `StoreError::WriterStopped` when the writer thread is gone.
    pub fn perform_in_background<R, F>(&self, task: F) -> StoreResult<BackgroundTask<R>>
    where
        R: Send + 'static,
        F: FnOnce(&mut Context) -> R + Send + 'static,
    {
        self.writer.submit(task)
    }

    /// Saves the view context.
    pub fn save(&mut self) -> StoreResult<Option<ChangeSet>> {
        self.view.save()
    }

    /// Drops unsaved view changes and cached photographs.
    pub fn reset(&mut self) {
        self.view.reset();
    }

    /// Drains committed change sets and folds them into the view context.
    ///
    /// Pass the result to `FetchedResultsController::apply_merged` to update
    /// live result sets.
    pub fn merge_changes(&mut self) -> Vec<ChangeSet> {
        let changes: Vec<ChangeSet> = self.merges.try_iter().collect();
        if !changes.is_empty() {
            self.view.merge(&changes);
            info!(
                "event=merge module=store status=ok change_sets={}",
                changes.len()
            );
        }
        changes
    }

    /// Subscribes to every change set committed from now on.
    pub fn subscribe(&self) -> Receiver<ChangeSet> {
        self.shared.notifier().subscribe()
    }

    /// Destroys the store and re-creates it empty.
    ///
    /// Queued background tasks finish first. The view context is reset and
    /// a `store_reset` change set is published.
    ///
    /// # Errors
    /// - `DbError::StoreNotFound` when the store file is missing.
    /// - `DbError::Io`/`DbError::Sqlite` when files cannot be removed or the
    ///   store cannot be re-created.
    pub fn delete_store(&mut self) -> DbResult<()> {
        let started_at = Instant::now();
        info!("event=store_delete module=store status=start");

        if let Ok(barrier) = self.writer.submit(|_| ()) {
            // A panicking barrier still means the queue ahead of it drained.
            let _ = barrier.wait();
        }

        match self.shared.destroy_and_recreate() {
            Ok(()) => {
                self.view.reset();
                self.shared
                    .notifier()
                    .publish(&ChangeSet::store_reset(self.view.name()));
                info!(
                    "event=store_delete module=store status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                let error_code = match err {
                    DbError::StoreNotFound(_) => "store_not_found",
                    _ => "store_delete_failed",
                };
                error!(
                    "event=store_delete module=store status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    error_code,
                    err
                );
                Err(err)
            }
        }
    }
}
