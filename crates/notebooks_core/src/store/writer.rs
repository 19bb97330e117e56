//! Serial background writer thread.
//!
//! Jobs run strictly in submission order on one dedicated thread, each with a
//! fresh background `Context` bound to the writer connection.

use crate::context::Context;
use crate::repo::{StoreError, StoreResult};
use crate::store::shared::{ConnectionRole, StoreShared};
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

type Job = Box<dyn FnOnce(&Arc<StoreShared>) + Send>;

const WRITER_THREAD_NAME: &str = "notebooks-writer";

pub(crate) struct BackgroundWriter {
    sender: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    next_task_id: AtomicU64,
}

impl BackgroundWriter {
    pub(crate) fn start(shared: Arc<StoreShared>) -> std::io::Result<Self> {
        let (sender, receiver) = unbounded::<Job>();
        let handle = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || {
                for job in receiver {
                    job(&shared);
                }
            })?;
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            next_task_id: AtomicU64::new(1),
        })
    }

    /// Queues `task` behind every previously submitted task.
    pub(crate) fn submit<R, F>(&self, task: F) -> StoreResult<BackgroundTask<R>>
    where
        R: Send + 'static,
        F: FnOnce(&mut Context) -> R + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(StoreError::WriterStopped)?;
        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let (result_sender, result_receiver) = bounded::<R>(1);

        let job: Job = Box::new(move |shared| {
            let started_at = Instant::now();
            debug!("event=bg_task module=store status=start task_id={task_id}");

            let mut ctx = Context::new(Arc::clone(shared), ConnectionRole::Background);
            match catch_unwind(AssertUnwindSafe(|| task(&mut ctx))) {
                Ok(result) => {
                    if ctx.has_changes() {
                        warn!(
                            "event=bg_task module=store status=warn task_id={task_id} unsaved_changes_discarded=true"
                        );
                    }
                    debug!(
                        "event=bg_task module=store status=ok task_id={task_id} duration_ms={}",
                        started_at.elapsed().as_millis()
                    );
                    // The submitter may have dropped its handle.
                    let _ = result_sender.send(result);
                }
                Err(_) => {
                    error!(
                        "event=bg_task module=store status=error task_id={task_id} duration_ms={} error_code=task_panicked",
                        started_at.elapsed().as_millis()
                    );
                }
            }
        });

        sender.send(job).map_err(|_| StoreError::WriterStopped)?;
        Ok(BackgroundTask {
            receiver: result_receiver,
        })
    }
}

impl Drop for BackgroundWriter {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain queued jobs and exit.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("event=bg_writer_stop module=store status=error error_code=writer_panicked");
            }
        }
    }
}

/// Handle to the result of a queued background task.
#[must_use = "dropping the handle does not cancel the task"]
pub struct BackgroundTask<R> {
    receiver: Receiver<R>,
}

impl<R> BackgroundTask<R> {
    /// Blocks until the task has run and returns its result.
    ///
    /// # Errors
    /// - `StoreError::TaskAborted` when the task panicked.
    pub fn wait(self) -> StoreResult<R> {
        self.receiver.recv().map_err(|_| StoreError::TaskAborted)
    }

    /// Returns the result if the task already finished.
    pub fn try_result(&self) -> Option<R> {
        self.receiver.try_recv().ok()
    }
}
