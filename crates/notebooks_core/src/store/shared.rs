//! Connections and notifier shared by every context of one store.

use crate::db::{open_db, remove_store_files, DbError, DbResult};
use crate::store::notify::ChangeNotifier;
use log::{error, warn};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Which store connection a context reads and writes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionRole {
    View,
    Background,
}

impl ConnectionRole {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Background => "background",
        }
    }
}

pub(crate) struct StoreShared {
    path: PathBuf,
    busy_timeout: Duration,
    view: Mutex<Connection>,
    writer: Mutex<Connection>,
    notifier: ChangeNotifier,
}

impl StoreShared {
    pub(crate) fn open(path: PathBuf, busy_timeout: Duration) -> DbResult<Self> {
        let view = open_db(&path, busy_timeout)?;
        let writer = open_db(&path, busy_timeout)?;
        Ok(Self {
            path,
            busy_timeout,
            view: Mutex::new(view),
            writer: Mutex::new(writer),
            notifier: ChangeNotifier::default(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Locks one connection. A poisoned lock is recovered: the connection
    /// itself stays consistent because every write runs in a transaction.
    pub(crate) fn lock_connection(&self, role: ConnectionRole) -> MutexGuard<'_, Connection> {
        let mutex = match role {
            ConnectionRole::View => &self.view,
            ConnectionRole::Background => &self.writer,
        };
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Closes both connections, removes the store files and opens a fresh,
    /// empty store at the same path.
    ///
    /// When removal or the fresh open fails, the connections are reopened on
    /// whatever is left at the path and the original error is returned. If
    /// that reopen fails as well, the store handle is unusable and must be
    /// dropped.
    ///
    /// The caller must make sure no background task is running.
    pub(crate) fn destroy_and_recreate(&self) -> DbResult<()> {
        self.destroy_and_recreate_with(remove_store_files)
    }

    fn destroy_and_recreate_with(
        &self,
        remove_files: impl FnOnce(&Path) -> DbResult<()>,
    ) -> DbResult<()> {
        if !self.path.exists() {
            return Err(DbError::StoreNotFound(self.path.clone()));
        }

        let mut view = self.lock_connection(ConnectionRole::View);
        let mut writer = self.lock_connection(ConnectionRole::Background);

        for (role, slot) in [
            (ConnectionRole::View, &mut *view),
            (ConnectionRole::Background, &mut *writer),
        ] {
            let placeholder = Connection::open_in_memory()?;
            let previous = std::mem::replace(slot, placeholder);
            if let Err((_, err)) = previous.close() {
                warn!(
                    "event=store_delete module=store status=warn connection={} error={}",
                    role.name(),
                    err
                );
            }
        }

        let recreated =
            remove_files(&self.path).and_then(|()| self.reopen(&mut view, &mut writer));
        if let Err(err) = recreated {
            if let Err(reopen_err) = self.reopen(&mut view, &mut writer) {
                error!(
                    "event=store_delete module=store status=error error_code=store_reopen_failed error={}",
                    reopen_err
                );
            }
            return Err(err);
        }
        Ok(())
    }

    fn reopen(&self, view: &mut Connection, writer: &mut Connection) -> DbResult<()> {
        *view = open_db(&self.path, self.busy_timeout)?;
        *writer = open_db(&self.path, self.busy_timeout)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionRole, StoreShared};
    use crate::db::{DbError, DEFAULT_BUSY_TIMEOUT};

    fn notebook_count(shared: &StoreShared, role: ConnectionRole) -> i64 {
        shared
            .lock_connection(role)
            .query_row("SELECT COUNT(*) FROM notebooks;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn failed_removal_reopens_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let shared =
            StoreShared::open(dir.path().join("Notebooks.sqlite"), DEFAULT_BUSY_TIMEOUT).unwrap();
        shared
            .lock_connection(ConnectionRole::View)
            .execute(
                "INSERT INTO notebooks (id, title, created_at) VALUES ('n1', 'kept', 0);",
                [],
            )
            .unwrap();

        let err = shared
            .destroy_and_recreate_with(|_| {
                Err(DbError::Io(std::io::Error::other("removal refused")))
            })
            .unwrap_err();

        assert!(matches!(err, DbError::Io(_)));
        assert_eq!(notebook_count(&shared, ConnectionRole::View), 1);
        assert_eq!(notebook_count(&shared, ConnectionRole::Background), 1);
    }

    #[test]
    fn recreate_leaves_empty_schema_on_both_connections() {
        let dir = tempfile::tempdir().unwrap();
        let shared =
            StoreShared::open(dir.path().join("Notebooks.sqlite"), DEFAULT_BUSY_TIMEOUT).unwrap();
        shared
            .lock_connection(ConnectionRole::Background)
            .execute(
                "INSERT INTO notebooks (id, title, created_at) VALUES ('n1', 'gone', 0);",
                [],
            )
            .unwrap();

        shared.destroy_and_recreate().unwrap();

        assert_eq!(notebook_count(&shared, ConnectionRole::View), 0);
        assert_eq!(notebook_count(&shared, ConnectionRole::Background), 0);
    }
}
