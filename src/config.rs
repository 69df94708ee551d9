use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SqliteQueueError;
use crate::worker::SqliteQueue;

/// Options for opening a queue.
///
/// ```rust
/// use sqlite_queue::config::QueueConfig;
///
/// let queue = QueueConfig::in_memory()
///     .pragmas("PRAGMA journal_mode = WAL;")
///     .open()
///     .unwrap();
/// # let _ = queue;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Database file path; `None` means a private in-memory database.
    pub db_path: Option<PathBuf>,
    /// Optional pragma batch run once on the worker connection before any
    /// task executes.
    pub pragmas: Option<String>,
}

impl QueueConfig {
    /// Configuration for a file-backed database.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(path.into()),
            pragmas: None,
        }
    }

    /// Configuration for a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Set the pragma batch to run at open time.
    #[must_use]
    pub fn pragmas(mut self, sql: impl Into<String>) -> Self {
        self.pragmas = Some(sql.into());
        self
    }

    /// Open the queue described by this configuration.
    ///
    /// # Errors
    /// Returns [`SqliteQueueError`] if the database cannot be opened, a
    /// pragma fails, or the worker thread cannot be spawned.
    pub fn open(self) -> Result<SqliteQueue, SqliteQueueError> {
        SqliteQueue::open_with(self)
    }
}
