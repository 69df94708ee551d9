//! The execution worker: one dedicated thread owns the only database
//! connection for the queue's lifetime and drains submitted tasks in strict
//! FIFO order, committing after each.
//!
//! No other component ever touches the connection. Producers hold cheaply
//! clonable [`SqliteQueue`] handles; dropping the last handle sends a shutdown
//! marker so the thread exits.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use rusqlite::{Connection, ToSql};
use tokio::sync::oneshot;

use crate::builder::{StatementBuilder, StatementKind};
use crate::config::QueueConfig;
use crate::error::SqliteQueueError;
use crate::queue::{Command, ParamMode, Respond, Task, TaskSender};
use crate::results::{ResultOptions, ResultSet, TaskResult};
use crate::types::SqlValue;

/// Handle on the serialized queue. Clone freely; all clones feed the same
/// worker and the same connection.
#[derive(Clone)]
pub struct SqliteQueue {
    core: Arc<QueueCore>,
}

struct QueueCore {
    sender: TaskSender,
}

impl Drop for QueueCore {
    fn drop(&mut self) {
        self.sender.shutdown();
    }
}

impl fmt::Debug for SqliteQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteQueue").finish_non_exhaustive()
    }
}

impl SqliteQueue {
    /// Open a queue over the database file at `path`.
    ///
    /// # Errors
    /// Returns [`SqliteQueueError`] if the database cannot be opened or the
    /// worker thread cannot be spawned.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteQueueError> {
        Self::open_with(QueueConfig::file(path.as_ref()))
    }

    /// Open a queue over a private in-memory database.
    ///
    /// # Errors
    /// Returns [`SqliteQueueError`] if the worker thread cannot be spawned.
    pub fn open_in_memory() -> Result<Self, SqliteQueueError> {
        Self::open_with(QueueConfig::in_memory())
    }

    /// Open a queue from a full [`QueueConfig`].
    ///
    /// The connection is opened and any configured pragmas run before the
    /// first task is accepted, so configuration failures surface here.
    ///
    /// # Errors
    /// Returns [`SqliteQueueError`] if the database cannot be opened, a
    /// pragma fails, or the worker thread cannot be spawned.
    pub fn open_with(config: QueueConfig) -> Result<Self, SqliteQueueError> {
        let conn = match &config.db_path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        if let Some(pragmas) = &config.pragmas {
            conn.execute_batch(pragmas)?;
        }

        let (tx, rx) = mpsc::channel::<Command>();
        thread::Builder::new()
            .name("sqlite-queue-worker".to_owned())
            .spawn(move || run_worker(conn, &rx))
            .map_err(|err| {
                SqliteQueueError::Connection(format!("failed to spawn worker thread: {err}"))
            })?;

        Ok(Self {
            core: Arc::new(QueueCore {
                sender: TaskSender::new(tx),
            }),
        })
    }

    /// Submit raw SQL, fire-and-forget.
    ///
    /// # Errors
    /// Returns [`SqliteQueueError::Submission`] for an invalid submission
    /// shape, or [`SqliteQueueError::Connection`] if the worker is gone.
    pub fn submit_raw(
        &self,
        sql: impl Into<String>,
        params: ParamMode,
    ) -> Result<(), SqliteQueueError> {
        self.submit_task(sql.into(), params, ResultOptions::default(), Respond::Ignore)
    }

    /// Submit raw SQL with a callback invoked on the worker thread after the
    /// task commits, carrying exactly the result fields `options` requests.
    /// If execution fails the callback is skipped and the failure is logged.
    ///
    /// # Errors
    /// Same failures as [`SqliteQueue::submit_raw`].
    pub fn submit_with<F>(
        &self,
        sql: impl Into<String>,
        params: ParamMode,
        options: ResultOptions,
        callback: F,
    ) -> Result<(), SqliteQueueError>
    where
        F: FnOnce(TaskResult) + Send + 'static,
    {
        self.submit_task(
            sql.into(),
            params,
            options,
            Respond::Callback(Box::new(callback)),
        )
    }

    /// Submit raw SQL and await its result. Execution errors are relayed back
    /// to the caller instead of being dropped.
    ///
    /// # Errors
    /// Returns the execution error if the statement fails, or
    /// [`SqliteQueueError::Connection`] if the worker is gone.
    pub async fn submit_wait(
        &self,
        sql: impl Into<String>,
        params: ParamMode,
        options: ResultOptions,
    ) -> Result<TaskResult, SqliteQueueError> {
        let (tx, rx) = oneshot::channel();
        self.submit_task(sql.into(), params, options, Respond::Channel(tx))?;
        rx.await.map_err(|_| {
            SqliteQueueError::Connection("worker dropped while executing task".to_owned())
        })?
    }

    pub(crate) fn submit_task(
        &self,
        statement: String,
        params: ParamMode,
        options: ResultOptions,
        respond: Respond,
    ) -> Result<(), SqliteQueueError> {
        self.core.sender.submit(Task {
            statement,
            params,
            options,
            respond,
        })
    }

    /// SELECT builder bound to this queue.
    #[must_use]
    pub fn select(&self, table: impl Into<String>) -> StatementBuilder {
        StatementBuilder::new(StatementKind::Select, table).bind(self.clone())
    }

    /// INSERT builder bound to this queue.
    #[must_use]
    pub fn insert(&self, table: impl Into<String>) -> StatementBuilder {
        StatementBuilder::new(StatementKind::Insert, table).bind(self.clone())
    }

    /// UPDATE builder bound to this queue.
    #[must_use]
    pub fn update(&self, table: impl Into<String>) -> StatementBuilder {
        StatementBuilder::new(StatementKind::Update, table).bind(self.clone())
    }

    /// DELETE builder bound to this queue.
    #[must_use]
    pub fn delete(&self, table: impl Into<String>) -> StatementBuilder {
        StatementBuilder::new(StatementKind::Delete, table).bind(self.clone())
    }

    /// CREATE TABLE builder bound to this queue.
    #[must_use]
    pub fn create(&self, table: impl Into<String>) -> StatementBuilder {
        StatementBuilder::new(StatementKind::Create, table).bind(self.clone())
    }

    /// DROP TABLE builder bound to this queue.
    #[must_use]
    pub fn drop_table(&self, table: impl Into<String>) -> StatementBuilder {
        StatementBuilder::new(StatementKind::Drop, table).bind(self.clone())
    }
}

/// Drain loop. Strict FIFO: submission order equals execution order equals
/// commit order. A failed task is logged and the queue keeps draining.
fn run_worker(mut conn: Connection, receiver: &Receiver<Command>) {
    while let Ok(command) = receiver.recv() {
        match command {
            Command::Run(task) => {
                let Task {
                    statement,
                    params,
                    options,
                    respond,
                } = task;
                let outcome = execute_task(&mut conn, &statement, &params, options);
                match (outcome, respond) {
                    (Ok(result), Respond::Callback(callback)) => callback(result),
                    (Ok(result), Respond::Channel(tx)) => {
                        let _ = tx.send(Ok(result));
                    }
                    (Ok(_), Respond::Ignore) => {}
                    (Err(err), respond) => {
                        tracing::error!(statement = %statement, error = %err, "task execution failed; continuing");
                        if let Respond::Channel(tx) = respond {
                            let _ = tx.send(Err(err));
                        }
                    }
                }
            }
            Command::Shutdown => break,
        }
    }
}

fn execute_task(
    conn: &mut Connection,
    sql: &str,
    params: &ParamMode,
    options: ResultOptions,
) -> Result<TaskResult, SqliteQueueError> {
    match params {
        ParamMode::None => execute_once(conn, sql, &[], options),
        ParamMode::Single(tuple) => execute_once(conn, sql, tuple, options),
        ParamMode::Batch(tuples) => {
            // Each tuple is an independent execution and commit; a failure
            // stops the batch and earlier tuples stay committed.
            let mut last = TaskResult::default();
            let mut total = 0usize;
            for tuple in tuples {
                last = execute_once(conn, sql, tuple, options)?;
                total += last.rowcount.unwrap_or(0);
            }
            if options.rowcount {
                last.rowcount = Some(total);
            }
            Ok(last)
        }
    }
}

/// One statement, one transaction, one commit.
fn execute_once(
    conn: &mut Connection,
    sql: &str,
    params: &[SqlValue],
    options: ResultOptions,
) -> Result<TaskResult, SqliteQueueError> {
    let values: Vec<rusqlite::types::Value> = params.iter().map(SqlValue::to_sqlite).collect();
    let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();

    let tx = conn.transaction()?;
    let mut result = TaskResult::default();
    let returns_rows;
    {
        let mut stmt = tx.prepare(sql)?;
        returns_rows = stmt.column_count() > 0;
        if returns_rows {
            let rows = build_result_set(&mut stmt, &param_refs)?;
            if options.data {
                result.data = Some(rows);
            }
            if options.rowcount {
                result.rowcount = Some(0);
            }
        } else {
            let affected = stmt.execute(&param_refs[..])?;
            if options.rowcount {
                result.rowcount = Some(affected);
            }
            if options.data {
                result.data = Some(ResultSet::default());
            }
        }
    }
    if options.last_insert_id {
        // A statement that produces rows has no notion of a last id.
        result.last_insert_id = Some(if returns_rows {
            -1
        } else {
            tx.last_insert_rowid()
        });
    }
    tx.commit()?;
    Ok(result)
}

/// Run a row-producing statement and collect every row.
fn build_result_set(
    stmt: &mut rusqlite::Statement<'_>,
    params: &[&dyn ToSql],
) -> Result<ResultSet, SqliteQueueError> {
    let column_names: Arc<Vec<String>> = Arc::new(
        stmt.column_names()
            .iter()
            .map(ToString::to_string)
            .collect(),
    );
    let col_count = column_names.len();

    let mut rows_iter = stmt.query(params)?;
    let mut result_set = ResultSet::new(column_names);
    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            let value: rusqlite::types::Value = row.get(i)?;
            values.push(SqlValue::from_sqlite(value));
        }
        result_set.push_values(values);
    }
    Ok(result_set)
}
