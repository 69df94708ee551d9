//! Task model and submission validation for the serialized queue.
//!
//! The queue itself is an unbounded FIFO channel drained by the single worker
//! thread in `worker`. Submission order equals execution order equals commit
//! order; there is no priority, no dedup, and no capacity bound.

use std::sync::mpsc::Sender;

use tokio::sync::oneshot;

use crate::error::SqliteQueueError;
use crate::results::{ResultOptions, TaskResult};
use crate::types::SqlValue;

/// Parameter shape for one task.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamMode {
    /// Bare statement, no bound parameters.
    None,
    /// One ordered parameter tuple, executed once.
    Single(Vec<SqlValue>),
    /// Many ordered tuples executed against the same statement, each as an
    /// independent execution and commit.
    Batch(Vec<Vec<SqlValue>>),
}

/// How (and whether) the worker reports a task's outcome.
pub(crate) enum Respond {
    /// Fire and forget.
    Ignore,
    /// Invoked on the worker thread after commit. Skipped if execution fails.
    Callback(Box<dyn FnOnce(TaskResult) + Send>),
    /// Oneshot relay; receives the execution error as well.
    Channel(oneshot::Sender<Result<TaskResult, SqliteQueueError>>),
}

impl std::fmt::Debug for Respond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Respond::Ignore => f.write_str("Ignore"),
            Respond::Callback(_) => f.write_str("Callback"),
            Respond::Channel(_) => f.write_str("Channel"),
        }
    }
}

/// One queued unit of work: immutable once enqueued, consumed exactly once by
/// the worker, discarded after its response is delivered.
#[derive(Debug)]
pub(crate) struct Task {
    pub statement: String,
    pub params: ParamMode,
    pub options: ResultOptions,
    pub respond: Respond,
}

/// Messages on the worker channel.
#[derive(Debug)]
pub(crate) enum Command {
    Run(Task),
    Shutdown,
}

/// Producer-side handle on the FIFO. Cloned freely; the channel itself is the
/// thread-safe part.
#[derive(Clone)]
pub(crate) struct TaskSender {
    tx: Sender<Command>,
}

impl TaskSender {
    pub(crate) fn new(tx: Sender<Command>) -> Self {
        Self { tx }
    }

    /// Validate and enqueue. Validation failures surface here, at submission
    /// time, never at execution time.
    pub(crate) fn submit(&self, task: Task) -> Result<(), SqliteQueueError> {
        validate_submission(&task)?;
        tracing::debug!(statement = %task.statement, params = param_shape(&task.params), "task submitted");
        self.tx
            .send(Command::Run(task))
            .map_err(|_| SqliteQueueError::Connection("queue worker has shut down".to_owned()))
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

fn param_shape(params: &ParamMode) -> &'static str {
    match params {
        ParamMode::None => "none",
        ParamMode::Single(_) => "single",
        ParamMode::Batch(_) => "batch",
    }
}

fn validate_submission(task: &Task) -> Result<(), SqliteQueueError> {
    if task.statement.trim().is_empty() {
        return Err(SqliteQueueError::Submission(
            "statement must be non-empty SQL text".to_owned(),
        ));
    }
    if let ParamMode::Batch(tuples) = &task.params {
        if tuples.is_empty() {
            return Err(SqliteQueueError::Submission(
                "batch submission requires at least one parameter tuple".to_owned(),
            ));
        }
    }
    Ok(())
}
