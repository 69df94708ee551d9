use thiserror::Error;

/// Errors raised by the queue, the statement builder, and the condition grammar.
///
/// Every variant is fatal to the operation it applies to; nothing is retried
/// and nothing is silently dropped.
#[derive(Debug, Error)]
pub enum SqliteQueueError {
    /// The underlying engine rejected a statement.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Malformed builder or grammar input, detected before any SQL is produced.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid submission shape, detected at submission time.
    #[error("Submission error: {0}")]
    Submission(String),

    /// Execution-path failure that is not a driver error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Worker spawn or connection failure, or a closed queue.
    #[error("Connection error: {0}")]
    Connection(String),
}
