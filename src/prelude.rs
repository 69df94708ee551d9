//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types
//! to make it easier to get started with the library.

pub use crate::builder::{StatementBuilder, StatementKind};
pub use crate::condition::{Cond, CondValue, Conjunction};
pub use crate::config::QueueConfig;
pub use crate::error::SqliteQueueError;
pub use crate::queue::ParamMode;
pub use crate::results::{DbRow, ResultOptions, ResultSet, TaskResult};
pub use crate::types::{QueryAndParams, SqlValue};
pub use crate::worker::SqliteQueue;
