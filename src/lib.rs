//! Serialized execution queue and statement builder for embedded SQLite.
//!
//! Any number of producers submit SQL operations; a single worker thread owns
//! the only connection and executes every task strictly in submission order,
//! committing after each. A structured statement builder turns declarative
//! field/condition/ordering descriptions into parameterized SQL text plus an
//! ordered bound-value list.
//!
//! ```rust
//! use sqlite_queue::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SqliteQueueError> {
//! let queue = SqliteQueue::open_in_memory()?;
//! queue
//!     .create("stocks")
//!     .columns([("id", "INTEGER PRIMARY KEY AUTOINCREMENT"), ("price", "REAL")])?
//!     .register()?;
//! queue
//!     .insert("stocks")
//!     .data([("price", SqlValue::from(35.14))])?
//!     .register()?;
//! let rows = queue
//!     .select("stocks")
//!     .and_where(Cond::cmp("price", ">=", 30))?
//!     .fetch()
//!     .await?;
//! assert_eq!(rows.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod condition;
pub mod config;
pub mod error;
pub mod prelude;
pub mod queue;
pub mod results;
pub mod types;
pub mod worker;

pub use error::SqliteQueueError;
pub use worker::SqliteQueue;
