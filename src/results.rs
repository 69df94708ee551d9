use std::sync::Arc;

use crate::types::SqlValue;

/// A single row from a query result, with access to column names and values.
#[derive(Debug, Clone, PartialEq)]
pub struct DbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row, in column order
    pub values: Vec<SqlValue>,
}

impl DbRow {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        Self {
            column_names,
            values,
        }
    }

    /// Get the index of a column by name.
    #[must_use]
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }
}

/// All rows returned by one statement, collected by the worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    column_names: Arc<Vec<String>>,
    /// The rows returned by the statement
    pub rows: Vec<DbRow>,
}

impl ResultSet {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>) -> Self {
        Self {
            column_names,
            rows: Vec::new(),
        }
    }

    /// The column names shared by every row in this set.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row sharing this set's column names.
    pub(crate) fn push_values(&mut self, values: Vec<SqlValue>) {
        self.rows
            .push(DbRow::new(Arc::clone(&self.column_names), values));
    }
}

/// Which result fields a submitter wants back from the worker.
///
/// Replaces the legacy introspection of a callback's declared parameter names:
/// the caller states up front which of the three fields to populate, and
/// anything not requested stays `None` in [`TaskResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultOptions {
    /// Collect all result rows into a [`ResultSet`]
    pub data: bool,
    /// Report the affected-row count. Row-producing statements have no
    /// notion of affected rows and report `0` (the count is unsigned, so
    /// there is no `-1` sentinel here).
    pub rowcount: bool,
    /// Report the last inserted row id (`-1` for statements without one)
    pub last_insert_id: bool,
}

impl ResultOptions {
    /// Request every result field.
    #[must_use]
    pub fn all() -> Self {
        Self {
            data: true,
            rowcount: true,
            last_insert_id: true,
        }
    }

    /// Request only the result rows.
    #[must_use]
    pub fn rows() -> Self {
        Self {
            data: true,
            ..Self::default()
        }
    }

    /// Request only the affected-row count.
    #[must_use]
    pub fn rowcount() -> Self {
        Self {
            rowcount: true,
            ..Self::default()
        }
    }

    /// Request only the last inserted row id.
    #[must_use]
    pub fn last_insert_id() -> Self {
        Self {
            last_insert_id: true,
            ..Self::default()
        }
    }
}

/// What the worker hands back after a task commits.
///
/// Fields the submitter did not request stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskResult {
    /// All rows the statement produced, if requested
    pub data: Option<ResultSet>,
    /// Affected-row count, if requested; `0` for row-producing statements
    pub rowcount: Option<usize>,
    /// Last inserted row id, if requested; `-1` when the statement has no
    /// notion of one (SELECT and DDL)
    pub last_insert_id: Option<i64>,
}
