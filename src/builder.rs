//! Statement builder: accumulates a statement's shape declaratively and
//! compiles it to parameterized SQL text plus ordered bound values.
//!
//! One builder per logical statement. Builders are never shared across
//! threads; every mutating call consumes the builder and returns
//! `Result<Self>`, so malformed input fails at the offending call rather than
//! at execution time.

use std::sync::Arc;

use crate::condition::{Cond, Conjunction, check_ident, placeholders, quote_ident};
use crate::error::SqliteQueueError;
use crate::queue::{ParamMode, Respond};
use crate::results::{ResultOptions, ResultSet, TaskResult};
use crate::types::{QueryAndParams, SqlValue};
use crate::worker::SqliteQueue;

/// The statement's method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    /// Always fails at finalize; SQLite has no TRUNCATE.
    Truncate,
}

/// A field, ordering, or grouping specification.
///
/// Explicitly tagged: the caller decides whether text is raw SQL or a set of
/// names to quote, nothing is inferred from the string's shape.
#[derive(Debug, Clone, PartialEq)]
enum ClauseSpec {
    /// Passed through unescaped.
    Raw(String),
    /// Names, individually backtick-quoted.
    Names(Vec<String>),
    /// Name plus optional suffix: an alias for fields, a direction for
    /// ordering. `None` emits no suffix.
    Suffixed(Vec<(String, Option<String>)>),
}

/// The statement's target: a plain name to quote, or a raw table expression
/// (a join, an already-quoted name) passed through unescaped.
#[derive(Debug, Clone, PartialEq)]
enum TableSpec {
    Name(String),
    Raw(String),
}

impl TableSpec {
    fn render(&self) -> Result<String, SqliteQueueError> {
        match self {
            TableSpec::Name(name) => {
                check_ident(name)?;
                Ok(quote_ident(name))
            }
            TableSpec::Raw(sql) => Ok(sql.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SuffixStyle {
    /// `` `name` AS `alias` ``
    Alias,
    /// `` `name` DESC ``
    Direction,
}

#[derive(Debug, Clone, PartialEq)]
enum Payload {
    None,
    /// Ordered field -> value mapping for INSERT/UPDATE.
    Row(Vec<(String, SqlValue)>),
    /// List payload: INSERT batch mode, one statement per row.
    Batch(Vec<Vec<(String, SqlValue)>>),
    /// Ordered column -> type-definition mapping for CREATE.
    Columns(Vec<(String, String)>),
}

/// Builder for one statement. Obtain one from the queue's entry points
/// ([`SqliteQueue::select`] and friends) or, for pure SQL generation, from the
/// free constructors here.
#[derive(Debug)]
pub struct StatementBuilder {
    kind: StatementKind,
    table: TableSpec,
    fields: Option<ClauseSpec>,
    where_cond: Option<Cond>,
    having_cond: Option<Cond>,
    order: Option<ClauseSpec>,
    group: Option<ClauseSpec>,
    limit: Option<(i64, i64)>,
    distinct: bool,
    payload: Payload,
    raw: Option<(String, ParamMode)>,
    queue: Option<SqliteQueue>,
}

impl StatementBuilder {
    pub(crate) fn new(kind: StatementKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: TableSpec::Name(table.into()),
            fields: None,
            where_cond: None,
            having_cond: None,
            order: None,
            group: None,
            limit: None,
            distinct: false,
            payload: Payload::None,
            raw: None,
            queue: None,
        }
    }

    pub(crate) fn bind(mut self, queue: SqliteQueue) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Unbound SELECT builder (compiles SQL but cannot `register`).
    pub fn select(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Select, table)
    }

    /// Unbound INSERT builder.
    pub fn insert(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Insert, table)
    }

    /// Unbound UPDATE builder.
    pub fn update(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Update, table)
    }

    /// Unbound DELETE builder.
    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Delete, table)
    }

    /// Unbound CREATE TABLE builder.
    pub fn create(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Create, table)
    }

    /// Unbound DROP TABLE builder.
    pub fn drop_table(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Drop, table)
    }

    /// Unbound TRUNCATE builder; finalize always fails.
    pub fn truncate(table: impl Into<String>) -> Self {
        Self::new(StatementKind::Truncate, table)
    }

    /// Reject structural calls once the raw-SQL escape hatch has been used.
    fn structural(&self) -> Result<(), SqliteQueueError> {
        if self.raw.is_some() {
            return Err(SqliteQueueError::Validation(
                "builder was overridden with raw SQL; no structural calls permitted".to_owned(),
            ));
        }
        Ok(())
    }

    /// Select these fields, each backtick-quoted.
    pub fn fields<S, I>(mut self, names: I) -> Result<Self, SqliteQueueError>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.structural()?;
        self.fields = Some(ClauseSpec::Names(names.into_iter().map(Into::into).collect()));
        Ok(self)
    }

    /// Select a raw field list, passed through unescaped.
    pub fn fields_raw(mut self, sql: impl Into<String>) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        self.fields = Some(ClauseSpec::Raw(sql.into()));
        Ok(self)
    }

    /// Replace the table with a raw table expression, passed through
    /// unescaped: a join, an alias, an already-quoted name.
    pub fn table_raw(mut self, sql: impl Into<String>) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        self.table = TableSpec::Raw(sql.into());
        Ok(self)
    }

    /// Select fields with optional aliases; `None` emits no `AS` suffix.
    pub fn fields_aliased<S, A, I>(mut self, pairs: I) -> Result<Self, SqliteQueueError>
    where
        S: Into<String>,
        A: Into<String>,
        I: IntoIterator<Item = (S, Option<A>)>,
    {
        self.structural()?;
        self.fields = Some(ClauseSpec::Suffixed(
            pairs
                .into_iter()
                .map(|(name, suffix)| (name.into(), suffix.map(Into::into)))
                .collect(),
        ));
        Ok(self)
    }

    /// AND a condition onto the accumulated WHERE. The first call on an empty
    /// accumulated condition just sets it.
    pub fn and_where(mut self, cond: impl Into<Cond>) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        let cond = cond.into();
        cond.validate()?;
        self.where_cond = Some(merge(self.where_cond.take(), Conjunction::And, cond));
        Ok(self)
    }

    /// OR a condition onto the accumulated WHERE.
    pub fn or_where(mut self, cond: impl Into<Cond>) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        let cond = cond.into();
        cond.validate()?;
        self.where_cond = Some(merge(self.where_cond.take(), Conjunction::Or, cond));
        Ok(self)
    }

    /// AND a condition onto the accumulated HAVING.
    pub fn and_having(mut self, cond: impl Into<Cond>) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        let cond = cond.into();
        cond.validate()?;
        self.having_cond = Some(merge(self.having_cond.take(), Conjunction::And, cond));
        Ok(self)
    }

    /// OR a condition onto the accumulated HAVING.
    pub fn or_having(mut self, cond: impl Into<Cond>) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        let cond = cond.into();
        cond.validate()?;
        self.having_cond = Some(merge(self.having_cond.take(), Conjunction::Or, cond));
        Ok(self)
    }

    /// Order by these fields, ascending.
    pub fn order_by<S, I>(mut self, names: I) -> Result<Self, SqliteQueueError>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.structural()?;
        self.order = Some(ClauseSpec::Names(names.into_iter().map(Into::into).collect()));
        Ok(self)
    }

    /// Order by fields with optional directions (`"DESC"`/`"ASC"`).
    pub fn order_by_dir<S, D, I>(mut self, pairs: I) -> Result<Self, SqliteQueueError>
    where
        S: Into<String>,
        D: Into<String>,
        I: IntoIterator<Item = (S, Option<D>)>,
    {
        self.structural()?;
        self.order = Some(ClauseSpec::Suffixed(
            pairs
                .into_iter()
                .map(|(name, dir)| (name.into(), dir.map(Into::into)))
                .collect(),
        ));
        Ok(self)
    }

    /// Raw ORDER BY clause body, passed through unescaped.
    pub fn order_by_raw(mut self, sql: impl Into<String>) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        self.order = Some(ClauseSpec::Raw(sql.into()));
        Ok(self)
    }

    /// Group by these fields.
    pub fn group_by<S, I>(mut self, names: I) -> Result<Self, SqliteQueueError>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.structural()?;
        self.group = Some(ClauseSpec::Names(names.into_iter().map(Into::into).collect()));
        Ok(self)
    }

    /// Raw GROUP BY clause body, passed through unescaped.
    pub fn group_by_raw(mut self, sql: impl Into<String>) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        self.group = Some(ClauseSpec::Raw(sql.into()));
        Ok(self)
    }

    /// Limit the result window. Fails if `offset < 0` or `count < 1`, before
    /// any statement text is produced.
    pub fn limit(mut self, offset: i64, count: i64) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        if offset < 0 {
            return Err(SqliteQueueError::Validation(format!(
                "limit offset must be >= 0, got {offset}"
            )));
        }
        if count < 1 {
            return Err(SqliteQueueError::Validation(format!(
                "limit count must be >= 1, got {count}"
            )));
        }
        self.limit = Some((offset, count));
        Ok(self)
    }

    /// Pagination sugar: page 1 is the first `per_page` rows.
    pub fn page(self, index: i64, per_page: i64) -> Result<Self, SqliteQueueError> {
        if index < 1 {
            return Err(SqliteQueueError::Validation(format!(
                "page index must be >= 1, got {index}"
            )));
        }
        self.limit((index - 1) * per_page, per_page)
    }

    /// Toggle `SELECT DISTINCT`.
    pub fn distinct(mut self, on: bool) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        self.distinct = on;
        Ok(self)
    }

    /// Attach the INSERT/UPDATE payload, an ordered field -> value mapping.
    pub fn data<S, V, I>(mut self, row: I) -> Result<Self, SqliteQueueError>
    where
        S: Into<String>,
        V: Into<SqlValue>,
        I: IntoIterator<Item = (S, V)>,
    {
        self.structural()?;
        if !matches!(self.kind, StatementKind::Insert | StatementKind::Update) {
            return Err(SqliteQueueError::Validation(
                "data payload is only valid for INSERT and UPDATE".to_owned(),
            ));
        }
        let row: Vec<(String, SqlValue)> = row
            .into_iter()
            .map(|(field, value)| (field.into(), value.into()))
            .collect();
        if row.is_empty() {
            return Err(SqliteQueueError::Validation(
                "data payload must be non-empty".to_owned(),
            ));
        }
        self.payload = Payload::Row(row);
        Ok(self)
    }

    /// Attach a list payload: INSERT batch mode, one statement per row.
    pub fn data_batch<S, V, R, I>(mut self, rows: I) -> Result<Self, SqliteQueueError>
    where
        S: Into<String>,
        V: Into<SqlValue>,
        R: IntoIterator<Item = (S, V)>,
        I: IntoIterator<Item = R>,
    {
        self.structural()?;
        if self.kind != StatementKind::Insert {
            return Err(SqliteQueueError::Validation(
                "batch payload is only valid for INSERT".to_owned(),
            ));
        }
        let rows: Vec<Vec<(String, SqlValue)>> = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(field, value)| (field.into(), value.into()))
                    .collect()
            })
            .collect();
        if rows.is_empty() || rows.iter().any(Vec::is_empty) {
            return Err(SqliteQueueError::Validation(
                "batch payload must be a non-empty list of non-empty rows".to_owned(),
            ));
        }
        self.payload = Payload::Batch(rows);
        Ok(self)
    }

    /// Attach the CREATE payload, an ordered column -> type-definition mapping.
    pub fn columns<S, D, I>(mut self, pairs: I) -> Result<Self, SqliteQueueError>
    where
        S: Into<String>,
        D: Into<String>,
        I: IntoIterator<Item = (S, D)>,
    {
        self.structural()?;
        if self.kind != StatementKind::Create {
            return Err(SqliteQueueError::Validation(
                "column definitions are only valid for CREATE".to_owned(),
            ));
        }
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(col, def)| (col.into(), def.into()))
            .collect();
        if pairs.is_empty() {
            return Err(SqliteQueueError::Validation(
                "CREATE payload must be non-empty".to_owned(),
            ));
        }
        self.payload = Payload::Columns(pairs);
        Ok(self)
    }

    /// Escape hatch: replace the accumulated spec with raw SQL and optional
    /// single-tuple parameters. Once used, no structural call is permitted.
    pub fn raw_override(
        mut self,
        sql: impl Into<String>,
        params: Option<Vec<SqlValue>>,
    ) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        let mode = match params {
            Some(p) => ParamMode::Single(p),
            None => ParamMode::None,
        };
        self.raw = Some((sql.into(), mode));
        Ok(self)
    }

    /// Escape hatch with a batch of parameter tuples.
    pub fn raw_override_batch(
        mut self,
        sql: impl Into<String>,
        tuples: Vec<Vec<SqlValue>>,
    ) -> Result<Self, SqliteQueueError> {
        self.structural()?;
        if tuples.is_empty() {
            return Err(SqliteQueueError::Validation(
                "batch override requires at least one parameter tuple".to_owned(),
            ));
        }
        self.raw = Some((sql.into(), ParamMode::Batch(tuples)));
        Ok(self)
    }

    /// Compile the accumulated spec into one or more `(sql, params)` pairs.
    ///
    /// Batch payloads (and batch raw overrides) expand to one pair per tuple;
    /// everything else yields exactly one pair.
    ///
    /// # Errors
    /// Returns [`SqliteQueueError::Validation`] for a missing or malformed
    /// table name, a missing/empty payload where one is required, or a
    /// TRUNCATE statement.
    pub fn finalize(&self) -> Result<Vec<QueryAndParams>, SqliteQueueError> {
        Ok(self
            .tasks()?
            .into_iter()
            .flat_map(|(sql, mode)| match mode {
                ParamMode::None => vec![QueryAndParams::new_without_params(sql)],
                ParamMode::Single(params) => vec![QueryAndParams::new(sql, params)],
                ParamMode::Batch(tuples) => tuples
                    .into_iter()
                    .map(|tuple| QueryAndParams::new(sql.clone(), tuple))
                    .collect(),
            })
            .collect())
    }

    /// Compile to submission units. A batch raw override stays one task with
    /// batch parameters; structured statements are one task each.
    pub(crate) fn tasks(&self) -> Result<Vec<(String, ParamMode)>, SqliteQueueError> {
        if let Some((sql, mode)) = &self.raw {
            return Ok(vec![(sql.clone(), mode.clone())]);
        }
        match self.kind {
            StatementKind::Select => Ok(vec![self.compile_select()?]),
            StatementKind::Insert => self.compile_insert(),
            StatementKind::Update => Ok(vec![self.compile_update()?]),
            StatementKind::Delete => Ok(vec![self.compile_delete()?]),
            StatementKind::Drop => Ok(vec![(
                format!("DROP TABLE {}", self.table.render()?),
                ParamMode::None,
            )]),
            StatementKind::Create => Ok(vec![self.compile_create()?]),
            StatementKind::Truncate => Err(SqliteQueueError::Validation(
                "TRUNCATE is not supported by SQLite".to_owned(),
            )),
        }
    }

    fn compile_select(&self) -> Result<(String, ParamMode), SqliteQueueError> {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        match &self.fields {
            Some(spec) => sql.push_str(&render_clause(spec, SuffixStyle::Alias)?),
            None => sql.push('*'),
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table.render()?);

        let mut params = Vec::new();
        if let Some(cond) = &self.where_cond {
            let (fragment, cond_params) = cond.compile()?;
            sql.push_str(" WHERE ");
            sql.push_str(&fragment);
            params.extend(cond_params);
        }
        if let Some(spec) = &self.group {
            sql.push_str(" GROUP BY ");
            sql.push_str(&render_clause(spec, SuffixStyle::Direction)?);
        }
        if let Some(cond) = &self.having_cond {
            let (fragment, cond_params) = cond.compile()?;
            sql.push_str(" HAVING ");
            sql.push_str(&fragment);
            params.extend(cond_params);
        }
        if let Some(spec) = &self.order {
            sql.push_str(" ORDER BY ");
            sql.push_str(&render_clause(spec, SuffixStyle::Direction)?);
        }
        if let Some((offset, count)) = self.limit {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(SqlValue::Int(count));
            params.push(SqlValue::Int(offset));
        }
        Ok((sql, mode_for(params)))
    }

    fn compile_insert(&self) -> Result<Vec<(String, ParamMode)>, SqliteQueueError> {
        let rows: Vec<&Vec<(String, SqlValue)>> = match &self.payload {
            Payload::Row(row) => vec![row],
            Payload::Batch(rows) => rows.iter().collect(),
            _ => {
                return Err(SqliteQueueError::Validation(
                    "INSERT requires a non-empty data payload".to_owned(),
                ));
            }
        };
        rows.iter().map(|row| self.insert_row(row)).collect()
    }

    fn insert_row(
        &self,
        row: &[(String, SqlValue)],
    ) -> Result<(String, ParamMode), SqliteQueueError> {
        let mut cols = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (field, value) in row {
            check_ident(field)?;
            cols.push(quote_ident(field));
            params.push(value.clone());
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table.render()?,
            cols.join(", "),
            placeholders(row.len()),
        );
        Ok((sql, ParamMode::Single(params)))
    }

    fn compile_update(&self) -> Result<(String, ParamMode), SqliteQueueError> {
        let Payload::Row(row) = &self.payload else {
            return Err(SqliteQueueError::Validation(
                "UPDATE requires a non-empty data payload".to_owned(),
            ));
        };
        let mut assignments = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (field, value) in row {
            check_ident(field)?;
            assignments.push(format!("{} = ?", quote_ident(field)));
            params.push(value.clone());
        }
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.table.render()?,
            assignments.join(", "),
        );
        if let Some(cond) = &self.where_cond {
            let (fragment, cond_params) = cond.compile()?;
            sql.push_str(" WHERE ");
            sql.push_str(&fragment);
            params.extend(cond_params);
        }
        Ok((sql, ParamMode::Single(params)))
    }

    fn compile_delete(&self) -> Result<(String, ParamMode), SqliteQueueError> {
        let mut sql = format!("DELETE FROM {}", self.table.render()?);
        let mut params = Vec::new();
        if let Some(cond) = &self.where_cond {
            let (fragment, cond_params) = cond.compile()?;
            sql.push_str(" WHERE ");
            sql.push_str(&fragment);
            params.extend(cond_params);
        }
        Ok((sql, mode_for(params)))
    }

    fn compile_create(&self) -> Result<(String, ParamMode), SqliteQueueError> {
        let Payload::Columns(pairs) = &self.payload else {
            return Err(SqliteQueueError::Validation(
                "CREATE requires a non-empty column payload".to_owned(),
            ));
        };
        let mut defs = Vec::with_capacity(pairs.len());
        for (col, def) in pairs {
            check_ident(col)?;
            defs.push(format!("{} {}", quote_ident(col), def));
        }
        let sql = format!(
            "CREATE TABLE {} ({})",
            self.table.render()?,
            defs.join(", "),
        );
        Ok((sql, ParamMode::None))
    }

    fn bound_queue(&self) -> Result<&SqliteQueue, SqliteQueueError> {
        self.queue.as_ref().ok_or_else(|| {
            SqliteQueueError::Validation("builder is not bound to a queue".to_owned())
        })
    }

    /// Finalize and submit every resulting statement, fire-and-forget.
    pub fn register(self) -> Result<(), SqliteQueueError> {
        let queue = self.bound_queue()?.clone();
        for (sql, mode) in self.tasks()? {
            queue.submit_task(sql, mode, ResultOptions::default(), Respond::Ignore)?;
        }
        Ok(())
    }

    /// Finalize and submit, invoking `callback` on the worker thread once per
    /// resulting statement with the requested result fields. A failed
    /// statement's callback is skipped (the failure is logged by the worker).
    pub fn register_with<F>(
        self,
        options: ResultOptions,
        callback: F,
    ) -> Result<(), SqliteQueueError>
    where
        F: Fn(TaskResult) + Send + Sync + 'static,
    {
        let queue = self.bound_queue()?.clone();
        let callback = Arc::new(callback);
        for (sql, mode) in self.tasks()? {
            let cb = Arc::clone(&callback);
            queue.submit_task(
                sql,
                mode,
                options,
                Respond::Callback(Box::new(move |result| cb(result))),
            )?;
        }
        Ok(())
    }

    /// Submit a single-statement SELECT and await its rows.
    ///
    /// # Errors
    /// Fails if the builder compiles to more than one statement, if the
    /// builder is unbound, or if execution fails.
    pub async fn fetch(self) -> Result<ResultSet, SqliteQueueError> {
        let queue = self.bound_queue()?.clone();
        let mut tasks = self.tasks()?;
        if tasks.len() != 1 {
            return Err(SqliteQueueError::Validation(
                "fetch requires a builder that compiles to exactly one statement".to_owned(),
            ));
        }
        let (sql, mode) = tasks.remove(0);
        let result = queue.submit_wait(sql, mode, ResultOptions::rows()).await?;
        result.data.ok_or_else(|| {
            SqliteQueueError::Execution("worker returned no result rows".to_owned())
        })
    }

    /// Submit every resulting statement in order and await each; returns the
    /// last statement's result (all result fields populated).
    pub async fn execute(self) -> Result<TaskResult, SqliteQueueError> {
        let queue = self.bound_queue()?.clone();
        let mut last = TaskResult::default();
        for (sql, mode) in self.tasks()? {
            last = queue.submit_wait(sql, mode, ResultOptions::all()).await?;
        }
        Ok(last)
    }
}

/// Fold a new condition subtree onto the accumulated root.
fn merge(root: Option<Cond>, conj: Conjunction, new: Cond) -> Cond {
    match root {
        None => new,
        Some(Cond::Group {
            conj: existing,
            mut children,
        }) if existing == conj => {
            children.push(new);
            Cond::Group {
                conj: existing,
                children,
            }
        }
        Some(existing) => Cond::Group {
            conj,
            children: vec![existing, new],
        },
    }
}

fn mode_for(params: Vec<SqlValue>) -> ParamMode {
    if params.is_empty() {
        ParamMode::None
    } else {
        ParamMode::Single(params)
    }
}

fn render_clause(spec: &ClauseSpec, style: SuffixStyle) -> Result<String, SqliteQueueError> {
    match spec {
        ClauseSpec::Raw(sql) => Ok(sql.clone()),
        ClauseSpec::Names(names) => {
            let mut out = Vec::with_capacity(names.len());
            for name in names {
                check_ident(name)?;
                out.push(quote_ident(name));
            }
            Ok(out.join(", "))
        }
        ClauseSpec::Suffixed(pairs) => {
            let mut out = Vec::with_capacity(pairs.len());
            for (name, suffix) in pairs {
                check_ident(name)?;
                let quoted = quote_ident(name);
                out.push(match (style, suffix) {
                    (_, None) => quoted,
                    (SuffixStyle::Alias, Some(alias)) => {
                        check_ident(alias)?;
                        format!("{quoted} AS {}", quote_ident(alias))
                    }
                    (SuffixStyle::Direction, Some(dir)) => format!("{quoted} {dir}"),
                });
            }
            Ok(out.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Cond;

    fn single(builder: &StatementBuilder) -> QueryAndParams {
        let mut pairs = builder.finalize().unwrap();
        assert_eq!(pairs.len(), 1);
        pairs.remove(0)
    }

    #[test]
    fn bare_select_defaults_to_star() {
        let qp = single(&StatementBuilder::select("stocks"));
        assert_eq!(qp.query, "SELECT * FROM `stocks`");
        assert!(qp.params.is_empty());
    }

    #[test]
    fn chained_where_calls_and_together() {
        let builder = StatementBuilder::select("stocks")
            .and_where(Cond::cmp("price", ">=", 30))
            .unwrap()
            .and_where(Cond::eq("trans", vec!["BUY", "SELL"]))
            .unwrap();
        let qp = single(&builder);
        assert_eq!(
            qp.query,
            "SELECT * FROM `stocks` WHERE `price` >= ? AND `trans` IN (?,?)"
        );
        assert_eq!(
            qp.params,
            vec![
                SqlValue::Int(30),
                SqlValue::Text("BUY".into()),
                SqlValue::Text("SELL".into()),
            ]
        );
    }

    #[test]
    fn or_where_wraps_the_accumulated_condition() {
        let builder = StatementBuilder::select("stocks")
            .and_where(Cond::cmp("price", ">=", 30))
            .unwrap()
            .and_where(Cond::eq("trans", "BUY"))
            .unwrap()
            .or_where(Cond::eq("symbol", "RHAT"))
            .unwrap();
        let qp = single(&builder);
        assert_eq!(
            qp.query,
            "SELECT * FROM `stocks` WHERE (`price` >= ? AND `trans` = ?) OR `symbol` = ?"
        );
    }

    #[test]
    fn select_clause_order_is_standard_sql() {
        let builder = StatementBuilder::select("stocks")
            .and_where(Cond::cmp("price", ">=", 30))
            .unwrap()
            .group_by(["trans"])
            .unwrap()
            .and_having(Cond::cmp("qty", ">", 100))
            .unwrap()
            .order_by_dir([("price", Some("DESC"))])
            .unwrap()
            .limit(5, 10)
            .unwrap();
        let qp = single(&builder);
        assert_eq!(
            qp.query,
            "SELECT * FROM `stocks` WHERE `price` >= ? GROUP BY `trans` \
             HAVING `qty` > ? ORDER BY `price` DESC LIMIT ? OFFSET ?"
        );
        // Params follow textual order: WHERE, HAVING, LIMIT (count, offset).
        assert_eq!(
            qp.params,
            vec![
                SqlValue::Int(30),
                SqlValue::Int(100),
                SqlValue::Int(10),
                SqlValue::Int(5),
            ]
        );
    }

    #[test]
    fn plain_field_list_quotes_each_name() {
        let builder = StatementBuilder::select("stocks")
            .fields(["symbol", "price"])
            .unwrap();
        let qp = single(&builder);
        assert_eq!(qp.query, "SELECT `symbol`, `price` FROM `stocks`");
    }

    #[test]
    fn raw_clause_bodies_pass_through_unescaped() {
        let builder = StatementBuilder::select("stocks")
            .fields_raw("COUNT(*) AS cnt, MAX(price)")
            .unwrap()
            .group_by_raw("strftime('%Y', date)")
            .unwrap()
            .order_by_raw("cnt DESC")
            .unwrap();
        let qp = single(&builder);
        assert_eq!(
            qp.query,
            "SELECT COUNT(*) AS cnt, MAX(price) FROM `stocks` \
             GROUP BY strftime('%Y', date) ORDER BY cnt DESC"
        );
        assert!(qp.params.is_empty());
    }

    #[test]
    fn or_having_wraps_the_accumulated_having() {
        let builder = StatementBuilder::select("stocks")
            .group_by(["trans"])
            .unwrap()
            .and_having(Cond::cmp("qty", ">", 100))
            .unwrap()
            .and_having(Cond::cmp("price", ">=", 30))
            .unwrap()
            .or_having(Cond::cmp("qty", "<", 10))
            .unwrap();
        let qp = single(&builder);
        assert_eq!(
            qp.query,
            "SELECT * FROM `stocks` GROUP BY `trans` \
             HAVING (`qty` > ? AND `price` >= ?) OR `qty` < ?"
        );
        assert_eq!(qp.params.len(), 3);
    }

    #[test]
    fn table_raw_passes_joins_through() {
        let builder = StatementBuilder::select("stocks")
            .table_raw("stocks AS s JOIN trades AS t ON t.symbol = s.symbol")
            .unwrap()
            .fields_raw("s.symbol, t.qty")
            .unwrap();
        let qp = single(&builder);
        assert_eq!(
            qp.query,
            "SELECT s.symbol, t.qty FROM stocks AS s JOIN trades AS t ON t.symbol = s.symbol"
        );
    }

    #[test]
    fn non_identifier_table_requires_table_raw() {
        assert!(matches!(
            StatementBuilder::select("stocks AS s").finalize(),
            Err(SqliteQueueError::Validation(_))
        ));
        let qp = single(
            &StatementBuilder::delete("`stocks`")
                .table_raw("`stocks`")
                .unwrap(),
        );
        assert_eq!(qp.query, "DELETE FROM `stocks`");
    }

    #[test]
    fn distinct_and_field_aliases() {
        let builder = StatementBuilder::select("stocks")
            .distinct(true)
            .unwrap()
            .fields_aliased([("symbol", Some("sym")), ("price", None)])
            .unwrap();
        let qp = single(&builder);
        assert_eq!(
            qp.query,
            "SELECT DISTINCT `symbol` AS `sym`, `price` FROM `stocks`"
        );
    }

    #[test]
    fn limit_rejects_bad_bounds_before_producing_sql() {
        assert!(matches!(
            StatementBuilder::select("stocks").limit(-1, 10),
            Err(SqliteQueueError::Validation(_))
        ));
        assert!(matches!(
            StatementBuilder::select("stocks").limit(0, 0),
            Err(SqliteQueueError::Validation(_))
        ));
    }

    #[test]
    fn page_is_limit_sugar() {
        let builder = StatementBuilder::select("stocks").page(3, 20).unwrap();
        let qp = single(&builder);
        assert_eq!(qp.query, "SELECT * FROM `stocks` LIMIT ? OFFSET ?");
        assert_eq!(qp.params, vec![SqlValue::Int(20), SqlValue::Int(40)]);
        assert!(StatementBuilder::select("stocks").page(0, 20).is_err());
    }

    #[test]
    fn insert_compiles_in_field_insertion_order() {
        let builder = StatementBuilder::insert("stocks")
            .data([
                ("trans", SqlValue::from("BUY")),
                ("symbol", SqlValue::from("RHAT")),
                ("price", SqlValue::from(35.14)),
            ])
            .unwrap();
        let qp = single(&builder);
        assert_eq!(
            qp.query,
            "INSERT INTO `stocks` (`trans`, `symbol`, `price`) VALUES (?,?,?)"
        );
        assert_eq!(qp.params.len(), 3);
    }

    #[test]
    fn batch_insert_yields_one_pair_per_row() {
        let builder = StatementBuilder::insert("stocks")
            .data_batch([
                [("symbol", SqlValue::from("DOUB")), ("price", SqlValue::from(500.0))],
                [("symbol", SqlValue::from("S6")), ("price", SqlValue::from(1.0))],
                [("symbol", SqlValue::from("BlLl")), ("price", SqlValue::from(12.45))],
            ])
            .unwrap();
        let pairs = builder.finalize().unwrap();
        assert_eq!(pairs.len(), 3);
        for pair in &pairs {
            assert_eq!(
                pair.query,
                "INSERT INTO `stocks` (`symbol`, `price`) VALUES (?,?)"
            );
            assert_eq!(pair.params.len(), 2);
        }
    }

    #[test]
    fn insert_without_payload_fails() {
        assert!(matches!(
            StatementBuilder::insert("stocks").finalize(),
            Err(SqliteQueueError::Validation(_))
        ));
    }

    #[test]
    fn update_params_are_payload_then_where() {
        let builder = StatementBuilder::update("stocks")
            .data([("price", SqlValue::from(40.0))])
            .unwrap()
            .and_where(Cond::eq("symbol", "RHAT"))
            .unwrap();
        let qp = single(&builder);
        assert_eq!(qp.query, "UPDATE `stocks` SET `price` = ? WHERE `symbol` = ?");
        assert_eq!(
            qp.params,
            vec![SqlValue::Float(40.0), SqlValue::Text("RHAT".into())]
        );
    }

    #[test]
    fn delete_and_drop_shapes() {
        let qp = single(
            &StatementBuilder::delete("stocks")
                .and_where(Cond::eq("symbol", "RHAT"))
                .unwrap(),
        );
        assert_eq!(qp.query, "DELETE FROM `stocks` WHERE `symbol` = ?");

        let qp = single(&StatementBuilder::drop_table("stocks"));
        assert_eq!(qp.query, "DROP TABLE `stocks`");
        assert!(qp.params.is_empty());
    }

    #[test]
    fn create_compiles_column_definitions_in_order() {
        let builder = StatementBuilder::create("stocks")
            .columns([
                ("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
                ("trans", "TEXT"),
                ("price", "REAL"),
            ])
            .unwrap();
        let qp = single(&builder);
        assert_eq!(
            qp.query,
            "CREATE TABLE `stocks` (`id` INTEGER PRIMARY KEY AUTOINCREMENT, `trans` TEXT, `price` REAL)"
        );
        assert!(qp.params.is_empty());
    }

    #[test]
    fn truncate_always_fails() {
        assert!(matches!(
            StatementBuilder::truncate("stocks").finalize(),
            Err(SqliteQueueError::Validation(_))
        ));
    }

    #[test]
    fn structural_calls_after_raw_override_fail() {
        let builder = StatementBuilder::select("stocks")
            .raw_override("SELECT 1", None)
            .unwrap();
        assert!(matches!(
            builder.and_where(Cond::eq("price", 1)),
            Err(SqliteQueueError::Validation(_))
        ));
    }

    #[test]
    fn raw_override_batch_expands_per_tuple() {
        let builder = StatementBuilder::insert("stocks")
            .raw_override_batch(
                "INSERT INTO stocks (price) VALUES (?)",
                vec![vec![SqlValue::Int(1)], vec![SqlValue::Int(2)]],
            )
            .unwrap();
        let pairs = builder.finalize().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].query, pairs[1].query);
    }

    #[test]
    fn finalize_is_deterministic() {
        let builder = StatementBuilder::select("stocks")
            .and_where(Cond::expr("price[>=]", 30).unwrap())
            .unwrap()
            .order_by(["price"])
            .unwrap();
        assert_eq!(builder.finalize().unwrap(), builder.finalize().unwrap());
    }

    #[test]
    fn register_requires_a_bound_queue() {
        assert!(matches!(
            StatementBuilder::select("stocks").register(),
            Err(SqliteQueueError::Validation(_))
        ));
    }
}
