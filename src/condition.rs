//! Condition grammar: shorthand field/operator expressions compiled to SQL
//! boolean fragments plus ordered bound parameters.
//!
//! Conditions are explicit tagged values rather than shape-sniffed strings: a
//! caller states whether a fragment is raw SQL, a single comparison, or a
//! nested AND/OR group. Compilation is pure and deterministic.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SqliteQueueError;
use crate::types::SqlValue;

/// `identifier` or `identifier[operator]`, dotted names allowed.
static FIELD_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_.]*)(?:\[([^\]]+)\])?$").expect("valid field regex")
});

static IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("valid ident regex"));

/// Check a bare identifier (optionally dotted) used as a field or table name.
pub(crate) fn check_ident(name: &str) -> Result<(), SqliteQueueError> {
    if IDENT.is_match(name) {
        Ok(())
    } else {
        Err(SqliteQueueError::Validation(format!(
            "invalid identifier: {name:?}"
        )))
    }
}

/// Backtick-quote an identifier, quoting each dotted segment separately.
pub(crate) fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("`{part}`"))
        .collect::<Vec<_>>()
        .join(".")
}

/// How the children of a condition group are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// A leaf's right-hand side: one bound value or an ordered list of them.
#[derive(Debug, Clone, PartialEq)]
pub enum CondValue {
    Scalar(SqlValue),
    List(Vec<SqlValue>),
}

impl From<SqlValue> for CondValue {
    fn from(value: SqlValue) -> Self {
        CondValue::Scalar(value)
    }
}

impl From<i64> for CondValue {
    fn from(value: i64) -> Self {
        CondValue::Scalar(SqlValue::Int(value))
    }
}

impl From<i32> for CondValue {
    fn from(value: i32) -> Self {
        CondValue::Scalar(SqlValue::Int(i64::from(value)))
    }
}

impl From<f64> for CondValue {
    fn from(value: f64) -> Self {
        CondValue::Scalar(SqlValue::Float(value))
    }
}

impl From<bool> for CondValue {
    fn from(value: bool) -> Self {
        CondValue::Scalar(SqlValue::Bool(value))
    }
}

impl From<&str> for CondValue {
    fn from(value: &str) -> Self {
        CondValue::Scalar(SqlValue::Text(value.to_owned()))
    }
}

impl From<String> for CondValue {
    fn from(value: String) -> Self {
        CondValue::Scalar(SqlValue::Text(value))
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for CondValue {
    fn from(values: Vec<T>) -> Self {
        CondValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// A logical condition: a raw fragment, a single comparison, or a nested
/// AND/OR group of sub-conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// Verbatim SQL fragment with its bound parameters.
    Raw { sql: String, params: Vec<SqlValue> },
    /// One comparison. `op` is the shorthand token as written by the caller.
    Leaf {
        field: String,
        op: String,
        value: CondValue,
    },
    /// Conjunction of sub-conditions, joined by AND or OR.
    Group {
        conj: Conjunction,
        children: Vec<Cond>,
    },
}

impl Cond {
    /// Raw SQL fragment, no parameters. Emitted verbatim at the top level;
    /// inside a group it is parenthesized so its own OR/AND structure cannot
    /// rebind the group's conjunction.
    pub fn raw(sql: impl Into<String>) -> Self {
        Cond::Raw {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Raw SQL fragment with bound parameters.
    pub fn raw_with(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Cond::Raw {
            sql: sql.into(),
            params,
        }
    }

    /// Equality leaf. A list value compiles to `IN (?,...)`.
    pub fn eq(field: impl Into<String>, value: impl Into<CondValue>) -> Self {
        Cond::cmp(field, "=", value)
    }

    /// Leaf with an explicit operator token.
    ///
    /// Shorthand tokens: `!` becomes `!=` (or `NOT IN` for lists), `~` becomes
    /// `LIKE`, `!~` becomes `NOT LIKE`, `><` becomes `BETWEEN`, `<>` becomes
    /// `NOT BETWEEN`. Anything else passes through unchanged.
    pub fn cmp(
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<CondValue>,
    ) -> Self {
        Cond::Leaf {
            field: field.into(),
            op: op.into(),
            value: value.into(),
        }
    }

    /// Bracket-shorthand leaf: `"field"` or `"field[op]"`, operator omitted
    /// means equality.
    ///
    /// # Errors
    /// Returns [`SqliteQueueError::Validation`] naming the token when the key
    /// does not match `identifier[operator]?`.
    pub fn expr(key: &str, value: impl Into<CondValue>) -> Result<Self, SqliteQueueError> {
        let caps = FIELD_EXPR.captures(key).ok_or_else(|| {
            SqliteQueueError::Validation(format!("malformed field expression: {key:?}"))
        })?;
        let field = caps.get(1).map(|m| m.as_str().to_owned()).unwrap_or_default();
        let op = caps.get(2).map_or_else(|| "=".to_owned(), |m| m.as_str().to_owned());
        Ok(Cond::Leaf {
            field,
            op,
            value: value.into(),
        })
    }

    /// AND group of sub-conditions.
    #[must_use]
    pub fn all(children: Vec<Cond>) -> Self {
        Cond::Group {
            conj: Conjunction::And,
            children,
        }
    }

    /// OR group of sub-conditions.
    #[must_use]
    pub fn any(children: Vec<Cond>) -> Self {
        Cond::Group {
            conj: Conjunction::Or,
            children,
        }
    }

    /// Check fields, operator arity, and group shape without producing SQL.
    ///
    /// # Errors
    /// Returns [`SqliteQueueError::Validation`] for a malformed field name, a
    /// BETWEEN list whose length is not exactly 2, an empty IN list, or an
    /// empty group.
    pub fn validate(&self) -> Result<(), SqliteQueueError> {
        match self {
            Cond::Raw { .. } => Ok(()),
            Cond::Leaf { field, op, value } => {
                check_ident(field)?;
                match (op.as_str(), value) {
                    ("><" | "<>", CondValue::List(values)) if values.len() != 2 => {
                        Err(SqliteQueueError::Validation(format!(
                            "operator {op:?} on `{field}` requires exactly 2 values, got {}",
                            values.len()
                        )))
                    }
                    ("><" | "<>", CondValue::Scalar(_)) => Err(SqliteQueueError::Validation(
                        format!("operator {op:?} on `{field}` requires a list of 2 values"),
                    )),
                    (_, CondValue::List(values)) if values.is_empty() => {
                        Err(SqliteQueueError::Validation(format!(
                            "IN condition on `{field}` requires at least one value"
                        )))
                    }
                    _ => Ok(()),
                }
            }
            Cond::Group { children, .. } => {
                if children.is_empty() {
                    return Err(SqliteQueueError::Validation(
                        "empty condition group".to_owned(),
                    ));
                }
                for child in children {
                    child.validate()?;
                }
                Ok(())
            }
        }
    }

    /// Compile to `(fragment, ordered params)`.
    ///
    /// A scalar leaf always compiles to `` `field` OP ? `` with one bound
    /// parameter. Deterministic: compiling twice yields identical text and
    /// parameter order.
    ///
    /// # Errors
    /// Same failures as [`Cond::validate`].
    pub fn compile(&self) -> Result<(String, Vec<SqlValue>), SqliteQueueError> {
        self.validate()?;
        let mut sql = String::new();
        let mut params = Vec::new();
        self.compile_into(&mut sql, &mut params, false);
        Ok((sql, params))
    }

    /// Append this condition's fragment and params. Validation has already run.
    fn compile_into(&self, sql: &mut String, params: &mut Vec<SqlValue>, parenthesize: bool) {
        match self {
            Cond::Raw {
                sql: fragment,
                params: raw_params,
            } => {
                if parenthesize {
                    sql.push('(');
                }
                sql.push_str(fragment);
                if parenthesize {
                    sql.push(')');
                }
                params.extend(raw_params.iter().cloned());
            }
            Cond::Leaf { field, op, value } => {
                compile_leaf(field, op, value, sql, params);
            }
            Cond::Group { conj, children } => {
                if parenthesize {
                    sql.push('(');
                }
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        sql.push(' ');
                        sql.push_str(conj.as_sql());
                        sql.push(' ');
                    }
                    // Nested groups and raw fragments are parenthesized so a
                    // child's OR cannot rebind the surrounding conjunction.
                    child.compile_into(
                        sql,
                        params,
                        matches!(child, Cond::Group { .. } | Cond::Raw { .. }),
                    );
                }
                if parenthesize {
                    sql.push(')');
                }
            }
        }
    }
}

fn compile_leaf(field: &str, op: &str, value: &CondValue, sql: &mut String, params: &mut Vec<SqlValue>) {
    let quoted = quote_ident(field);
    match value {
        CondValue::List(values) => {
            match op {
                "><" => {
                    sql.push_str(&format!("{quoted} BETWEEN ? AND ?"));
                }
                "<>" => {
                    sql.push_str(&format!("{quoted} NOT BETWEEN ? AND ?"));
                }
                "!" => {
                    sql.push_str(&format!("{quoted} NOT IN ({})", placeholders(values.len())));
                }
                _ => {
                    sql.push_str(&format!("{quoted} IN ({})", placeholders(values.len())));
                }
            }
            params.extend(values.iter().cloned());
        }
        CondValue::Scalar(scalar) => {
            let sql_op = match op {
                "" | "=" => "=",
                "!" => "!=",
                "~" => "LIKE",
                "!~" => "NOT LIKE",
                other => other,
            };
            sql.push_str(&format!("{quoted} {sql_op} ?"));
            params.push(scalar.clone());
        }
    }
}

/// `?,?,...` for `count` bound values.
pub(crate) fn placeholders(count: usize) -> String {
    let mut out = String::with_capacity(count * 2);
    for i in 0..count {
        if i > 0 {
            out.push(',');
        }
        out.push('?');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_leaf_compiles_with_one_param() {
        let (sql, params) = Cond::eq("symbol", "RHAT").compile().unwrap();
        assert_eq!(sql, "`symbol` = ?");
        assert_eq!(params, vec![SqlValue::Text("RHAT".into())]);
    }

    #[test]
    fn shorthand_operators_map_to_sql() {
        let (sql, _) = Cond::cmp("qty", "!", 5).compile().unwrap();
        assert_eq!(sql, "`qty` != ?");
        let (sql, _) = Cond::cmp("symbol", "~", "RH%").compile().unwrap();
        assert_eq!(sql, "`symbol` LIKE ?");
        let (sql, _) = Cond::cmp("symbol", "!~", "RH%").compile().unwrap();
        assert_eq!(sql, "`symbol` NOT LIKE ?");
        let (sql, _) = Cond::cmp("price", ">=", 30).compile().unwrap();
        assert_eq!(sql, "`price` >= ?");
    }

    #[test]
    fn list_compiles_to_in_and_not_in() {
        let (sql, params) = Cond::eq("trans", vec!["BUY", "SELL"]).compile().unwrap();
        assert_eq!(sql, "`trans` IN (?,?)");
        assert_eq!(params.len(), 2);

        let (sql, _) = Cond::cmp("trans", "!", vec!["BUY", "SELL"])
            .compile()
            .unwrap();
        assert_eq!(sql, "`trans` NOT IN (?,?)");
    }

    #[test]
    fn between_requires_exactly_two_values() {
        let (sql, params) = Cond::cmp("date", "><", vec!["2017-02-01", "2017-12-31"])
            .compile()
            .unwrap();
        assert_eq!(sql, "`date` BETWEEN ? AND ?");
        assert_eq!(params.len(), 2);

        let err = Cond::cmp("date", "><", vec!["a", "b", "c"])
            .compile()
            .unwrap_err();
        assert!(matches!(err, SqliteQueueError::Validation(_)));

        let err = Cond::cmp("date", "<>", vec!["a"]).compile().unwrap_err();
        assert!(matches!(err, SqliteQueueError::Validation(_)));
    }

    #[test]
    fn not_between_shorthand() {
        let (sql, _) = Cond::cmp("date", "<>", vec!["2017-02-01", "2017-12-31"])
            .compile()
            .unwrap();
        assert_eq!(sql, "`date` NOT BETWEEN ? AND ?");
    }

    #[test]
    fn bracket_expr_parses_operator() {
        let (sql, params) = Cond::expr("price[>=]", 30).unwrap().compile().unwrap();
        assert_eq!(sql, "`price` >= ?");
        assert_eq!(params, vec![SqlValue::Int(30)]);

        let (sql, _) = Cond::expr("trans", "BUY").unwrap().compile().unwrap();
        assert_eq!(sql, "`trans` = ?");
    }

    #[test]
    fn malformed_expr_names_the_token() {
        let err = Cond::expr("1bad[>=]", 1).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("1bad"), "unexpected message: {msg}");

        assert!(Cond::expr("price[>=", 1).is_err());
        assert!(Cond::eq("price; DROP TABLE x", 1).compile().is_err());
    }

    #[test]
    fn groups_join_without_leading_conjunction() {
        let cond = Cond::all(vec![
            Cond::cmp("price", ">=", 30),
            Cond::eq("trans", vec!["BUY", "SELL"]),
        ]);
        let (sql, params) = cond.compile().unwrap();
        assert_eq!(sql, "`price` >= ? AND `trans` IN (?,?)");
        assert_eq!(
            params,
            vec![
                SqlValue::Int(30),
                SqlValue::Text("BUY".into()),
                SqlValue::Text("SELL".into()),
            ]
        );
    }

    #[test]
    fn nested_groups_are_parenthesized() {
        let cond = Cond::all(vec![
            Cond::cmp("price", ">=", 30),
            Cond::any(vec![Cond::eq("trans", "BUY"), Cond::eq("trans", "SELL")]),
        ]);
        let (sql, params) = cond.compile().unwrap();
        assert_eq!(sql, "`price` >= ? AND (`trans` = ? OR `trans` = ?)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn empty_group_and_empty_in_list_fail() {
        assert!(Cond::all(vec![]).compile().is_err());
        assert!(Cond::eq("trans", Vec::<String>::new()).compile().is_err());
    }

    #[test]
    fn raw_fragment_passes_through_verbatim() {
        let cond = Cond::raw_with("price > ? AND qty < ?", vec![SqlValue::Int(1), SqlValue::Int(2)]);
        let (sql, params) = cond.compile().unwrap();
        assert_eq!(sql, "price > ? AND qty < ?");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn raw_children_of_groups_are_parenthesized() {
        let cond = Cond::all(vec![
            Cond::eq("trans", "BUY"),
            Cond::raw("price > 30 OR qty > 100"),
        ]);
        let (sql, _) = cond.compile().unwrap();
        assert_eq!(sql, "`trans` = ? AND (price > 30 OR qty > 100)");
    }

    #[test]
    fn compilation_is_deterministic() {
        let cond = Cond::all(vec![
            Cond::expr("price[>=]", 30).unwrap(),
            Cond::eq("trans", vec!["BUY", "SELL"]),
            Cond::cmp("date", "><", vec!["2017-02-01", "2017-12-31"]),
        ]);
        assert_eq!(cond.compile().unwrap(), cond.compile().unwrap());
    }

    #[test]
    fn dotted_fields_quote_each_segment() {
        let (sql, _) = Cond::eq("stocks.price", 1).compile().unwrap();
        assert_eq!(sql, "`stocks`.`price` = ?");
    }
}
