//! Query builder - structural descriptions to parameterized SQL
//!
//! Every caller-supplied value becomes a bound parameter. The only text
//! spliced into SQL is table and column names, and those must be plain
//! identifiers.

use rusqlite::types::Value;
use crate::{Error, Result};

/// Comparison operator for a filter condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }
}

/// A single `column <op> ?` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Op,
    pub value: Value,
}

/// Ordered conjunction of conditions.
///
/// Clauses are rendered in insertion order and joined with `AND`, so the
/// generated SQL and its parameter list are deterministic.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(column, Op::Eq, value)
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render ` WHERE a = ? AND b > ?` and append the values to `params`
    fn render(&self, sql: &mut String, params: &mut Vec<Value>) -> Result<()> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(self.conditions.len());
        for cond in &self.conditions {
            check_identifier(&cond.column)?;
            clauses.push(format!("{} {} ?", cond.column, cond.op.as_sql()));
            params.push(cond.value.clone());
        }
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
        Ok(())
    }
}

/// SQL text plus the values bound to its `?` placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self { sql: sql.into(), params }
    }

    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Reject anything that is not a bare SQL identifier
fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::MalformedQuery(format!("invalid identifier: {:?}", name)))
    }
}

fn check_columns(columns: &[&str], allow_star: bool) -> Result<()> {
    if columns.is_empty() {
        return Err(Error::MalformedQuery("column list is empty".to_string()));
    }
    for column in columns {
        if allow_star && *column == "*" {
            continue;
        }
        check_identifier(column)?;
    }
    Ok(())
}

fn check_lengths(columns: &[&str], values: &[Value]) -> Result<()> {
    if columns.len() != values.len() {
        return Err(Error::MalformedQuery(format!(
            "{} column(s) but {} value(s)",
            columns.len(),
            values.len()
        )));
    }
    Ok(())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// `INSERT INTO table (c1, ...) VALUES (?, ...)`
pub fn build_insert(table: &str, columns: &[&str], values: Vec<Value>) -> Result<Statement> {
    check_identifier(table)?;
    check_columns(columns, false)?;
    check_lengths(columns, &values)?;

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders(columns.len())
    );
    Ok(Statement::new(sql, values))
}

/// `SELECT c1, ... FROM table [WHERE ...]`; `columns` may be `["*"]`
pub fn build_select(table: &str, columns: &[&str], filter: Option<&Filter>) -> Result<Statement> {
    check_identifier(table)?;
    check_columns(columns, true)?;

    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), table);
    let mut params = Vec::new();
    if let Some(filter) = filter {
        filter.render(&mut sql, &mut params)?;
    }
    Ok(Statement::new(sql, params))
}

/// `SELECT COUNT(*) AS n FROM table [WHERE ...]`
pub fn build_count(table: &str, filter: Option<&Filter>) -> Result<Statement> {
    check_identifier(table)?;

    let mut sql = format!("SELECT COUNT(*) AS n FROM {}", table);
    let mut params = Vec::new();
    if let Some(filter) = filter {
        filter.render(&mut sql, &mut params)?;
    }
    Ok(Statement::new(sql, params))
}

/// `UPDATE table SET c1 = ?, ... WHERE ...`
///
/// The filter is required: an unscoped update is refused. Parameters are the
/// new values followed by the filter values.
pub fn build_update(
    table: &str,
    columns: &[&str],
    values: Vec<Value>,
    filter: &Filter,
) -> Result<Statement> {
    check_identifier(table)?;
    check_columns(columns, false)?;
    check_lengths(columns, &values)?;
    if filter.is_empty() {
        return Err(Error::MalformedQuery(format!(
            "refusing to update every row of {}",
            table
        )));
    }

    let assignments: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
    let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
    let mut params = values;
    filter.render(&mut sql, &mut params)?;
    Ok(Statement::new(sql, params))
}

/// `DELETE FROM table [WHERE ...]`
///
/// `None` (or an empty filter) deletes every row in the table. Callers that
/// mean it should go through [`SqliteStore::delete_all`](super::SqliteStore::delete_all).
pub fn build_delete(table: &str, filter: Option<&Filter>) -> Result<Statement> {
    check_identifier(table)?;

    let mut sql = format!("DELETE FROM {}", table);
    let mut params = Vec::new();
    if let Some(filter) = filter {
        filter.render(&mut sql, &mut params)?;
    }
    Ok(Statement::new(sql, params))
}

/// Insert a counter row at 1, or bump it by one if the key already exists.
///
/// `INSERT INTO t (k1, k2, counter) VALUES (?, ?, 1)
///  ON CONFLICT(k1, k2) DO UPDATE SET counter = counter + 1`
///
/// `key_columns` must match a UNIQUE or PRIMARY KEY constraint on `table`.
pub fn build_increment_upsert(
    table: &str,
    key_columns: &[&str],
    key_values: Vec<Value>,
    counter: &str,
) -> Result<Statement> {
    check_identifier(table)?;
    check_columns(key_columns, false)?;
    check_identifier(counter)?;
    check_lengths(key_columns, &key_values)?;

    let keys = key_columns.join(", ");
    let sql = format!(
        "INSERT INTO {table} ({keys}, {counter}) VALUES ({}, 1) \
         ON CONFLICT({keys}) DO UPDATE SET {counter} = {counter} + 1",
        placeholders(key_columns.len()),
    );
    Ok(Statement::new(sql, key_values))
}
