//! SQLite storage implementation

use std::path::Path;
use std::time::Duration;
use rusqlite::{Connection, params_from_iter};
use rusqlite::types::Value;
use crate::{Error, Result, StatementFailure};
use super::query::{self, Filter, Statement};
use super::schema;

/// Default busy timeout, matching what the service has always used
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// One result row: column name to value, in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn get_i64(&self, column: &str) -> Result<i64> {
        match self.get(column) {
            Some(Value::Integer(v)) => Ok(*v),
            other => Err(unexpected(column, "integer", other)),
        }
    }

    pub fn get_text(&self, column: &str) -> Result<String> {
        match self.get(column) {
            Some(Value::Text(v)) => Ok(v.clone()),
            other => Err(unexpected(column, "text", other)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn unexpected(column: &str, wanted: &str, got: Option<&Value>) -> Error {
    Error::Storage(rusqlite::Error::InvalidColumnType(
        0,
        format!("{} (expected {}, got {:?})", column, wanted, got),
        got.map(Value::data_type).unwrap_or(rusqlite::types::Type::Null),
    ))
}

/// SQLite-backed storage for cards, users and ownership rows.
///
/// Owns a single connection for its whole lifetime. Open with [`open`] or
/// [`open_in_memory`], release with [`close`] (dropping the store also
/// closes the connection, but swallows any close error).
///
/// [`open`]: SqliteStore::open
/// [`open_in_memory`]: SqliteStore::open_in_memory
/// [`close`]: SqliteStore::close
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        tracing::debug!("Opened database {}", path.display());
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Close the connection, surfacing any error SQLite reports
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| Error::from(err))?;
        tracing::info!("Connection closed");
        Ok(())
    }

    /// Create the built-in tables
    pub fn bootstrap(&mut self) -> Result<()> {
        self.execute_schema(schema::SCHEMA)
    }

    /// Run every statement of a DDL script in one transaction.
    ///
    /// All statements are attempted so the error lists every failure; if any
    /// fails the transaction is rolled back and nothing is applied.
    /// Transaction control (`BEGIN`, `COMMIT`, `END`, `ROLLBACK`) is refused
    /// up front since it would end the enclosing transaction.
    pub fn execute_schema(&mut self, ddl: &str) -> Result<()> {
        let statements = schema::split_statements(ddl);
        let tx = self.conn.transaction()?;

        let mut failures = Vec::new();
        for (index, stmt) in statements.iter().enumerate() {
            let outcome = if schema::is_transaction_control(stmt) {
                Err("transaction control is not allowed in a schema script".to_string())
            } else {
                tx.execute_batch(stmt).map_err(|e| e.to_string())
            };
            if let Err(message) = outcome {
                tracing::warn!("Schema statement #{} failed: {}", index, message);
                failures.push(StatementFailure {
                    index,
                    statement: stmt.clone(),
                    message,
                });
            }

            if tx.is_autocommit() {
                failures.push(StatementFailure {
                    index,
                    statement: stmt.clone(),
                    message: "statement ended the schema transaction".to_string(),
                });
                break;
            }
        }

        if !failures.is_empty() {
            if let Err(err) = tx.rollback() {
                tracing::warn!("Schema rollback failed: {}", err);
            }
            return Err(Error::Schema(failures));
        }
        tx.commit()?;
        tracing::info!("Schema applied ({} statements)", statements.len());
        Ok(())
    }

    // ========== Row Operations ==========

    /// Insert a row and return its generated id
    pub fn insert(&self, table: &str, columns: &[&str], values: Vec<Value>) -> Result<i64> {
        let stmt = query::build_insert(table, columns, values)?;
        self.execute(&stmt)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Select rows; `filter` of `None` returns the whole table
    pub fn select(&self, table: &str, columns: &[&str], filter: Option<&Filter>) -> Result<Vec<Record>> {
        let stmt = query::build_select(table, columns, filter)?;
        self.query(&stmt)
    }

    /// Update the rows matched by `filter`, returning how many changed
    pub fn update(&self, table: &str, columns: &[&str], values: Vec<Value>, filter: &Filter) -> Result<usize> {
        let stmt = query::build_update(table, columns, values, filter)?;
        self.execute(&stmt)
    }

    /// Delete the rows matched by `filter`, returning how many were removed.
    ///
    /// An empty filter is refused; use [`delete_all`](Self::delete_all) to
    /// clear a table.
    pub fn delete(&self, table: &str, filter: &Filter) -> Result<usize> {
        if filter.is_empty() {
            return Err(Error::MalformedQuery(format!(
                "empty filter would delete every row of {}",
                table
            )));
        }
        let stmt = query::build_delete(table, Some(filter))?;
        self.execute(&stmt)
    }

    /// Delete every row of a table
    pub fn delete_all(&self, table: &str) -> Result<usize> {
        let stmt = query::build_delete(table, None)?;
        self.execute(&stmt)
    }

    /// Run a statement that returns no rows
    pub fn execute(&self, stmt: &Statement) -> Result<usize> {
        tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "execute");
        let changed = self.conn.execute(&stmt.sql, params_from_iter(stmt.params.iter()))?;
        Ok(changed)
    }

    /// Run a statement and materialize its rows
    pub fn query(&self, stmt: &Statement) -> Result<Vec<Record>> {
        tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "query");
        let mut prepared = self.conn.prepare(&stmt.sql)?;
        let names: Vec<String> = prepared.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = prepared.query(params_from_iter(stmt.params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut columns = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                let value: Value = row.get(i)?;
                columns.push((name.clone(), value));
            }
            records.push(Record { columns });
        }
        Ok(records)
    }

    // ========== Bulk Operations ==========

    /// Run `f` inside a transaction, committing only if it returns `Ok`.
    ///
    /// Not reentrant: `f` must not call `with_transaction` again.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    /// Count rows in a table
    pub fn count(&self, table: &str) -> Result<usize> {
        let rows = self.query(&query::build_count(table, None)?)?;
        let n = rows.first().map(|r| r.get_i64("n")).transpose()?.unwrap_or(0);
        Ok(n as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let by_rarity = self
            .query(&Statement::new(
                "SELECT rarity, COUNT(*) AS n FROM card GROUP BY rarity ORDER BY rarity",
                Vec::new(),
            ))?
            .iter()
            .map(|row| Ok((row.get_i64("rarity")?, row.get_i64("n")? as usize)))
            .collect::<Result<Vec<_>>>()?;

        Ok(DbStats {
            cards: self.count("card")?,
            users: self.count("user")?,
            ownership_rows: self.count("user_card")?,
            by_rarity,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub cards: usize,
    pub users: usize,
    pub ownership_rows: usize,
    /// `(rarity, cards)` for every rarity present in the catalogue
    pub by_rarity: Vec<(i64, usize)>,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Cards: {}", self.cards)?;
        for (rarity, n) in &self.by_rarity {
            writeln!(f, "    rarity {}: {}", rarity, n)?;
        }
        writeln!(f, "  Users: {}", self.users)?;
        writeln!(f, "  Ownership rows: {}", self.ownership_rows)
    }
}
