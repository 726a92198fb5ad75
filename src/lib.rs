//! # Cardstash - Trading-card collection service
//!
//! Cards, users and the "user owns card" relationship kept in a single
//! SQLite file.
//!
//! Cardstash provides:
//! - A query builder that turns table/column/value/filter descriptions into
//!   parameterized statements
//! - A SQLite storage accessor with transactional schema bootstrap
//! - An ownership reconciler that keeps per-(user, card) owned counts
//! - Rarity-weighted gacha draws
//! - An HTTP API over all of the above

pub mod storage;
pub mod card;
pub mod user;
pub mod ownership;
pub mod gacha;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use card::{Card, CardStore};
pub use user::{User, UserStore};
pub use ownership::{Ownership, Reconciler};
pub use storage::{Filter, SqliteStore, Statement};

/// Result type alias for Cardstash operations
pub type Result<T> = std::result::Result<T, Error>;

/// One statement of a DDL script that failed during schema bootstrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    /// Zero-based position of the statement in the script
    pub index: usize,
    pub statement: String,
    pub message: String,
}

impl std::fmt::Display for StatementFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} `{}`: {}", self.index, self.statement, self.message)
    }
}

/// Error types for Cardstash operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Schema bootstrap failed ({} statement(s)): {}", .0.len(), join_failures(.0))]
    Schema(Vec<StatementFailure>),

    #[error("Conflict: {field} already exists")]
    Conflict { field: String },

    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Error::NotFound { resource, id: id.to_string() }
    }
}

fn join_failures(failures: &[StatementFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match conflicting_field(&err) {
            Some(field) => Error::Conflict { field },
            None => Error::Storage(err),
        }
    }
}

/// Extract the column named by a UNIQUE / PRIMARY KEY violation.
///
/// SQLite reports these as `UNIQUE constraint failed: user.discord_id`
/// (composite keys list every column, comma separated).
fn conflicting_field(err: &rusqlite::Error) -> Option<String> {
    let rusqlite::Error::SqliteFailure(code, Some(message)) = err else {
        return None;
    };
    if code.code != rusqlite::ErrorCode::ConstraintViolation {
        return None;
    }
    if code.extended_code != rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        && code.extended_code != rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    {
        return None;
    }

    let columns = message.split_once(": ").map(|(_, rest)| rest).unwrap_or(message.as_str());
    let field = columns
        .split(',')
        .map(|qualified| qualified.trim().rsplit('.').next().unwrap_or(qualified).trim())
        .collect::<Vec<_>>()
        .join(", ");
    Some(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_violation(message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some(message.to_string()),
        )
    }

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let err: Error = unique_violation("UNIQUE constraint failed: user.discord_id").into();
        match err {
            Error::Conflict { field } => assert_eq!(field, "discord_id"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_composite_key_lists_every_column() {
        let err: Error =
            unique_violation("UNIQUE constraint failed: user_card.user_id, user_card.card_id").into();
        assert!(matches!(err, Error::Conflict { ref field } if field == "user_id, card_id"));
    }

    #[test]
    fn test_other_sqlite_errors_stay_storage_errors() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_schema_error_lists_failures() {
        let err = Error::Schema(vec![StatementFailure {
            index: 2,
            statement: "CREATE TABLE".into(),
            message: "incomplete input".into(),
        }]);
        let text = err.to_string();
        assert!(text.contains("1 statement(s)"));
        assert!(text.contains("#2 `CREATE TABLE`: incomplete input"));
    }
}
