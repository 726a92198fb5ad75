//! User types and the user table accessor

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use crate::{Error, Result};
use crate::ownership::Reconciler;
use crate::storage::{Filter, Record, SqliteStore};

pub const TABLE: &str = "user";

/// A stored user.
///
/// `name` and `discord_id` are unique. `unknown_cards` is the pool of
/// unrevealed cards the user can open with a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub discord_id: String,
    pub unknown_cards: i64,
}

impl User {
    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.get_i64("id")?,
            name: record.get_text("name")?,
            discord_id: record.get_text("discord_id")?,
            unknown_cards: record.get_i64("unknown_cards")?,
        })
    }
}

/// User attributes as sent by a client.
///
/// `name` and `discord_id` are required on create; `unknown_cards` defaults
/// to 0.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub discord_id: Option<String>,
    pub unknown_cards: Option<i64>,
}

impl UserInput {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.discord_id.is_none() {
            missing.push("discord_id");
        }
        missing
    }

    fn assignments(&self) -> Result<(Vec<&'static str>, Vec<Value>)> {
        let mut columns = Vec::new();
        let mut values = Vec::new();

        for (column, text) in [("name", &self.name), ("discord_id", &self.discord_id)] {
            if let Some(text) = text {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(Error::Validation(format!("{} cannot be empty", column)));
                }
                columns.push(column);
                values.push(Value::Text(trimmed.to_string()));
            }
        }

        if let Some(pool) = self.unknown_cards {
            if pool < 0 {
                return Err(Error::Validation("unknown_cards cannot be negative".to_string()));
            }
            columns.push("unknown_cards");
            values.push(Value::Integer(pool));
        }

        Ok((columns, values))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub name: Option<String>,
    pub discord_id: Option<String>,
}

impl UserQuery {
    fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(name) = &self.name {
            filter = filter.eq("name", name.clone());
        }
        if let Some(discord_id) = &self.discord_id {
            filter = filter.eq("discord_id", discord_id.clone());
        }
        filter
    }
}

/// Typed access to the user table
pub struct UserStore<'a> {
    store: &'a SqliteStore,
}

impl<'a> UserStore<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Create a user. A duplicate `name` or `discord_id` is a `Conflict`.
    pub fn create(&self, input: &UserInput) -> Result<User> {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }
        let (columns, values) = input.assignments()?;
        let id = self.store.insert(TABLE, &columns, values)?;
        tracing::info!("Created user {}", id);
        self.get(id)
    }

    pub fn get(&self, id: i64) -> Result<User> {
        self.find(id)?.ok_or_else(|| Error::not_found("user", id))
    }

    pub fn find(&self, id: i64) -> Result<Option<User>> {
        let rows = self.store.select(TABLE, &["*"], Some(&Filter::new().eq("id", id)))?;
        rows.first().map(User::from_record).transpose()
    }

    pub fn list(&self, query: &UserQuery) -> Result<Vec<User>> {
        let rows = self.store.select(TABLE, &["*"], Some(&query.to_filter()))?;
        rows.iter().map(User::from_record).collect()
    }

    pub fn update(&self, id: i64, input: &UserInput) -> Result<User> {
        let (columns, values) = input.assignments()?;
        if columns.is_empty() {
            return Err(Error::Validation("no fields to update".to_string()));
        }
        let changed = self.store.update(TABLE, &columns, values, &Filter::new().eq("id", id))?;
        if changed == 0 {
            return Err(Error::not_found("user", id));
        }
        self.get(id)
    }

    /// Take `count` cards out of the user's unknown pool.
    ///
    /// Fails with `Validation` if the pool holds fewer than `count`.
    pub fn take_unknown_cards(&self, id: i64, count: i64) -> Result<i64> {
        if count < 1 {
            return Err(Error::Validation(format!("cannot open {} unknown card(s)", count)));
        }
        let user = self.get(id)?;
        if user.unknown_cards < count {
            return Err(Error::Validation(format!(
                "user {} has {} unknown card(s), cannot open {}",
                id, user.unknown_cards, count
            )));
        }
        let remaining = user.unknown_cards - count;
        self.store.update(
            TABLE,
            &["unknown_cards"],
            vec![Value::Integer(remaining)],
            &Filter::new().eq("id", id),
        )?;
        Ok(remaining)
    }

    /// Delete a user and, explicitly, every ownership row they hold
    pub fn delete(&self, id: i64) -> Result<()> {
        self.store.with_transaction(|store| {
            let released = Reconciler::new(store).release_all_for_user(id)?;
            let removed = store.delete(TABLE, &Filter::new().eq("id", id))?;
            if removed == 0 {
                return Err(Error::not_found("user", id));
            }
            tracing::info!("Deleted user {} ({} ownership rows)", id, released);
            Ok(())
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_input(name: &str, discord_id: &str) -> UserInput {
        UserInput {
            name: Some(name.to_string()),
            discord_id: Some(discord_id.to_string()),
            unknown_cards: None,
        }
    }

    fn store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.bootstrap().unwrap();
        store
    }

    #[test]
    fn test_create_defaults_unknown_pool() {
        let store = store();
        let user = UserStore::new(&store).create(&sample_input("ash", "dc1")).unwrap();
        assert_eq!(user.name, "ash");
        assert_eq!(user.unknown_cards, 0);
    }

    #[test]
    fn test_same_discord_id_conflicts() {
        let store = store();
        let users = UserStore::new(&store);
        users.create(&sample_input("ash", "dc1")).unwrap();

        let err = users.create(&sample_input("misty", "dc1")).unwrap_err();
        assert!(matches!(err, Error::Conflict { ref field } if field == "discord_id"));
    }

    #[test]
    fn test_missing_discord_id_is_validation_error() {
        let store = store();
        let input = UserInput {
            name: Some("ash".to_string()),
            ..Default::default()
        };
        let err = UserStore::new(&store).create(&input).unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("discord_id")));
    }

    #[test]
    fn test_list_by_name() {
        let store = store();
        let users = UserStore::new(&store);
        users.create(&sample_input("ash", "dc1")).unwrap();
        users.create(&sample_input("misty", "dc2")).unwrap();

        let query = UserQuery {
            name: Some("misty".to_string()),
            ..Default::default()
        };
        let found = users.list(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].discord_id, "dc2");
    }

    #[test]
    fn test_update_to_taken_name_conflicts() {
        let store = store();
        let users = UserStore::new(&store);
        users.create(&sample_input("ash", "dc1")).unwrap();
        let misty = users.create(&sample_input("misty", "dc2")).unwrap();

        let patch = UserInput {
            name: Some("ash".to_string()),
            ..Default::default()
        };
        assert!(matches!(users.update(misty.id, &patch), Err(Error::Conflict { .. })));
    }

    #[test]
    fn test_take_unknown_cards() {
        let store = store();
        let users = UserStore::new(&store);
        let mut input = sample_input("ash", "dc1");
        input.unknown_cards = Some(3);
        let user = users.create(&input).unwrap();

        assert_eq!(users.take_unknown_cards(user.id, 2).unwrap(), 1);
        assert!(matches!(users.take_unknown_cards(user.id, 2), Err(Error::Validation(_))));
        assert_eq!(users.get(user.id).unwrap().unknown_cards, 1);
    }

    #[test]
    fn test_take_unknown_cards_rejects_non_positive_count() {
        let store = store();
        let users = UserStore::new(&store);
        let mut input = sample_input("ash", "dc1");
        input.unknown_cards = Some(3);
        let user = users.create(&input).unwrap();

        assert!(matches!(users.take_unknown_cards(user.id, -5), Err(Error::Validation(_))));
        assert!(matches!(users.take_unknown_cards(user.id, 0), Err(Error::Validation(_))));
        assert_eq!(users.get(user.id).unwrap().unknown_cards, 3);
    }

    #[test]
    fn test_delete_missing_user() {
        let store = store();
        assert!(matches!(UserStore::new(&store).delete(7), Err(Error::NotFound { .. })));
    }
}
