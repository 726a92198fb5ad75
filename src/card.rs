//! Card types and the card table accessor
//!
//! A card has an immutable generated `id` and mutable attributes:
//! title, description, type, rarity (1 = common, 10 = rarest),
//! attack, defense and health.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use crate::{Error, Result};
use crate::ownership::Reconciler;
use crate::storage::{Filter, Record, SqliteStore};

pub const TABLE: &str = "card";

/// Rarity bounds, inclusive
pub const MIN_RARITY: i64 = 1;
pub const MAX_RARITY: i64 = 10;

/// A stored card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub card_type: String,
    pub rarity: i64,
    pub attack: i64,
    pub defense: i64,
    pub health: i64,
}

impl Card {
    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.get_i64("id")?,
            title: record.get_text("title")?,
            description: record.get_text("description")?,
            card_type: record.get_text("type")?,
            rarity: record.get_i64("rarity")?,
            attack: record.get_i64("attack")?,
            defense: record.get_i64("defense")?,
            health: record.get_i64("health")?,
        })
    }
}

/// Card attributes as sent by a client.
///
/// Every field is required on create; any subset may be sent on update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub rarity: Option<i64>,
    pub attack: Option<i64>,
    pub defense: Option<i64>,
    pub health: Option<i64>,
}

impl CardInput {
    /// Names of required fields that are absent
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("type", self.card_type.is_some()),
            ("rarity", self.rarity.is_some()),
            ("attack", self.attack.is_some()),
            ("defense", self.defense.is_some()),
            ("health", self.health.is_some()),
        ];
        present
            .into_iter()
            .filter(|(_, is_set)| !is_set)
            .map(|(name, _)| name)
            .collect()
    }

    /// Validated `(columns, values)` for the fields that are set
    fn assignments(&self) -> Result<(Vec<&'static str>, Vec<Value>)> {
        let mut columns = Vec::new();
        let mut values = Vec::new();

        for (column, text) in [
            ("title", &self.title),
            ("description", &self.description),
            ("type", &self.card_type),
        ] {
            if let Some(text) = text {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(Error::Validation(format!("{} cannot be empty", column)));
                }
                columns.push(column);
                values.push(Value::Text(trimmed.to_string()));
            }
        }

        if let Some(rarity) = self.rarity {
            if !(MIN_RARITY..=MAX_RARITY).contains(&rarity) {
                return Err(Error::Validation(format!(
                    "rarity must be between {} and {}",
                    MIN_RARITY, MAX_RARITY
                )));
            }
            columns.push("rarity");
            values.push(Value::Integer(rarity));
        }

        for (column, stat) in [
            ("attack", self.attack),
            ("defense", self.defense),
            ("health", self.health),
        ] {
            if let Some(stat) = stat {
                if stat < 0 {
                    return Err(Error::Validation(format!("{} cannot be negative", column)));
                }
                columns.push(column);
                values.push(Value::Integer(stat));
            }
        }

        Ok((columns, values))
    }
}

/// Optional equality filters for listing cards
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardQuery {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub rarity: Option<i64>,
}

impl CardQuery {
    fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(title) = &self.title {
            filter = filter.eq("title", title.clone());
        }
        if let Some(card_type) = &self.card_type {
            filter = filter.eq("type", card_type.clone());
        }
        if let Some(rarity) = self.rarity {
            filter = filter.eq("rarity", rarity);
        }
        filter
    }
}

/// Typed access to the card table
pub struct CardStore<'a> {
    store: &'a SqliteStore,
}

impl<'a> CardStore<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Create a card; all attributes are required
    pub fn create(&self, input: &CardInput) -> Result<Card> {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }
        let (columns, values) = input.assignments()?;
        let id = self.store.insert(TABLE, &columns, values)?;
        tracing::info!("Created card {}", id);
        self.get(id)
    }

    pub fn get(&self, id: i64) -> Result<Card> {
        self.find(id)?.ok_or_else(|| Error::not_found("card", id))
    }

    pub fn find(&self, id: i64) -> Result<Option<Card>> {
        let rows = self.store.select(TABLE, &["*"], Some(&Filter::new().eq("id", id)))?;
        rows.first().map(Card::from_record).transpose()
    }

    pub fn list(&self, query: &CardQuery) -> Result<Vec<Card>> {
        let filter = query.to_filter();
        let rows = self.store.select(TABLE, &["*"], Some(&filter))?;
        rows.iter().map(Card::from_record).collect()
    }

    /// Apply a partial update and return the updated card
    pub fn update(&self, id: i64, input: &CardInput) -> Result<Card> {
        let (columns, values) = input.assignments()?;
        if columns.is_empty() {
            return Err(Error::Validation("no fields to update".to_string()));
        }
        let changed = self.store.update(TABLE, &columns, values, &Filter::new().eq("id", id))?;
        if changed == 0 {
            return Err(Error::not_found("card", id));
        }
        self.get(id)
    }

    /// Delete a card together with every ownership row that references it
    pub fn delete(&self, id: i64) -> Result<()> {
        self.store.with_transaction(|store| {
            let released = Reconciler::new(store).release_all_for_card(id)?;
            let removed = store.delete(TABLE, &Filter::new().eq("id", id))?;
            if removed == 0 {
                return Err(Error::not_found("card", id));
            }
            tracing::info!("Deleted card {} ({} ownership rows)", id, released);
            Ok(())
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_input(title: &str, rarity: i64) -> CardInput {
        CardInput {
            title: Some(title.to_string()),
            description: Some(format!("{} description", title)),
            card_type: Some("fire".to_string()),
            rarity: Some(rarity),
            attack: Some(40),
            defense: Some(12),
            health: Some(300),
        }
    }

    fn store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.bootstrap().unwrap();
        store
    }

    #[test]
    fn test_create_then_get_matches_input() {
        let store = store();
        let cards = CardStore::new(&store);

        let created = cards.create(&sample_input("Ember Fox", 4)).unwrap();
        let fetched = cards.get(created.id).unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.title, "Ember Fox");
        assert_eq!(fetched.card_type, "fire");
        assert_eq!(fetched.rarity, 4);
        assert_eq!((fetched.attack, fetched.defense, fetched.health), (40, 12, 300));
    }

    #[test]
    fn test_create_reports_missing_fields() {
        let store = store();
        let input = CardInput {
            title: Some("Half a card".to_string()),
            attack: Some(1),
            ..Default::default()
        };

        let err = CardStore::new(&store).create(&input).unwrap_err();
        match err {
            Error::Validation(message) => {
                assert!(message.contains("description"));
                assert!(message.contains("type"));
                assert!(!message.contains("title"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_rarity_out_of_range_rejected() {
        let store = store();
        let err = CardStore::new(&store).create(&sample_input("Too Rare", 11)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_list_filters_by_type_and_rarity() {
        let store = store();
        let cards = CardStore::new(&store);
        cards.create(&sample_input("Ember Fox", 4)).unwrap();
        cards.create(&sample_input("Cinder Wolf", 7)).unwrap();
        let mut water = sample_input("Tide Crab", 4);
        water.card_type = Some("water".to_string());
        cards.create(&water).unwrap();

        assert_eq!(cards.list(&CardQuery::default()).unwrap().len(), 3);

        let query = CardQuery {
            card_type: Some("fire".to_string()),
            rarity: Some(4),
            ..Default::default()
        };
        let found = cards.list(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Ember Fox");
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let store = store();
        let cards = CardStore::new(&store);
        let card = cards.create(&sample_input("Ember Fox", 4)).unwrap();

        let patch = CardInput {
            attack: Some(99),
            ..Default::default()
        };
        let updated = cards.update(card.id, &patch).unwrap();
        assert_eq!(updated.attack, 99);
        assert_eq!(updated.title, "Ember Fox");
        assert_eq!(updated.health, 300);
    }

    #[test]
    fn test_update_and_delete_missing_card() {
        let store = store();
        let cards = CardStore::new(&store);
        let patch = CardInput {
            attack: Some(1),
            ..Default::default()
        };
        assert!(matches!(cards.update(42, &patch), Err(Error::NotFound { .. })));
        assert!(matches!(cards.delete(42), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_empty_patch_rejected() {
        let store = store();
        let cards = CardStore::new(&store);
        let card = cards.create(&sample_input("Ember Fox", 4)).unwrap();
        assert!(matches!(cards.update(card.id, &CardInput::default()), Err(Error::Validation(_))));
    }
}
