//! Ownership reconciliation - how many copies of a card a user holds
//!
//! Each (user, card) pair is either absent or owned `n >= 1` times:
//!
//! ```text
//!   Absent --acquire--> Owned(1) --acquire--> Owned(2) ...
//!   Absent <--release-- Owned(1) <--release-- Owned(2) ...
//! ```
//!
//! A `user_card` row exists iff the amount is positive; it is deleted
//! instead of being left at zero.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use crate::{Error, Result};
use crate::card::{Card, CardStore};
use crate::storage::{query, Filter, SqliteStore, Statement};
use crate::user::UserStore;

pub const TABLE: &str = "user_card";

/// Current state of one (user, card) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub user_id: i64,
    pub card_id: i64,
    pub owned_amount: i64,
}

/// A card in a user's collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    #[serde(flatten)]
    pub card: Card,
    pub owned_amount: i64,
}

fn pair(user_id: i64, card_id: i64) -> Filter {
    Filter::new().eq("user_id", user_id).eq("card_id", card_id)
}

/// Keeps owned counts consistent on top of a storage handle
pub struct Reconciler<'a> {
    store: &'a SqliteStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Add one copy of `card_id` to `user_id`'s collection.
    ///
    /// A single upsert statement, so concurrent acquires on the same pair
    /// cannot lose an increment.
    pub fn acquire(&self, user_id: i64, card_id: i64) -> Result<Ownership> {
        UserStore::new(self.store).get(user_id)?;
        CardStore::new(self.store).get(card_id)?;

        let stmt = query::build_increment_upsert(
            TABLE,
            &["user_id", "card_id"],
            vec![Value::Integer(user_id), Value::Integer(card_id)],
            "owned_amount",
        )?;
        self.store.execute(&stmt)?;

        let owned_amount = self.owned_amount(user_id, card_id)?;
        tracing::debug!(user_id, card_id, owned_amount, "acquired");
        Ok(Ownership { user_id, card_id, owned_amount })
    }

    /// Remove one copy and return how many remain.
    ///
    /// The last copy deletes the row. Releasing a pair the user does not
    /// own is `NotFound`.
    pub fn release(&self, user_id: i64, card_id: i64) -> Result<i64> {
        self.store.with_transaction(|store| {
            let key = pair(user_id, card_id);
            let remaining = match self.owned_amount(user_id, card_id)? {
                0 => {
                    return Err(Error::not_found(
                        "ownership",
                        format!("{}/{}", user_id, card_id),
                    ));
                }
                1 => {
                    store.delete(TABLE, &key)?;
                    0
                }
                n => {
                    store.update(TABLE, &["owned_amount"], vec![Value::Integer(n - 1)], &key)?;
                    n - 1
                }
            };
            tracing::debug!(user_id, card_id, remaining, "released");
            Ok(remaining)
        })
    }

    /// Copies held; 0 when there is no row
    pub fn owned_amount(&self, user_id: i64, card_id: i64) -> Result<i64> {
        let rows = self
            .store
            .select(TABLE, &["owned_amount"], Some(&pair(user_id, card_id)))?;
        match rows.first() {
            Some(row) => row.get_i64("owned_amount"),
            None => Ok(0),
        }
    }

    /// Every card the user holds, with amounts, ordered by card id
    pub fn holdings(&self, user_id: i64) -> Result<Vec<Holding>> {
        UserStore::new(self.store).get(user_id)?;

        let stmt = Statement::new(
            "SELECT card.*, user_card.owned_amount AS owned_amount \
             FROM user_card JOIN card ON card.id = user_card.card_id \
             WHERE user_card.user_id = ? ORDER BY card.id",
            vec![Value::Integer(user_id)],
        );
        self.store
            .query(&stmt)?
            .iter()
            .map(|row| {
                Ok(Holding {
                    card: Card::from_record(row)?,
                    owned_amount: row.get_i64("owned_amount")?,
                })
            })
            .collect()
    }

    /// Drop every ownership row of a user, returning rows removed
    pub fn release_all_for_user(&self, user_id: i64) -> Result<usize> {
        self.store.delete(TABLE, &Filter::new().eq("user_id", user_id))
    }

    /// Drop every ownership row of a card, returning rows removed
    pub fn release_all_for_card(&self, card_id: i64) -> Result<usize> {
        self.store.delete(TABLE, &Filter::new().eq("card_id", card_id))
    }
}
