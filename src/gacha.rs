//! Gacha draws - rarity-weighted random cards
//!
//! A card of rarity `r` is drawn with weight `MAX_RARITY + 1 - r`, so
//! rarity 1 is ten times as likely as rarity 10.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use crate::{Error, Result};
use crate::card::{Card, CardQuery, CardStore, MAX_RARITY, MIN_RARITY};
use crate::ownership::Reconciler;
use crate::storage::SqliteStore;
use crate::user::UserStore;

/// Most cards a single draw request may open
pub const MAX_DRAW: i64 = 50;

pub fn weight(rarity: i64) -> u32 {
    (MAX_RARITY + 1 - rarity.clamp(MIN_RARITY, MAX_RARITY)) as u32
}

/// Picks cards from the catalogue
pub struct Gacha<'a> {
    store: &'a SqliteStore,
}

impl<'a> Gacha<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Draw `count` cards, with replacement
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Result<Vec<Card>> {
        let pool = CardStore::new(self.store).list(&CardQuery::default())?;
        if pool.is_empty() {
            return Err(Error::not_found("card", "any"));
        }
        let dist = WeightedIndex::new(pool.iter().map(|c| weight(c.rarity)))
            .map_err(|e| Error::Validation(format!("cannot weight card pool: {}", e)))?;

        Ok((0..count).map(|_| pool[dist.sample(rng)].clone()).collect())
    }

    /// Open `count` of a user's unknown cards.
    ///
    /// Takes them from the user's pool, draws that many cards and adds each
    /// one to the user's collection, all in one transaction.
    pub fn open_unknown<R: Rng + ?Sized>(&self, rng: &mut R, user_id: i64, count: i64) -> Result<Vec<Card>> {
        if !(1..=MAX_DRAW).contains(&count) {
            return Err(Error::Validation(format!(
                "count must be between 1 and {}",
                MAX_DRAW
            )));
        }

        self.store.with_transaction(|store| {
            let remaining = UserStore::new(store).take_unknown_cards(user_id, count)?;
            let drawn = self.draw(rng, count as usize)?;

            let reconciler = Reconciler::new(store);
            for card in &drawn {
                reconciler.acquire(user_id, card.id)?;
            }
            tracing::info!(user_id, opened = drawn.len(), remaining, "opened unknown cards");
            Ok(drawn)
        })
    }
}
