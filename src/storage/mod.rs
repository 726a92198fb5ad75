//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - card(id, title, description, type, rarity, attack, defense, health)
//! - user(id, name, discord_id, unknown_cards)
//! - user_card(user_id, card_id, owned_amount)

pub mod query;
pub mod schema;
pub mod sqlite;

pub use query::{Condition, Filter, Op, Statement};
pub use sqlite::{DbStats, Record, SqliteStore, DEFAULT_BUSY_TIMEOUT};
