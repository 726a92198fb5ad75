//! Terminal output for the CLI

pub mod icons;
pub mod output;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, rarity_row, stats, success, summary_row};
pub use theme::{theme, Theme, Tier};
