use crate::storage::DbStats;
use crate::ui::{theme, Icons, Tier};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::CARDS, text.style(theme().header));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", Icons::INFO, label.style(theme().label), value);
}

pub fn summary_row(icon: &str, label: &str, value: usize) {
    println!("  {} {} {}", icon, label.style(theme().label), value);
}

/// One line per rarity, colored by tier
pub fn rarity_row(rarity: i64, cards: usize) {
    let tier = Tier::of(rarity);
    let label = format!("rarity {:>2} ({})", rarity, tier.label());
    println!("      {} {}", label.style(theme().tier(tier)), cards);
}

pub fn stats(stats: &DbStats) {
    println!("{} {}", Icons::STATS, "Database Statistics".style(theme().header));
    summary_row(Icons::CARDS, "Cards:", stats.cards);
    for (rarity, cards) in &stats.by_rarity {
        rarity_row(*rarity, *cards);
    }
    summary_row(Icons::PERSON, "Users:", stats.users);
    summary_row(Icons::DATABASE, "Ownership rows:", stats.ownership_rows);
}
