use owo_colors::Style;
use std::sync::OnceLock;

use crate::card::{MAX_RARITY, MIN_RARITY};

static THEME: OnceLock<Theme> = OnceLock::new();

/// Rarity bands used when coloring card counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Common,
    Rare,
    Legendary,
}

impl Tier {
    pub fn of(rarity: i64) -> Self {
        match rarity.clamp(MIN_RARITY, MAX_RARITY) {
            ..=4 => Tier::Common,
            5..=8 => Tier::Rare,
            _ => Tier::Legendary,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Common => "common",
            Tier::Rare => "rare",
            Tier::Legendary => "legendary",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub label: Style,
    pub common: Style,
    pub rare: Style,
    pub legendary: Style,
}

impl Theme {
    /// Colors only when stdout is a terminal and `NO_COLOR` is unset
    pub fn detect() -> Self {
        if std::env::var_os("NO_COLOR").is_some() || !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            label: Style::new().white().dimmed(),
            common: Style::new().white(),
            rare: Style::new().blue().bold(),
            legendary: Style::new().yellow().bold(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            label: Style::new(),
            common: Style::new(),
            rare: Style::new(),
            legendary: Style::new(),
        }
    }

    pub fn tier(&self, tier: Tier) -> Style {
        match tier {
            Tier::Common => self.common,
            Tier::Rare => self.rare,
            Tier::Legendary => self.legendary,
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_cover_the_rarity_range() {
        assert_eq!(Tier::of(MIN_RARITY), Tier::Common);
        assert_eq!(Tier::of(4), Tier::Common);
        assert_eq!(Tier::of(5), Tier::Rare);
        assert_eq!(Tier::of(8), Tier::Rare);
        assert_eq!(Tier::of(MAX_RARITY), Tier::Legendary);
        assert_eq!(Tier::of(42), Tier::Legendary);
        assert_eq!(Tier::of(-3).label(), "common");
    }
}
