pub struct Icons;

impl Icons {
    pub const CARDS: &str = "🃏";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const DATABASE: &str = "🗄️";
    pub const PERSON: &str = "👤";
    pub const WRENCH: &str = "🔧";
}
