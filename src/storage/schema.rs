//! Database schema definitions

/// Built-in DDL executed by `SqliteStore::bootstrap`.
///
/// `user_card` has no foreign keys and no cascade: removing a user or a card
/// deletes its ownership rows explicitly.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS card (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    type TEXT NOT NULL,
    rarity INTEGER NOT NULL,
    attack INTEGER NOT NULL,
    defense INTEGER NOT NULL,
    health INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    discord_id TEXT NOT NULL UNIQUE,
    unknown_cards INTEGER NOT NULL DEFAULT 0
);

-- a row exists only while owned_amount > 0
CREATE TABLE IF NOT EXISTS user_card (
    user_id INTEGER NOT NULL,
    card_id INTEGER NOT NULL,
    owned_amount INTEGER NOT NULL CHECK (owned_amount > 0),
    PRIMARY KEY (user_id, card_id)
);

CREATE INDEX IF NOT EXISTS idx_card_type ON card(type);
CREATE INDEX IF NOT EXISTS idx_user_card_card ON user_card(card_id);
"#;

/// Split a DDL script into individual statements.
///
/// Splits on `;`, except inside quoted literals or identifiers, `--` and
/// `/* */` comments, and the `BEGIN ... END` body of a `CREATE TRIGGER`.
/// Comments are stripped; blank fragments are dropped.
pub fn split_statements(ddl: &str) -> Vec<String> {
    let mut splitter = Splitter::default();
    let mut lexeme = Lexeme::Code;
    let mut prev = '\0';

    for c in ddl.chars() {
        match lexeme {
            Lexeme::LineComment => {
                if c == '\n' {
                    lexeme = Lexeme::Code;
                    splitter.current.push(c);
                }
            }
            Lexeme::BlockComment => {
                if prev == '*' && c == '/' {
                    lexeme = Lexeme::Code;
                    splitter.current.push(' ');
                    prev = '\0';
                    continue;
                }
            }
            Lexeme::Quoted(close) => {
                splitter.current.push(c);
                if c == close {
                    lexeme = Lexeme::Code;
                }
            }
            Lexeme::Code => match c {
                '-' if prev == '-' => {
                    splitter.current.pop();
                    lexeme = Lexeme::LineComment;
                }
                '*' if prev == '/' => {
                    splitter.current.pop();
                    lexeme = Lexeme::BlockComment;
                    prev = '\0';
                    continue;
                }
                '\'' | '"' | '`' | '[' => {
                    splitter.end_word();
                    lexeme = Lexeme::Quoted(if c == '[' { ']' } else { c });
                    splitter.current.push(c);
                }
                ';' => {
                    splitter.end_word();
                    if splitter.trigger_depth == 0 {
                        splitter.finish();
                    } else {
                        splitter.current.push(c);
                    }
                }
                c if c.is_alphanumeric() || c == '_' => {
                    splitter.word.push(c);
                    splitter.current.push(c);
                }
                _ => {
                    splitter.end_word();
                    splitter.current.push(c);
                }
            },
        }
        prev = c;
    }

    splitter.end_word();
    splitter.finish();
    splitter.statements
}

/// True for statements that open or close a transaction
pub fn is_transaction_control(statement: &str) -> bool {
    let first = statement
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .find(|w| !w.is_empty())
        .unwrap_or("");
    ["BEGIN", "COMMIT", "END", "ROLLBACK"]
        .iter()
        .any(|kw| first.eq_ignore_ascii_case(kw))
}

#[derive(Clone, Copy)]
enum Lexeme {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

#[derive(Default)]
struct Splitter {
    statements: Vec<String>,
    current: String,
    word: String,
    /// First three words of the current statement, uppercased
    leading: Vec<String>,
    /// Open `BEGIN`/`CASE` blocks inside a trigger body
    trigger_depth: usize,
}

impl Splitter {
    fn end_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let word = std::mem::take(&mut self.word).to_ascii_uppercase();
        if self.leading.len() < 3 {
            self.leading.push(word);
            return;
        }
        if !self.in_trigger() {
            return;
        }
        match word.as_str() {
            "BEGIN" => self.trigger_depth += 1,
            "CASE" if self.trigger_depth > 0 => self.trigger_depth += 1,
            "END" => self.trigger_depth = self.trigger_depth.saturating_sub(1),
            _ => {}
        }
    }

    fn in_trigger(&self) -> bool {
        match self.leading.as_slice() {
            [create, trigger, ..] if create == "CREATE" && trigger == "TRIGGER" => true,
            [create, temp, trigger]
                if create == "CREATE" && (temp == "TEMP" || temp == "TEMPORARY") && trigger == "TRIGGER" =>
            {
                true
            }
            _ => false,
        }
    }

    fn finish(&mut self) {
        let trimmed = self.current.trim();
        if !trimmed.is_empty() {
            self.statements.push(trimmed.to_string());
        }
        self.current.clear();
        self.leading.clear();
        self.trigger_depth = 0;
    }
}
