/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS sets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    released_at TEXT,
    extra TEXT NOT NULL DEFAULT '{}',
    created_at TEXT,
    updated_at TEXT,
    processed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_sets_code ON sets(code);

CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    set_id TEXT NOT NULL,
    name TEXT,
    version TEXT,
    cost INTEGER,
    strength INTEGER,
    willpower INTEGER,
    lore INTEGER,
    rarity TEXT,
    collector_number TEXT,
    text TEXT,
    flavor_text TEXT,
    released_at TEXT,
    extra TEXT NOT NULL DEFAULT '{}',
    created_at TEXT,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_cards_set_id ON cards(set_id);
CREATE INDEX IF NOT EXISTS idx_cards_name ON cards(name);

-- Set-valued card attributes, one row per value
CREATE TABLE IF NOT EXISTS card_keywords (
    card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    keyword TEXT NOT NULL,
    PRIMARY KEY (card_id, keyword)
);

CREATE TABLE IF NOT EXISTS card_classifications (
    card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    classification TEXT NOT NULL,
    PRIMARY KEY (card_id, classification)
);

CREATE TABLE IF NOT EXISTS card_types (
    card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    card_type TEXT NOT NULL,
    PRIMARY KEY (card_id, card_type)
);

-- Structured sub-records, flattened to key/value rows
CREATE TABLE IF NOT EXISTS card_legalities (
    card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    format TEXT NOT NULL,
    status TEXT,
    PRIMARY KEY (card_id, format)
);

CREATE TABLE IF NOT EXISTS card_prices (
    card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    currency TEXT NOT NULL,
    price TEXT,
    PRIMARY KEY (card_id, currency)
);

-- Mirror of the change ledger
CREATE TABLE IF NOT EXISTS card_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    card_id TEXT NOT NULL,
    card_name TEXT NOT NULL,
    field TEXT NOT NULL,
    old_value TEXT NOT NULL,
    new_value TEXT NOT NULL,
    observed_on TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_card_changes_card_id ON card_changes(card_id);
CREATE INDEX IF NOT EXISTS idx_card_changes_field ON card_changes(field);
"#;

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: MIGRATION_001,
}];
