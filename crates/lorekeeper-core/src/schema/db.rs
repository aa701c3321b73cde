use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::ledger::{ChangeEntry, ChangeLedger};
use crate::model::{Card, CardId, CardSet, SetId};

use super::migrations::MIGRATIONS;

/// Row counts written by [`Database::load_consolidated`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub sets: usize,
    pub cards: usize,
    pub changes: usize,
}

/// A relational mirror of the consolidated output.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Loading
impl Database {
    /// Mirror consolidated sets, cards, and the change ledger.
    ///
    /// Runs in a single transaction. Sets and cards are upserted, so loading
    /// the same output twice leaves the tables unchanged; the change table is
    /// rebuilt from the ledger.
    pub fn load_consolidated(
        &mut self,
        sets: &BTreeMap<SetId, CardSet>,
        cards_by_set: &BTreeMap<SetId, Vec<Card>>,
        ledger: &ChangeLedger,
    ) -> Result<LoadSummary> {
        let tx = self.conn.transaction()?;
        let mut summary = LoadSummary::default();

        for set in sets.values() {
            upsert_set(&tx, set)?;
            summary.sets += 1;
        }

        let mut filed: BTreeMap<&CardId, &SetId> = BTreeMap::new();
        for (set_id, cards) in cards_by_set {
            for card in cards {
                if let Some(other) = filed.insert(&card.id, set_id) {
                    if other != set_id {
                        return Err(Error::InvalidData(format!(
                            "card {} is filed under both {} and {}",
                            card.id, other, set_id
                        )));
                    }
                }
                upsert_card(&tx, set_id, card)?;
                summary.cards += 1;
            }
        }

        tx.execute("DELETE FROM card_changes", [])?;
        for (card_id, history) in ledger.iter() {
            for change in &history.changes {
                tx.execute(
                    "INSERT INTO card_changes
                        (card_id, card_name, field, old_value, new_value, observed_on, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        card_id.as_str(),
                        history.card_name,
                        change.field,
                        serde_json::to_string(&change.old_value)?,
                        serde_json::to_string(&change.new_value)?,
                        change.date.to_string(),
                        change.timestamp.to_rfc3339(),
                    ],
                )?;
                summary.changes += 1;
            }
        }

        tx.commit()?;
        log::info!(
            "Loaded {} sets, {} cards, {} changes",
            summary.sets,
            summary.cards,
            summary.changes
        );
        Ok(summary)
    }
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.to_string())
}

fn upsert_set(tx: &Transaction<'_>, set: &CardSet) -> Result<()> {
    tx.execute(
        "INSERT INTO sets (id, name, code, released_at, extra, created_at, updated_at, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name, code = excluded.code,
            released_at = excluded.released_at, extra = excluded.extra,
            created_at = excluded.created_at, updated_at = excluded.updated_at,
            processed_at = excluded.processed_at",
        params![
            set.id.as_str(),
            set.name,
            set.code,
            set.released_at,
            serde_json::to_string(&set.extra)?,
            date_text(set.created_at),
            date_text(set.updated_at),
            date_text(set.processed_at),
        ],
    )?;
    Ok(())
}

fn upsert_card(tx: &Transaction<'_>, set_id: &SetId, card: &Card) -> Result<()> {
    tx.execute(
        "INSERT INTO cards (
            id, set_id, name, version, cost, strength, willpower, lore, rarity,
            collector_number, text, flavor_text, released_at, extra, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
         ON CONFLICT(id) DO UPDATE SET
            set_id = excluded.set_id, name = excluded.name, version = excluded.version,
            cost = excluded.cost, strength = excluded.strength,
            willpower = excluded.willpower, lore = excluded.lore,
            rarity = excluded.rarity, collector_number = excluded.collector_number,
            text = excluded.text, flavor_text = excluded.flavor_text,
            released_at = excluded.released_at, extra = excluded.extra,
            created_at = excluded.created_at, updated_at = excluded.updated_at",
        params![
            card.id.as_str(),
            set_id.as_str(),
            card.name,
            card.version,
            card.cost,
            card.strength,
            card.willpower,
            card.lore,
            card.rarity,
            card.collector_number,
            card.text,
            card.flavor_text,
            card.released_at,
            serde_json::to_string(&card.extra)?,
            date_text(card.created_at),
            date_text(card.updated_at),
        ],
    )?;

    let id = card.id.as_str();
    replace_values(tx, "card_keywords", "keyword", id, card.keywords.as_deref())?;
    replace_values(
        tx,
        "card_classifications",
        "classification",
        id,
        card.classifications.as_deref(),
    )?;
    replace_values(tx, "card_types", "card_type", id, card.card_type.as_deref())?;
    replace_pairs(tx, "card_legalities", "format", "status", id, card.legalities.as_ref())?;
    replace_pairs(tx, "card_prices", "currency", "price", id, card.prices.as_ref())?;
    Ok(())
}

fn replace_values(
    tx: &Transaction<'_>,
    table: &str,
    column: &str,
    card_id: &str,
    values: Option<&[String]>,
) -> Result<()> {
    tx.execute(&format!("DELETE FROM {table} WHERE card_id = ?1"), [card_id])?;
    let sql = format!("INSERT OR IGNORE INTO {table} (card_id, {column}) VALUES (?1, ?2)");
    for value in values.unwrap_or_default() {
        tx.execute(&sql, params![card_id, value])?;
    }
    Ok(())
}

fn replace_pairs(
    tx: &Transaction<'_>,
    table: &str,
    key_column: &str,
    value_column: &str,
    card_id: &str,
    pairs: Option<&BTreeMap<String, Value>>,
) -> Result<()> {
    tx.execute(&format!("DELETE FROM {table} WHERE card_id = ?1"), [card_id])?;
    let sql =
        format!("INSERT INTO {table} (card_id, {key_column}, {value_column}) VALUES (?1, ?2, ?3)");
    for (key, value) in pairs.into_iter().flatten() {
        let text = match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        };
        tx.execute(&sql, params![card_id, key, text])?;
    }
    Ok(())
}

// Queries
impl Database {
    pub fn count_sets(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sets", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn count_cards(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Fetch a card with its set-valued and structured attributes.
    pub fn get_card(&self, card_id: &CardId) -> Result<Option<Card>> {
        let card = self
            .conn
            .query_row(
                "SELECT id, name, version, cost, strength, willpower, lore, rarity,
                        collector_number, text, flavor_text, released_at, extra,
                        created_at, updated_at
                 FROM cards WHERE id = ?1",
                [card_id.as_str()],
                row_to_card,
            )
            .optional()?;

        let Some(mut card) = card else {
            return Ok(None);
        };

        card.keywords = self.values_for(card_id, "card_keywords", "keyword")?;
        card.classifications =
            self.values_for(card_id, "card_classifications", "classification")?;
        card.card_type = self.values_for(card_id, "card_types", "card_type")?;
        card.legalities = self.pairs_for(card_id, "card_legalities", "format", "status")?;
        card.prices = self.pairs_for(card_id, "card_prices", "currency", "price")?;
        Ok(Some(card))
    }

    fn values_for(
        &self,
        card_id: &CardId,
        table: &str,
        column: &str,
    ) -> Result<Option<Vec<String>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column} FROM {table} WHERE card_id = ?1 ORDER BY rowid"
        ))?;
        let values = stmt
            .query_map([card_id.as_str()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok((!values.is_empty()).then_some(values))
    }

    fn pairs_for(
        &self,
        card_id: &CardId,
        table: &str,
        key_column: &str,
        value_column: &str,
    ) -> Result<Option<BTreeMap<String, Value>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {key_column}, {value_column} FROM {table} WHERE card_id = ?1"
        ))?;
        let pairs = stmt
            .query_map([card_id.as_str()], |row| {
                let key: String = row.get(0)?;
                let value: Option<String> = row.get(1)?;
                Ok((key, value.map_or(Value::Null, Value::String)))
            })?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
        Ok((!pairs.is_empty()).then_some(pairs))
    }

    /// All mirrored changes for a card, oldest first.
    pub fn changes_for_card(&self, card_id: &CardId) -> Result<Vec<ChangeEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT field, old_value, new_value, observed_on, recorded_at
             FROM card_changes
             WHERE card_id = ?1
             ORDER BY id",
        )?;

        let changes = stmt
            .query_map([card_id.as_str()], row_to_change)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(changes)
    }
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_date(idx: usize, text: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    text.map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn parse_json(idx: usize, text: &str) -> rusqlite::Result<Value> {
    serde_json::from_str(text).map_err(|e| conversion_error(idx, e))
}

fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<Card> {
    let id: String = row.get(0)?;
    let extra_text: String = row.get(12)?;
    let extra = match parse_json(12, &extra_text)? {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };

    let mut card = Card::new(id.as_str(), String::new());
    card.name = row.get(1)?;
    card.version = row.get(2)?;
    card.cost = row.get(3)?;
    card.strength = row.get(4)?;
    card.willpower = row.get(5)?;
    card.lore = row.get(6)?;
    card.rarity = row.get(7)?;
    card.collector_number = row.get(8)?;
    card.text = row.get(9)?;
    card.flavor_text = row.get(10)?;
    card.released_at = row.get(11)?;
    card.extra = extra;
    card.created_at = parse_date(13, row.get(13)?)?;
    card.updated_at = parse_date(14, row.get(14)?)?;
    Ok(card)
}

fn row_to_change(row: &rusqlite::Row) -> rusqlite::Result<ChangeEntry> {
    let field: String = row.get(0)?;
    let old_value: String = row.get(1)?;
    let new_value: String = row.get(2)?;
    let observed_on: String = row.get(3)?;
    let recorded_at: String = row.get(4)?;

    Ok(ChangeEntry {
        date: NaiveDate::parse_from_str(&observed_on, "%Y-%m-%d")
            .map_err(|e| conversion_error(3, e))?,
        field,
        old_value: parse_json(1, &old_value)?,
        new_value: parse_json(2, &new_value)?,
        timestamp: DateTime::parse_from_rfc3339(&recorded_at)
            .map_err(|e| conversion_error(4, e))?
            .with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MonitoredField;
    use serde_json::json;

    fn fixture() -> (BTreeMap<SetId, CardSet>, BTreeMap<SetId, Vec<Card>>, ChangeLedger) {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut set = CardSet::new("set_1", "The First Chapter", "1");
        set.created_at = Some(day);
        set.updated_at = Some(day);

        let mut card = Card::new("crd_1", "Mickey Mouse");
        card.version = Some("True Friend".to_string());
        card.cost = Some(3);
        card.rarity = Some("Uncommon".to_string());
        card.keywords = Some(vec!["Evasive".to_string()]);
        card.card_type = Some(vec!["Character".to_string()]);
        card.legalities = Some(BTreeMap::from([("core".to_string(), json!("legal"))]));
        card.prices = Some(BTreeMap::from([
            ("usd".to_string(), json!("0.25")),
            ("usd_foil".to_string(), Value::Null),
        ]));
        card.created_at = Some(day);
        card.updated_at = Some(day);

        let mut ledger = ChangeLedger::new();
        ledger.record(
            &card.id,
            &card.display_name(),
            [
                ChangeEntry::card_added(day),
                ChangeEntry::field_change(
                    MonitoredField::Cost,
                    json!(2),
                    json!(3),
                    NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                ),
            ],
        );

        let sets = BTreeMap::from([(set.id.clone(), set)]);
        let cards = BTreeMap::from([(SetId::new("set_1"), vec![card])]);
        (sets, cards, ledger)
    }

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reopen_does_not_reapply_migrations() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cards.db");
        drop(Database::open(&path).unwrap());
        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_load_and_read_back_card() {
        let mut db = Database::open_in_memory().unwrap();
        let (sets, cards, ledger) = fixture();

        let summary = db.load_consolidated(&sets, &cards, &ledger).unwrap();
        assert_eq!(
            summary,
            LoadSummary {
                sets: 1,
                cards: 1,
                changes: 2
            }
        );

        let card = db.get_card(&CardId::new("crd_1")).unwrap().unwrap();
        assert_eq!(card.name.as_deref(), Some("Mickey Mouse"));
        assert_eq!(card.cost, Some(3));
        assert_eq!(card.keywords, Some(vec!["Evasive".to_string()]));
        assert!(card.classifications.is_none());
        let prices = card.prices.unwrap();
        assert_eq!(prices.get("usd"), Some(&json!("0.25")));
        assert_eq!(prices.get("usd_foil"), Some(&Value::Null));
        assert_eq!(card.created_at, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn test_load_is_idempotent() {
        let mut db = Database::open_in_memory().unwrap();
        let (sets, cards, ledger) = fixture();

        db.load_consolidated(&sets, &cards, &ledger).unwrap();
        db.load_consolidated(&sets, &cards, &ledger).unwrap();

        assert_eq!(db.count_sets().unwrap(), 1);
        assert_eq!(db.count_cards().unwrap(), 1);
        let changes = db.changes_for_card(&CardId::new("crd_1")).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes[0].is_addition());
        assert_eq!(changes[1].field, "cost");
        assert_eq!(changes[1].new_value, json!(3));
    }

    #[test]
    fn test_missing_card_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_card(&CardId::new("nope")).unwrap().is_none());
    }

    #[test]
    fn test_card_under_two_sets_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        let (mut sets, mut cards, ledger) = fixture();
        let second = CardSet::new("set_2", "Rise of the Floodborn", "2");
        sets.insert(second.id.clone(), second);
        let duplicate = cards[&SetId::new("set_1")][0].clone();
        cards.insert(SetId::new("set_2"), vec![duplicate]);

        let err = db.load_consolidated(&sets, &cards, &ledger).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(db.count_sets().unwrap(), 0);
        assert_eq!(db.count_cards().unwrap(), 0);
    }
}
