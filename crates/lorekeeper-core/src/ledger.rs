//! Append-only history of field-level card changes.
//!
//! Entries are grouped per card under a denormalized display name so that
//! the serialized ledger reads as
//! `{card_id: {card_name, changes: [{date, field, old_value, new_value, timestamp}]}}`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::{CardId, MonitoredField};

/// Field name recorded when a card is first discovered.
pub const CARD_ADDED: &str = "card_added";

const CARD_ADDED_VALUE: &str = "Card first discovered";

/// One historical fact about a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Snapshot date the change was observed in.
    pub date: NaiveDate,

    /// A monitored field name, or [`CARD_ADDED`].
    pub field: String,

    pub old_value: Value,

    pub new_value: Value,

    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
}

impl ChangeEntry {
    #[must_use]
    pub fn field_change(
        field: MonitoredField,
        old_value: Value,
        new_value: Value,
        date: NaiveDate,
    ) -> Self {
        Self {
            date,
            field: field.as_str().to_string(),
            old_value,
            new_value,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn card_added(date: NaiveDate) -> Self {
        Self {
            date,
            field: CARD_ADDED.to_string(),
            old_value: Value::Null,
            new_value: Value::String(CARD_ADDED_VALUE.to_string()),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_addition(&self) -> bool {
        self.field == CARD_ADDED
    }
}

/// All recorded changes for one card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardHistory {
    #[serde(default)]
    pub card_name: String,

    #[serde(default)]
    pub changes: Vec<ChangeEntry>,
}

/// The change ledger, keyed by card id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeLedger {
    cards: BTreeMap<CardId, CardHistory>,
}

impl ChangeLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append entries for a card, creating its history if needed.
    pub fn record(
        &mut self,
        card_id: &CardId,
        card_name: &str,
        entries: impl IntoIterator<Item = ChangeEntry>,
    ) {
        let history = self.cards.entry(card_id.clone()).or_default();
        if history.card_name.is_empty() {
            history.card_name = card_name.to_string();
        }
        history.changes.extend(entries);
    }

    /// Refresh the display name of a card that already has history.
    pub fn rename(&mut self, card_id: &CardId, card_name: &str) {
        if let Some(history) = self.cards.get_mut(card_id) {
            card_name.clone_into(&mut history.card_name);
        }
    }

    #[must_use]
    pub fn history(&self, card_id: &CardId) -> Option<&CardHistory> {
        self.cards.get(card_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CardId, &CardHistory)> {
        self.cards.iter()
    }

    /// Number of cards with at least one recorded entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Total number of entries across all cards.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.cards.values().map(|h| h.changes.len()).sum()
    }
}
