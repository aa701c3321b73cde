//! Report Builder: the run summary written to `report.json`.

use chrono::{NaiveDate, NaiveDateTime};
use lorekeeper_core::model::{Card, CardSet, SetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format of `Report::processing_date`.
pub const PROCESSING_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One summary row per set record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSummary {
    pub name: String,
    pub code: String,
    pub cards: usize,
    pub created_at: Option<NaiveDate>,
    pub updated_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub processing_date: String,
    pub total_sets: usize,
    pub total_cards: usize,
    pub sets: BTreeMap<SetId, SetSummary>,
    pub card_counts: BTreeMap<SetId, usize>,
}

/// Aggregate consolidated sets and cards into a [`Report`].
///
/// `card_counts` covers every card collection, including collections whose
/// set record has not been seen; `total_cards` is their sum.
pub fn build_report(
    sets: &BTreeMap<SetId, CardSet>,
    cards_by_set: &BTreeMap<SetId, Vec<Card>>,
    processed_at: NaiveDateTime,
) -> Report {
    let card_counts: BTreeMap<SetId, usize> = cards_by_set
        .iter()
        .map(|(id, cards)| (id.clone(), cards.len()))
        .collect();

    let summaries = sets
        .iter()
        .map(|(id, set)| {
            let summary = SetSummary {
                name: set.name.clone(),
                code: set.code.clone(),
                cards: card_counts.get(id).copied().unwrap_or(0),
                created_at: set.created_at,
                updated_at: set.updated_at,
            };
            (id.clone(), summary)
        })
        .collect();

    Report {
        processing_date: processed_at.format(PROCESSING_DATE_FORMAT).to_string(),
        total_sets: sets.len(),
        total_cards: card_counts.values().sum(),
        sets: summaries,
        card_counts,
    }
}
