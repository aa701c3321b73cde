//! Inspector: read-only views over the consolidated output.

use chrono::NaiveDate;
use lorekeeper_core::ledger::{ChangeEntry, ChangeLedger};
use lorekeeper_core::model::{Card, CardId, CardSet, SetId};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::IngestResult;
use crate::report::Report;
use crate::store::{
    cards_path, json_files, read_json, CARDS_DIR, CHANGES_FILE, REPORT_FILE, SETS_FILE,
};

/// Cards listed by [`Inspector::set_details`].
pub const SAMPLE_CARDS: usize = 5;

/// Changes listed per card by [`Inspector::card_changes`].
pub const RECENT_CHANGES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetRow {
    pub id: SetId,
    pub code: String,
    pub name: String,
    pub created_at: Option<NaiveDate>,
    pub updated_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSummary {
    pub sets: Vec<SetRow>,
    /// Card count per consolidated card file, sorted by set id.
    pub card_files: Vec<(SetId, usize)>,
    pub total_cards: usize,
    /// `processing_date` of the last report, if one was written.
    pub last_processed: Option<String>,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSample {
    pub name: String,
    pub rarity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDetails {
    pub set_id: SetId,
    pub total_cards: usize,
    /// Earliest `created_at` of the set's cards.
    pub created_at: Option<NaiveDate>,
    /// Latest `updated_at` of the set's cards.
    pub updated_at: Option<NaiveDate>,
    pub sample: Vec<CardSample>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardChanges {
    pub card_id: CardId,
    pub card_name: String,
    pub total_changes: usize,
    /// The most recent entries, oldest first.
    pub recent: Vec<ChangeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOverview {
    pub cards_with_changes: usize,
    pub total_changes: usize,
    /// `(card id, display name, change count)`, most changed first.
    pub most_changed: Vec<(CardId, String, usize)>,
    /// Entry count per field, most frequent first.
    pub by_field: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeView {
    /// No entries recorded yet.
    Empty,
    /// Cards whose display name matched the filter.
    Matches(Vec<CardChanges>),
    Overview(ChangeOverview),
}

#[derive(Debug, Clone)]
pub struct Inspector {
    data_dir: PathBuf,
}

impl Inspector {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Overview of all sets and card files, `None` before the first run.
    pub fn summary(&self) -> IngestResult<Option<DataSummary>> {
        let sets_file = self.data_dir.join(SETS_FILE);
        if !sets_file.exists() {
            return Ok(None);
        }

        let sets: BTreeMap<SetId, CardSet> = read_json(&sets_file)?;
        let sets = sets
            .into_values()
            .map(|set| SetRow {
                id: set.id,
                code: set.code,
                name: set.name,
                created_at: set.created_at,
                updated_at: set.updated_at,
            })
            .collect();

        let mut card_files = Vec::new();
        for path in json_files(&self.data_dir.join(CARDS_DIR)) {
            let Some(stem) = path.file_stem() else {
                continue;
            };
            let cards: Vec<Card> = read_json(&path)?;
            card_files.push((SetId::new(stem.to_string_lossy()), cards.len()));
        }
        let total_cards = card_files.iter().map(|(_, count)| count).sum();

        let report_file = self.data_dir.join(REPORT_FILE);
        let last_processed = if report_file.exists() {
            let report: Report = read_json(&report_file)?;
            Some(report.processing_date)
        } else {
            None
        };

        Ok(Some(DataSummary {
            sets,
            card_files,
            total_cards,
            last_processed,
            data_dir: self.data_dir.clone(),
        }))
    }

    /// Card count, dates and the first few cards of one set.
    pub fn set_details(&self, set_id: &SetId) -> IngestResult<Option<SetDetails>> {
        let path = cards_path(&self.data_dir, set_id);
        if !path.exists() {
            return Ok(None);
        }

        let cards: Vec<Card> = read_json(&path)?;
        let sample = cards
            .iter()
            .take(SAMPLE_CARDS)
            .map(|card| CardSample {
                name: card.name.clone().unwrap_or_else(|| String::from("Unknown")),
                rarity: card.rarity.clone(),
            })
            .collect();

        Ok(Some(SetDetails {
            set_id: set_id.clone(),
            total_cards: cards.len(),
            created_at: cards.iter().filter_map(|c| c.created_at).min(),
            updated_at: cards.iter().filter_map(|c| c.updated_at).max(),
            sample,
        }))
    }

    /// Change history, filtered by display name or summarized.
    ///
    /// With a filter, up to `limit` cards whose display name contains it
    /// (case-insensitive). Without, totals plus the `limit` most changed
    /// cards. `None` when no ledger has been written.
    pub fn card_changes(
        &self,
        name_filter: Option<&str>,
        limit: usize,
    ) -> IngestResult<Option<ChangeView>> {
        let path = self.data_dir.join(CHANGES_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let ledger: ChangeLedger = read_json(&path)?;
        if ledger.is_empty() {
            return Ok(Some(ChangeView::Empty));
        }

        let view = match name_filter {
            Some(filter) => ChangeView::Matches(matching_cards(&ledger, filter, limit)),
            None => ChangeView::Overview(overview(&ledger, limit)),
        };
        Ok(Some(view))
    }
}

fn matching_cards(ledger: &ChangeLedger, filter: &str, limit: usize) -> Vec<CardChanges> {
    let needle = filter.to_lowercase();
    ledger
        .iter()
        .filter(|(_, history)| history.card_name.to_lowercase().contains(&needle))
        .take(limit)
        .map(|(id, history)| {
            let skip = history.changes.len().saturating_sub(RECENT_CHANGES);
            CardChanges {
                card_id: id.clone(),
                card_name: history.card_name.clone(),
                total_changes: history.changes.len(),
                recent: history.changes[skip..].to_vec(),
            }
        })
        .collect()
}

fn overview(ledger: &ChangeLedger, limit: usize) -> ChangeOverview {
    let mut most_changed: Vec<(CardId, String, usize)> = ledger
        .iter()
        .map(|(id, history)| (id.clone(), history.card_name.clone(), history.changes.len()))
        .collect();
    most_changed.sort_by(|a, b| b.2.cmp(&a.2));
    most_changed.truncate(limit);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, history) in ledger.iter() {
        for change in &history.changes {
            *counts.entry(change.field.as_str()).or_insert(0) += 1;
        }
    }
    let mut by_field: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(field, count)| (field.to_string(), count))
        .collect();
    by_field.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ChangeOverview {
        cards_with_changes: ledger.len(),
        total_changes: ledger.total_changes(),
        most_changed,
        by_field,
    }
}
