//! The Consolidator: folds pending snapshot files into the consolidated
//! output and the change ledger.

mod merge;

pub use merge::{diff_card, merge_cards, merge_sets};

use chrono::{Local, NaiveDateTime};
use lorekeeper_core::model::{resolve_set_identifier, Card, CardSet, SetIdentifier};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::IngestResult;
use crate::index::{ChangeIndex, FileCheck, SignatureMode};
use crate::report::build_report;
use crate::snapshot::{SnapshotFolder, SnapshotStore};
use crate::store::{read_json, Consolidated, HISTORY_FILE};

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub total_sets: usize,
    pub total_cards: usize,
    /// Ledger entries added by this run.
    pub new_changes: usize,
}

#[derive(Debug, Clone)]
pub struct Consolidator {
    store: SnapshotStore,
    output_root: PathBuf,
    mode: SignatureMode,
    run_time: NaiveDateTime,
}

impl Consolidator {
    #[must_use]
    pub fn new(snapshot_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            store: SnapshotStore::new(snapshot_root),
            output_root: output_root.into(),
            mode: SignatureMode::default(),
            run_time: Local::now().naive_local(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.snapshot_root, &config.output_root).with_signature_mode(config.signature)
    }

    #[must_use]
    pub fn with_signature_mode(mut self, mode: SignatureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Fix the run clock. Its date stamps `processed_at` on every set and
    /// the full value becomes the report's `processing_date`.
    #[must_use]
    pub fn with_run_time(mut self, run_time: NaiveDateTime) -> Self {
        self.run_time = run_time;
        self
    }

    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.output_root.join(HISTORY_FILE)
    }

    /// Incremental run: only new or changed snapshot files are merged.
    pub fn run(&self) -> IngestResult<RunSummary> {
        self.execute(false)
    }

    /// Clear the change-detection index, then run. Consolidated output and
    /// the change ledger are kept.
    pub fn force_reprocess(&self) -> IngestResult<RunSummary> {
        self.execute(true)
    }

    fn execute(&self, force: bool) -> IngestResult<RunSummary> {
        let history = self.history_path();
        let mut index = ChangeIndex::load(&history, self.store.root(), self.mode);
        if force {
            index.force_reset();
            log::info!("Processing history cleared; all snapshot files will be reprocessed");
        }

        let mut state = Consolidated::load(&self.output_root)?;
        let changes_before = state.ledger.total_changes();
        let mut summary = RunSummary::default();

        log::info!(
            "Consolidating snapshots from {} into {}",
            self.store.root().display(),
            self.output_root.display()
        );

        for folder in self.store.folders() {
            self.ingest_folder(&folder, &mut state, &mut index, &mut summary)?;
        }

        let processed_on = self.run_time.date();
        for set in state.sets.values_mut() {
            set.processed_at = Some(processed_on);
        }

        let report = build_report(&state.sets, &state.cards, self.run_time);
        state.save(&self.output_root, &report)?;
        index.save(&history)?;

        summary.total_sets = report.total_sets;
        summary.total_cards = report.total_cards;
        summary.new_changes = state.ledger.total_changes().saturating_sub(changes_before);

        log::info!(
            "Processed {} files ({} skipped, {} failed): {} sets, {} cards, {} new changes",
            summary.files_processed,
            summary.files_skipped,
            summary.files_failed,
            summary.total_sets,
            summary.total_cards,
            summary.new_changes
        );
        Ok(summary)
    }

    fn ingest_folder(
        &self,
        folder: &SnapshotFolder,
        state: &mut Consolidated,
        index: &mut ChangeIndex,
        summary: &mut RunSummary,
    ) -> IngestResult<()> {
        let sets_file = folder.sets_file();
        if sets_file.exists() {
            if let Some(sets) = Self::ingest::<CardSet>(&sets_file, folder, index, summary)? {
                log::info!("Merging {} sets from {}", sets.len(), folder.date);
                let existing = std::mem::take(&mut state.sets);
                state.sets = merge_sets(existing, sets, folder.date);
            }
        }

        for path in folder.card_files() {
            let Some(cards) = Self::ingest::<Card>(&path, folder, index, summary)? else {
                continue;
            };

            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let resolved = resolve_set_identifier(&stem);
            if let SetIdentifier::Provisional(id) = &resolved {
                log::info!("No canonical id for '{}'; using provisional id {}", stem, id);
            }
            let set_id = resolved.into_id();

            log::info!(
                "Merging {} cards from {}/{} into {}",
                cards.len(),
                folder.date,
                stem,
                set_id
            );
            let existing = state.cards.remove(&set_id).unwrap_or_default();
            let merged = merge_cards(existing, cards, folder.date, &mut state.ledger);
            state.cards.insert(set_id, merged);
        }

        Ok(())
    }

    /// Read a snapshot file if the index says it needs processing.
    ///
    /// Unreadable and malformed files are logged and skipped without
    /// recording a signature, so the next run retries them.
    fn ingest<T: DeserializeOwned>(
        path: &Path,
        folder: &SnapshotFolder,
        index: &mut ChangeIndex,
        summary: &mut RunSummary,
    ) -> IngestResult<Option<Vec<T>>> {
        let signature = match index.pending(path) {
            FileCheck::Changed { signature } => signature,
            FileCheck::Unchanged => {
                log::debug!("Skipping unchanged {}", path.display());
                summary.files_skipped += 1;
                return Ok(None);
            }
            FileCheck::Unreadable => {
                log::warn!("Skipping unreadable {}", path.display());
                summary.files_skipped += 1;
                return Ok(None);
            }
        };

        match read_json::<Vec<T>>(path) {
            Ok(records) => {
                index.record(path, signature, folder.date);
                summary.files_processed += 1;
                Ok(Some(records))
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("Skipping {}", e);
                summary.files_failed += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
