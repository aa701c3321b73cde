use lorekeeper_core::schema::{Database, LoadSummary};

use crate::config::Config;
use crate::consolidate::{Consolidator, RunSummary};
use crate::error::{IngestError, IngestResult};
use crate::store::Consolidated;

/// How a processing run treats the change-detection index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Skip snapshot files whose signature is unchanged.
    #[default]
    Incremental,
    /// Clear the index first and reconsider every snapshot file.
    Force,
}

/// Consolidate the configured snapshot root into the output root.
pub fn process(config: &Config, mode: RunMode) -> IngestResult<RunSummary> {
    let consolidator = Consolidator::from_config(config);
    match mode {
        RunMode::Incremental => consolidator.run(),
        RunMode::Force => consolidator.force_reprocess(),
    }
}

/// Mirror the consolidated output into the configured SQLite database.
pub fn load(config: &Config) -> IngestResult<LoadSummary> {
    let state = Consolidated::load(&config.output_root)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| IngestError::persist(parent, e))?;
    }

    let mut db = Database::open(&config.database_path)?;
    let summary = db.load_consolidated(&state.sets, &state.cards, &state.ledger)?;
    Ok(summary)
}
