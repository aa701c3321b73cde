//! Consolidated Output on disk: loading prior state and writing the stores
//! atomically.

use lorekeeper_core::ledger::ChangeLedger;
use lorekeeper_core::model::{Card, CardSet, SetId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{IngestError, IngestResult};
use crate::report::Report;

pub const SETS_FILE: &str = "sets.json";
pub const CARDS_DIR: &str = "sets";
pub const REPORT_FILE: &str = "report.json";
pub const CHANGES_FILE: &str = "card_changes.json";
pub const HISTORY_FILE: &str = "processing_history.json";

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> IngestResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| IngestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write pretty-printed JSON through a temporary file in the target
/// directory, then rename it over `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> IngestResult<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| IngestError::persist(parent, e))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| IngestError::persist(path, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| IngestError::persist(path, e.into()))?;
        writer.flush().map_err(|e| IngestError::persist(path, e))?;
    }
    tmp.persist(path)
        .map_err(|e| IngestError::persist(path, e.error))?;
    Ok(())
}

/// Path of the consolidated card file for a set.
#[must_use]
pub fn cards_path(output_root: &Path, set_id: &SetId) -> PathBuf {
    output_root
        .join(CARDS_DIR)
        .join(format!("{}.json", set_id.as_str()))
}

/// Read a prior-state file, or `None` when it does not exist yet.
fn read_prior<T: DeserializeOwned>(path: &Path) -> IngestResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some).map_err(|e| IngestError::PriorState {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// The consolidated view of sets, cards and their change history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Consolidated {
    pub sets: BTreeMap<SetId, CardSet>,
    pub cards: BTreeMap<SetId, Vec<Card>>,
    pub ledger: ChangeLedger,
}

impl Consolidated {
    /// Load the previous run's output from `output_root`.
    ///
    /// Missing files mean no prior state. Files that exist but cannot be
    /// read or parsed are an error.
    pub fn load(output_root: &Path) -> IngestResult<Self> {
        let sets = read_prior(&output_root.join(SETS_FILE))?.unwrap_or_default();
        let ledger = read_prior(&output_root.join(CHANGES_FILE))?.unwrap_or_default();

        let mut cards = BTreeMap::new();
        for path in json_files(&output_root.join(CARDS_DIR)) {
            let Some(stem) = path.file_stem() else {
                continue;
            };
            let set_id = SetId::new(stem.to_string_lossy());
            let set_cards: Vec<Card> = read_prior(&path)?.unwrap_or_default();
            cards.insert(set_id, set_cards);
        }

        Ok(Self {
            sets,
            cards,
            ledger,
        })
    }

    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.cards.values().map(Vec::len).sum()
    }

    /// Write every store except the index, in order: card files, sets,
    /// report, change ledger.
    pub fn save(&self, output_root: &Path, report: &Report) -> IngestResult<()> {
        for (set_id, cards) in &self.cards {
            write_json_atomic(&cards_path(output_root, set_id), cards)?;
        }
        write_json_atomic(&output_root.join(SETS_FILE), &self.sets)?;
        write_json_atomic(&output_root.join(REPORT_FILE), report)?;
        write_json_atomic(&output_root.join(CHANGES_FILE), &self.ledger)?;
        Ok(())
    }
}

/// `*.json` files directly inside `dir`, sorted by file name.
pub(crate) fn json_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::build_report;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_json_atomic_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sets.json");

        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        write_json_atomic(&path, &vec![4]).unwrap();

        let back: Vec<i32> = read_json(&path).unwrap();
        assert_eq!(back, vec![4]);
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_read_json_errors_are_per_file() {
        let dir = TempDir::new().unwrap();
        let missing = read_json::<Vec<i32>>(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, IngestError::Read { .. }));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "[1,").unwrap();
        let err = read_json::<Vec<i32>>(&bad).unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
    }

    #[test]
    fn test_load_empty_output_root() {
        let dir = TempDir::new().unwrap();
        let state = Consolidated::load(&dir.path().join("processed")).unwrap();
        assert!(state.sets.is_empty());
        assert!(state.cards.is_empty());
        assert!(state.ledger.is_empty());
    }

    #[test]
    fn test_corrupt_prior_output_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CHANGES_FILE), "{\"crd_1\": ").unwrap();

        let err = Consolidated::load(dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::PriorState { .. }));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut state = Consolidated::default();
        let set_id = SetId::new("set_1");
        let mut set = CardSet::new("set_1", "The First Chapter", "1");
        set.created_at = NaiveDate::from_ymd_opt(2024, 1, 1);
        state.sets.insert(set_id.clone(), set);
        state
            .cards
            .insert(set_id.clone(), vec![Card::new("crd_1", "Stitch")]);

        let report = build_report(
            &state.sets,
            &state.cards,
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        );
        state.save(dir.path(), &report).unwrap();

        assert!(cards_path(dir.path(), &set_id).exists());
        assert!(dir.path().join(REPORT_FILE).exists());

        let loaded = Consolidated::load(dir.path()).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.total_cards(), 1);
    }

    #[test]
    fn test_json_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.json"), "[]").unwrap();
        fs::write(dir.path().join("a.json"), "[]").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("c.json")).unwrap();

        let names: Vec<_> = json_files(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }
}
