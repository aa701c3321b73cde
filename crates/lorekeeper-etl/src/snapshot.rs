//! Snapshot Store: date-stamped capture folders.
//!
//! ```text
//! <root>/
//!   2024-01-01/
//!     sets.json            array of set records
//!     sets/
//!       set_<id>.json      array of card records (or a set slug name)
//!   2024-01-05/
//!     ...
//! ```

use chrono::NaiveDate;
use lorekeeper_core::model::{Card, CardSet, SetId};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{IngestError, IngestResult};
use crate::store::{json_files, write_json_atomic, CARDS_DIR, SETS_FILE};

/// Folder name format of a snapshot date.
pub const FOLDER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Anything that can produce raw set and card records, e.g. the card-data
/// API client.
pub trait CardSource {
    fn sets(&self) -> anyhow::Result<Vec<CardSet>>;

    fn cards(&self, set_id: &SetId) -> anyhow::Result<Vec<Card>>;
}

/// One dated capture folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFolder {
    pub date: NaiveDate,
    pub path: PathBuf,
}

impl SnapshotFolder {
    #[must_use]
    pub fn sets_file(&self) -> PathBuf {
        self.path.join(SETS_FILE)
    }

    #[must_use]
    pub fn cards_dir(&self) -> PathBuf {
        self.path.join(CARDS_DIR)
    }

    /// Card files in this folder, sorted by file name.
    #[must_use]
    pub fn card_files(&self) -> Vec<PathBuf> {
        json_files(&self.cards_dir())
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Dated folders in ascending date order. Directories whose name is not
    /// a `YYYY-MM-DD` date are ignored; a missing root has no folders.
    #[must_use]
    pub fn folders(&self) -> Vec<SnapshotFolder> {
        if !self.root.is_dir() {
            log::debug!("Snapshot root {} does not exist", self.root.display());
            return Vec::new();
        }

        let mut folders: Vec<SnapshotFolder> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                match NaiveDate::parse_from_str(&name, FOLDER_DATE_FORMAT) {
                    Ok(date) => Some(SnapshotFolder {
                        date,
                        path: entry.into_path(),
                    }),
                    Err(_) => {
                        log::debug!("Ignoring non-snapshot directory {}", name);
                        None
                    }
                }
            })
            .collect();

        folders.sort_by_key(|folder| folder.date);
        folders
    }

    /// The newest dated folder, if any.
    #[must_use]
    pub fn latest_folder(&self) -> Option<SnapshotFolder> {
        self.folders().pop()
    }

    /// Write a new capture folder for `date` from a card source.
    ///
    /// Card files are named after each set's id; `sets.json` is written
    /// last.
    pub fn capture(&self, source: &dyn CardSource, date: NaiveDate) -> IngestResult<SnapshotFolder> {
        let folder = SnapshotFolder {
            date,
            path: self.root.join(date.format(FOLDER_DATE_FORMAT).to_string()),
        };

        let sets = source.sets().map_err(IngestError::Source)?;
        log::info!("Capturing {} sets into {}", sets.len(), folder.path.display());

        for set in &sets {
            let cards = source.cards(&set.id).map_err(IngestError::Source)?;
            let path = folder.cards_dir().join(format!("{}.json", set.id));
            write_json_atomic(&path, &cards)?;
            log::debug!("Captured {} cards for {}", cards.len(), set.id);
        }
        write_json_atomic(&folder.sets_file(), &sets)?;

        Ok(folder)
    }
}
