//! Change-Detection Index: per-file signatures used to skip snapshot files
//! that were already consolidated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::time::UNIX_EPOCH;

use crate::error::{IngestError, IngestResult};
use crate::store::write_json_atomic;

/// How a snapshot file's signature is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureMode {
    /// File size plus modification time.
    #[default]
    Stat,
    /// SHA-256 of the file contents.
    Content,
}

impl SignatureMode {
    /// Compute the signature of a file, `None` when it cannot be read.
    pub fn signature(self, path: &Path) -> Option<String> {
        match self {
            Self::Stat => {
                let metadata = std::fs::metadata(path).ok()?;
                let mtime = metadata.modified().ok()?.duration_since(UNIX_EPOCH).ok()?;
                Some(format!(
                    "{}_{}.{:09}",
                    metadata.len(),
                    mtime.as_secs(),
                    mtime.subsec_nanos()
                ))
            }
            Self::Content => {
                let bytes = std::fs::read(path).ok()?;
                Some(format!("sha256:{}", hex::encode(Sha256::digest(&bytes))))
            }
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stat => "stat",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for SignatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureMode {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stat" => Ok(Self::Stat),
            "content" => Ok(Self::Content),
            other => Err(IngestError::Config(format!(
                "unknown signature mode '{other}' (expected 'stat' or 'content')"
            ))),
        }
    }
}

/// One processed snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub signature: String,
    /// Date of the snapshot folder the file was processed from.
    pub last_processed: NaiveDate,
    /// When the file was processed.
    pub processing_date: DateTime<Utc>,
}

/// Outcome of checking a snapshot file against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCheck {
    /// The stored signature matches; nothing to do.
    Unchanged,
    /// No signature could be computed.
    Unreadable,
    /// New or changed since it was last processed.
    Changed { signature: String },
}

/// Signatures of processed snapshot files, keyed by path relative to the
/// snapshot root.
#[derive(Debug, Clone)]
pub struct ChangeIndex {
    root: PathBuf,
    mode: SignatureMode,
    entries: BTreeMap<String, IndexEntry>,
}

impl ChangeIndex {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, mode: SignatureMode) -> Self {
        Self {
            root: root.into(),
            mode,
            entries: BTreeMap::new(),
        }
    }

    /// Load a persisted index.
    ///
    /// A missing or unparsable file yields an empty index.
    pub fn load(history_file: &Path, root: impl Into<PathBuf>, mode: SignatureMode) -> Self {
        let mut index = Self::new(root, mode);

        let text = match std::fs::read_to_string(history_file) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return index,
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable processing history {}: {}",
                    history_file.display(),
                    e
                );
                return index;
            }
        };

        match serde_json::from_str(&text) {
            Ok(entries) => index.entries = entries,
            Err(e) => log::warn!(
                "Ignoring corrupt processing history {}: {}",
                history_file.display(),
                e
            ),
        }
        index
    }

    pub fn save(&self, history_file: &Path) -> IngestResult<()> {
        write_json_atomic(history_file, &self.entries)
    }

    /// Index key for a snapshot file: its path relative to the root, with
    /// `/` separators.
    #[must_use]
    pub fn key_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Check a file without touching the index.
    #[must_use]
    pub fn pending(&self, path: &Path) -> FileCheck {
        let Some(signature) = self.mode.signature(path) else {
            return FileCheck::Unreadable;
        };

        match self.entries.get(&self.key_for(path)) {
            Some(entry) if entry.signature == signature => FileCheck::Unchanged,
            _ => FileCheck::Changed { signature },
        }
    }

    /// Record a file as processed with the given signature.
    pub fn record(&mut self, path: &Path, signature: String, observed: NaiveDate) {
        self.entries.insert(
            self.key_for(path),
            IndexEntry {
                signature,
                last_processed: observed,
                processing_date: Utc::now(),
            },
        );
    }

    /// Returns `false` when the file is unchanged or unreadable; otherwise
    /// records its fresh signature and returns `true`.
    pub fn should_process(&mut self, path: &Path, observed: NaiveDate) -> bool {
        match self.pending(path) {
            FileCheck::Changed { signature } => {
                self.record(path, signature, observed);
                true
            }
            FileCheck::Unchanged | FileCheck::Unreadable => false,
        }
    }

    /// Forget every entry so all snapshot files are reconsidered.
    pub fn force_reset(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn mode(&self) -> SignatureMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_signature_modes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sets.json");
        fs::write(&path, "[]").unwrap();

        let stat = SignatureMode::Stat.signature(&path).unwrap();
        assert!(stat.starts_with("2_"));

        let content = SignatureMode::Content.signature(&path).unwrap();
        assert_eq!(
            content,
            "sha256:4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945"
        );

        assert!(SignatureMode::Stat.signature(&dir.path().join("missing.json")).is_none());
    }

    #[test]
    fn test_signature_mode_from_str() {
        assert_eq!("stat".parse::<SignatureMode>().unwrap(), SignatureMode::Stat);
        assert_eq!(" Content ".parse::<SignatureMode>().unwrap(), SignatureMode::Content);
        assert!("md5".parse::<SignatureMode>().is_err());
    }

    #[test]
    fn test_key_is_relative_to_root() {
        let index = ChangeIndex::new("/data/raw", SignatureMode::Stat);
        assert_eq!(
            index.key_for(Path::new("/data/raw/2024-01-01/sets/set_1.json")),
            "2024-01-01/sets/set_1.json"
        );
    }

    #[test]
    fn test_should_process_records_then_skips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2024-01-01").join("sets.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[]").unwrap();

        let mut index = ChangeIndex::new(dir.path(), SignatureMode::Content);
        assert!(index.should_process(&path, day()));
        assert!(!index.should_process(&path, day()));

        let entry = index.entry("2024-01-01/sets.json").unwrap();
        assert_eq!(entry.last_processed, day());

        fs::write(&path, "[{\"id\": \"set_1\"}]").unwrap();
        assert!(index.should_process(&path, day()));
    }

    #[test]
    fn test_unreadable_file_is_not_processed_or_recorded() {
        let dir = TempDir::new().unwrap();
        let mut index = ChangeIndex::new(dir.path(), SignatureMode::Stat);
        let missing = dir.path().join("2024-01-01/sets.json");

        assert_eq!(index.pending(&missing), FileCheck::Unreadable);
        assert!(!index.should_process(&missing, day()));
        assert!(index.is_empty());
    }

    #[test]
    fn test_pending_does_not_mutate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sets.json");
        fs::write(&path, "[]").unwrap();

        let index = ChangeIndex::new(dir.path(), SignatureMode::Stat);
        assert!(matches!(index.pending(&path), FileCheck::Changed { .. }));
        assert!(index.is_empty());
    }

    #[test]
    fn test_save_load_and_force_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sets.json");
        fs::write(&path, "[]").unwrap();
        let history = dir.path().join("out").join("processing_history.json");

        let mut index = ChangeIndex::new(dir.path(), SignatureMode::Stat);
        assert!(index.should_process(&path, day()));
        index.save(&history).unwrap();

        let mut reloaded = ChangeIndex::load(&history, dir.path(), SignatureMode::Stat);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.pending(&path), FileCheck::Unchanged);

        reloaded.force_reset();
        assert!(reloaded.is_empty());
        assert!(matches!(reloaded.pending(&path), FileCheck::Changed { .. }));
    }

    #[test]
    fn test_corrupt_history_loads_empty() {
        let dir = TempDir::new().unwrap();
        let history = dir.path().join("processing_history.json");
        fs::write(&history, "{not json").unwrap();

        let index = ChangeIndex::load(&history, dir.path(), SignatureMode::Stat);
        assert!(index.is_empty());
    }
}
