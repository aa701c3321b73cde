//! Ingestion error types for the consolidation pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while consolidating snapshots.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A snapshot file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot file did not contain the expected JSON shape.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An output store could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Previously consolidated output exists but cannot be used.
    #[error("prior state at {} is unusable: {message}", path.display())]
    PriorState { path: PathBuf, message: String },

    /// A card source failed to produce records.
    #[error("card source failed: {0}")]
    Source(anyhow::Error),

    /// An error propagated from the core domain layer.
    #[error("core error: {0}")]
    Core(#[from] lorekeeper_core::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Returns `true` for per-file errors that are logged and skipped
    /// without failing the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Parse { .. })
    }

    pub(crate) fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for ingestion results.
pub type IngestResult<T> = std::result::Result<T, IngestError>;
