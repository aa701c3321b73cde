//! Snapshot consolidation for lorekeeper.
//!
//! Reads date-stamped snapshot folders, skips files the change-detection
//! index has already seen, merges the rest into the consolidated sets and
//! cards while recording field-level changes, and writes the output stores.
//! Also hosts the read-only inspector, checklist parsing, and config.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod checklist;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod index;
pub mod inspect;
pub mod pipeline;
pub mod report;
pub mod snapshot;
pub mod store;

pub use config::Config;
pub use consolidate::{Consolidator, RunSummary};
pub use error::{IngestError, IngestResult};
pub use index::{ChangeIndex, SignatureMode};
pub use inspect::Inspector;
pub use pipeline::RunMode;
pub use report::{build_report, Report};
pub use snapshot::{CardSource, SnapshotStore};
pub use store::Consolidated;
