//! Core domain model for lorekeeper.
//!
//! This crate defines the card-set and card records, the monitored-field
//! diff, set identifier resolution, the change ledger, and the SQLite
//! schema that mirrors consolidated output for downstream reporting.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod ledger;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
