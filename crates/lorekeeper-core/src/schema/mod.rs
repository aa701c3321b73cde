mod db;
mod migrations;

pub use db::{Database, LoadSummary};
pub use migrations::{Migration, MIGRATIONS};
