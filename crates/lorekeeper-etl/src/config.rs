use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IngestError, IngestResult};
use crate::index::SignatureMode;

/// Prefix of environment variable overrides, e.g. `LOREKEEPER_OUTPUT_ROOT`.
pub const ENV_PREFIX: &str = "LOREKEEPER";

/// Keys accepted by `config get` / `config set`.
pub const KEYS: [&str; 6] = [
    "snapshot_root",
    "output_root",
    "database_path",
    "log_path",
    "log_level",
    "signature",
];

/// Configuration for lorekeeper.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (LOREKEEPER_* prefix)
/// 3. Config file (~/.config/lorekeeper/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the dated snapshot folders.
    ///
    /// Can be set via:
    /// - CLI: --snapshots /path/to/raw
    /// - ENV: LOREKEEPER_SNAPSHOT_ROOT
    /// - Config: snapshot_root = "/path/to/raw"
    /// - Default: data/raw/lorcast
    pub snapshot_root: PathBuf,

    /// Directory the consolidated output is written to.
    ///
    /// Can be set via:
    /// - CLI: --output /path/to/processed
    /// - ENV: LOREKEEPER_OUTPUT_ROOT
    /// - Config: output_root = "/path/to/processed"
    /// - Default: data/processed/lorcast
    pub output_root: PathBuf,

    /// Path to the SQLite database used by `load`.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: LOREKEEPER_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/lorekeeper/lorekeeper.db
    pub database_path: PathBuf,

    /// Log file; logs go to stderr when unset.
    pub log_path: Option<PathBuf>,

    /// Default log filter, overridden by `RUST_LOG`.
    pub log_level: String,

    /// How snapshot file signatures are computed: "stat" or "content".
    pub signature: SignatureMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_root: PathBuf::from("data/raw/lorcast"),
            output_root: PathBuf::from("data/processed/lorcast"),
            database_path: default_db_path(),
            log_path: None,
            log_level: String::from("info"),
            signature: SignatureMode::Stat,
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> IngestResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific file plus the environment.
    pub fn load_from(path: &Path) -> IngestResult<Self> {
        config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| IngestError::Config(e.to_string()))
    }

    /// Apply CLI path overrides.
    #[must_use]
    pub fn with_overrides(
        mut self,
        snapshot_root: Option<PathBuf>,
        output_root: Option<PathBuf>,
        database_path: Option<PathBuf>,
    ) -> Self {
        if let Some(path) = snapshot_root {
            self.snapshot_root = path;
        }
        if let Some(path) = output_root {
            self.output_root = path;
        }
        if let Some(path) = database_path {
            self.database_path = path;
        }
        self
    }

    /// The effective value of a config key, as shown by `config get`.
    pub fn value_of(&self, key: &str) -> IngestResult<String> {
        let value = match key {
            "snapshot_root" => self.snapshot_root.display().to_string(),
            "output_root" => self.output_root.display().to_string(),
            "database_path" => self.database_path.display().to_string(),
            "log_path" => self
                .log_path
                .as_ref()
                .map_or_else(|| String::from("<not set>"), |p| p.display().to_string()),
            "log_level" => self.log_level.clone(),
            "signature" => self.signature.to_string(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }
}

/// Check a `config set` value before it is written to the file.
pub fn validate_value(key: &str, value: &str) -> IngestResult<()> {
    match key {
        "signature" => value.parse::<SignatureMode>().map(|_| ()),
        "log_level" => match value.to_lowercase().as_str() {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(IngestError::Config(format!("invalid log level '{value}'"))),
        },
        _ if KEYS.contains(&key) => Ok(()),
        _ => Err(unknown_key(key)),
    }
}

fn unknown_key(key: &str) -> IngestError {
    IngestError::Config(format!(
        "unknown config key '{key}' (valid keys: {})",
        KEYS.join(", ")
    ))
}

/// Get the default database path.
///
/// Returns: ~/.local/share/lorekeeper/lorekeeper.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lorekeeper")
        .join("lorekeeper.db")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/lorekeeper/config.toml
/// - macOS: ~/Library/Application Support/lorekeeper/config.toml
/// - Windows: %APPDATA%\lorekeeper\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lorekeeper")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Lorekeeper Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (LOREKEEPER_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Root of the dated snapshot folders (<root>/YYYY-MM-DD/sets.json, .../sets/*.json)
#
# Can also be set via:
# - CLI: lorekeeper --snapshots /path/to/raw process
# - Environment: LOREKEEPER_SNAPSHOT_ROOT=/path/to/raw
snapshot_root = "data/raw/lorcast"

# Directory for consolidated sets, cards, report, change ledger and
# processing history
#
# Can also be set via:
# - CLI: lorekeeper --output /path/to/processed process
# - Environment: LOREKEEPER_OUTPUT_ROOT=/path/to/processed
output_root = "data/processed/lorcast"

# Snapshot file signature used to skip unchanged files:
# "stat" (size + modification time) or "content" (SHA-256 of the bytes)
signature = "stat"

# Default log level (RUST_LOG takes precedence)
log_level = "info"

# Write logs to a file instead of stderr
#log_path = "/path/to/lorekeeper.log"

# Path to the SQLite database filled by `lorekeeper load`
#
# Can also be set via:
# - CLI: lorekeeper --db /custom/path.db load
# - Environment: LOREKEEPER_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/lorekeeper.db"
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    ensure_config_file_at(&config_file_path())
}

pub fn ensure_config_file_at(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
