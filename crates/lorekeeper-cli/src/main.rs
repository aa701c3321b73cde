use anyhow::{Context, Result};
use clap::Parser;
use lorekeeper_etl::{Config, RunMode};
use std::fs::OpenOptions;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "lorekeeper", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root of the dated snapshot folders (default: data/raw/lorcast)
    #[arg(long, global = true)]
    snapshots: Option<PathBuf>,

    /// Directory for consolidated output (default: data/processed/lorcast)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Path to the database (default: ~/.local/share/lorekeeper/lorekeeper.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Consolidate new or changed snapshot files
    ///
    /// Walks the snapshot root folder by folder in date order. Each folder
    /// holds a `sets.json` listing and per-set card files under `sets/`.
    /// Files whose signature matches the processing history are skipped;
    /// the rest are merged into the consolidated output:
    ///
    /// - New sets and cards are stamped with the folder date
    /// - Monitored card fields are compared and every difference is
    ///   appended to card_changes.json
    /// - Cards missing from a later snapshot are kept
    ///
    /// Unreadable or malformed snapshot files are skipped with a warning
    /// and retried on the next run.
    ///
    /// Output: sets.json, sets/<set_id>.json, report.json,
    /// card_changes.json and processing_history.json in the output directory.
    Process,
    /// Clear the processing history, then consolidate every snapshot file
    ///
    /// Consolidated output and the change history are kept, so a forced
    /// run over unchanged snapshots records no new changes.
    ForceProcess,
    /// Show an overview of the consolidated data
    Inspect,
    /// Show card counts and sample cards for one set
    Details {
        /// Set id, e.g. set_7ecb0e0c71af496a9e01110e23824e0a5
        #[arg(long)]
        set_id: String,
    },
    /// Show recorded card changes
    Changes {
        /// Only cards whose name contains this text (case-insensitive)
        #[arg(long)]
        card_name: Option<String>,

        /// Maximum number of cards to list
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Parse extracted checklist text for a set
    Checklist {
        /// Text file extracted from a set checklist
        file: PathBuf,

        /// Set name or slug (default: the file name without extension)
        #[arg(long)]
        set: Option<String>,

        /// List checklist entries missing from the consolidated cards
        #[arg(long)]
        verify: bool,
    },
    /// Load the consolidated output into the SQLite database
    Load,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print one value, or the whole config file when no key is given
    Get {
        key: Option<String>,
    },
    /// Set a value in the config file
    Set {
        key: String,
        value: String,
    },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

fn init_logging(config: &Config) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    );

    if let Some(path) = &config.log_path {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create log directory")?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config management must work even when the config file is broken.
    if let Commands::Config { action } = cli.command {
        return match action {
            ConfigAction::Show => commands::config::show_config(),
            ConfigAction::Get { key } => commands::config::get_config(key),
            ConfigAction::Set { key, value } => commands::config::set_config(&key, &value),
            ConfigAction::Path => commands::config::show_path(),
            ConfigAction::Example => commands::config::show_example(),
            ConfigAction::Init => commands::config::init_config(),
        };
    }

    let config = Config::load()
        .context("Failed to load configuration")?
        .with_overrides(cli.snapshots, cli.output, cli.db);
    init_logging(&config)?;

    match cli.command {
        Commands::Process => commands::run_process(&config, RunMode::Incremental)?,
        Commands::ForceProcess => commands::run_process(&config, RunMode::Force)?,
        Commands::Inspect => commands::show_summary(&config)?,
        Commands::Details { set_id } => commands::show_set_details(&config, &set_id)?,
        Commands::Changes { card_name, limit } => {
            commands::show_changes(&config, card_name.as_deref(), limit)?;
        }
        Commands::Checklist { file, set, verify } => {
            commands::run_checklist(&config, &file, set.as_deref(), verify)?;
        }
        Commands::Load => commands::run_load(&config)?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_changes_with_global_paths() {
        let cli = Cli::try_parse_from([
            "lorekeeper",
            "changes",
            "--card-name",
            "ariel",
            "--output",
            "/srv/processed",
        ])
        .unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("/srv/processed")));
        match cli.command {
            Commands::Changes { card_name, limit } => {
                assert_eq!(card_name.as_deref(), Some("ariel"));
                assert_eq!(limit, 10);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_force_process() {
        let cli = Cli::try_parse_from(["lorekeeper", "force-process"]).unwrap();
        assert!(matches!(cli.command, Commands::ForceProcess));
    }

    #[test]
    fn test_details_requires_set_id() {
        assert!(Cli::try_parse_from(["lorekeeper", "details"]).is_err());
    }
}
