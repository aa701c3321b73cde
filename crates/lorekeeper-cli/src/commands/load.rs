use anyhow::{Context, Result};
use lorekeeper_etl::{pipeline, Config};

pub fn run_load(config: &Config) -> Result<()> {
    println!("\n🗄️  Loading consolidated data\n");
    println!("  Source: {}", config.output_root.display());
    println!("  Database: {}", config.database_path.display());

    let summary = pipeline::load(config).context("Load failed")?;

    println!("\n  ✓ {} sets", summary.sets);
    println!("  ✓ {} cards", summary.cards);
    println!("  ✓ {} change entries", summary.changes);

    Ok(())
}
