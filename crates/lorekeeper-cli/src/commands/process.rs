use anyhow::{Context, Result};
use lorekeeper_etl::pipeline;
use lorekeeper_etl::{Config, RunMode};

/// Consolidate snapshots and print the run summary.
pub fn run_process(config: &Config, mode: RunMode) -> Result<()> {
    println!("\n🃏 Lorekeeper Consolidation\n");
    println!("  Snapshots: {}", config.snapshot_root.display());
    println!("  Output: {}", config.output_root.display());
    println!("  Signature: {}", config.signature);
    if mode == RunMode::Force {
        println!("\n  🔄 Processing history cleared - all files will be reprocessed");
    }
    println!();

    let summary = pipeline::process(config, mode).context("Consolidation failed")?;

    println!("📋 Summary:");
    println!("  Files processed: {}", summary.files_processed);
    println!("  Files skipped (unchanged): {}", summary.files_skipped);
    if summary.files_failed > 0 {
        println!(
            "  Files failed: {} (see log; they will be retried)",
            summary.files_failed
        );
    }
    println!("  Total sets: {}", summary.total_sets);
    println!("  Total cards: {}", summary.total_cards);
    println!("  New changes recorded: {}", summary.new_changes);

    println!("\n✓ Processing complete!");
    println!("\nNext steps:");
    println!("  - Run 'lorekeeper inspect' to review the consolidated data");
    println!("  - Run 'lorekeeper changes' to see recorded card changes");

    Ok(())
}
