use anyhow::{Context, Result};
use lorekeeper_etl::checklist::{parse_checklist, reconcile};
use lorekeeper_etl::{Config, Consolidated};
use std::path::Path;

pub fn run_checklist(
    config: &Config,
    file: &Path,
    set_name: Option<&str>,
    verify: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read checklist {}", file.display()))?;
    let set_name = match set_name {
        Some(name) => name.to_string(),
        None => file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("Cannot derive a set name from {}", file.display()))?,
    };

    let checklist = parse_checklist(&set_name, &text);

    println!("\n📄 Checklist: {}", checklist.set_name);
    println!(
        "  Set id: {}{}",
        checklist.set.id(),
        if checklist.set.is_provisional() {
            " (provisional)"
        } else {
            ""
        }
    );
    println!("  Entries: {}\n", checklist.entries.len());

    println!("{:>6} | Card", "No.");
    println!("{}", "-".repeat(50));
    for entry in &checklist.entries {
        println!("{:>6} | {}", entry.card_number, entry.card_name);
    }

    if verify {
        let state = Consolidated::load(&config.output_root)
            .context("Failed to load consolidated output")?;
        let cards = state
            .cards
            .get(checklist.set.id())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let missing = reconcile(&checklist, cards);

        println!();
        if missing.is_empty() {
            println!("✓ All {} checklist cards are consolidated", checklist.entries.len());
        } else {
            println!("❌ {} checklist cards are not consolidated:", missing.len());
            for entry in missing {
                println!("  {:>6} | {}", entry.card_number, entry.card_name);
            }
        }
    }

    Ok(())
}
