use anyhow::Result;
use lorekeeper_core::model::{display_name, SetId};
use lorekeeper_etl::inspect::{ChangeView, Inspector};
use lorekeeper_etl::{Config, SnapshotStore};
use serde_json::Value;

/// Width at which change values are cut off.
const VALUE_WIDTH: usize = 50;

fn date_or_unknown(date: Option<chrono::NaiveDate>) -> String {
    date.map_or_else(|| String::from("Unknown"), |d| d.to_string())
}

fn truncate(value: &Value) -> String {
    let text = match value {
        Value::Null => String::from("None"),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > VALUE_WIDTH {
        let cut: String = text.chars().take(VALUE_WIDTH).collect();
        format!("{cut}...")
    } else {
        text
    }
}

pub fn show_summary(config: &Config) -> Result<()> {
    let inspector = Inspector::new(&config.output_root);

    println!("📊 Lorcana Data Summary");
    println!("{}", "=".repeat(40));

    let Some(summary) = inspector.summary()? else {
        println!("❌ No processed data found. Run 'lorekeeper process' first.");
        return Ok(());
    };

    println!("📚 Sets: {} total", summary.sets.len());
    println!("Code | Name                 | Created    | Updated");
    println!("{}", "-".repeat(55));
    for set in &summary.sets {
        let code: String = set.code.chars().take(3).collect();
        let name: String = set.name.chars().take(20).collect();
        println!(
            "{:>4} | {:<20} | {} | {}",
            code,
            name,
            date_or_unknown(set.created_at),
            date_or_unknown(set.updated_at)
        );
    }

    println!("\n🃏 Card Files: {} sets", summary.card_files.len());
    println!("{:<40} | Cards", "Set ID");
    println!("{}", "-".repeat(50));
    for (set_id, count) in &summary.card_files {
        println!("{:<40} | {:>5}", set_id.as_str(), count);
    }
    println!("{}", "-".repeat(50));
    println!("{:<40} | {:>5}", "TOTAL", summary.total_cards);

    if let Some(last) = &summary.last_processed {
        println!("\n📊 Last processed: {last}");
    }
    match SnapshotStore::new(&config.snapshot_root).latest_folder() {
        Some(folder) => println!("📥 Latest snapshot: {}", folder.date),
        None => println!("📥 No snapshots under {}", config.snapshot_root.display()),
    }
    println!("📁 Data location: {}", summary.data_dir.display());

    Ok(())
}

pub fn show_set_details(config: &Config, set_id: &str) -> Result<()> {
    let inspector = Inspector::new(&config.output_root);
    let set_id = SetId::new(set_id);

    let Some(details) = inspector.set_details(&set_id)? else {
        println!("❌ Set {set_id} not found.");
        return Ok(());
    };

    println!("🃏 Set Details: {} ({})", details.set_id, display_name(&details.set_id));
    println!("{}", "=".repeat(50));
    println!("Total cards: {}", details.total_cards);
    if details.total_cards == 0 {
        return Ok(());
    }

    println!("Created: {}", date_or_unknown(details.created_at));
    println!("Updated: {}", date_or_unknown(details.updated_at));

    println!("\nSample cards:");
    for (i, card) in details.sample.iter().enumerate() {
        println!(
            "  {}. {} ({})",
            i + 1,
            card.name,
            card.rarity.as_deref().unwrap_or("N/A")
        );
    }
    if details.total_cards > details.sample.len() {
        println!(
            "  ... and {} more cards",
            details.total_cards - details.sample.len()
        );
    }

    Ok(())
}

pub fn show_changes(config: &Config, card_name: Option<&str>, limit: usize) -> Result<()> {
    let inspector = Inspector::new(&config.output_root);

    let Some(view) = inspector.card_changes(card_name, limit)? else {
        println!("❌ No card changes data found. Process data first to track changes.");
        return Ok(());
    };

    match view {
        ChangeView::Empty => {
            println!("📝 No card changes recorded yet.");
        }
        ChangeView::Matches(matches) => {
            println!("🔄 Card Changes Summary");
            println!("{}", "=".repeat(50));

            if matches.is_empty() {
                println!(
                    "❌ No changes found for cards matching '{}'",
                    card_name.unwrap_or_default()
                );
                return Ok(());
            }

            for card in matches {
                println!("\n🃏 {}", card.card_name);
                println!("   Card ID: {}", card.card_id);
                println!("   Total changes: {}", card.total_changes);
                for change in &card.recent {
                    println!("   📅 {}: {}", change.date, change.field);
                    println!("      Old: {}", truncate(&change.old_value));
                    println!("      New: {}", truncate(&change.new_value));
                }
            }
        }
        ChangeView::Overview(overview) => {
            println!("🔄 Card Changes Summary");
            println!("{}", "=".repeat(50));
            println!("📊 Total cards with changes: {}", overview.cards_with_changes);
            println!("📊 Total changes recorded: {}", overview.total_changes);

            println!("\n🔥 Most Changed Cards (Top {limit}):");
            for (i, (_, name, count)) in overview.most_changed.iter().enumerate() {
                println!("   {}. {} ({} changes)", i + 1, name, count);
            }

            println!("\n📊 Change Types:");
            for (field, count) in &overview.by_field {
                println!("   {field}: {count} changes");
            }
        }
    }

    Ok(())
}
