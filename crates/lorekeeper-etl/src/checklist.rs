//! Checklist text parsing.
//!
//! Printed set checklists list one card per line as `<number> <name>`,
//! with the ink type (and the `TOTAL` footer) in the same column. PDF text
//! extraction happens upstream; this module works on the extracted text.

use lorekeeper_core::model::{resolve_set_identifier, Card, SetIdentifier};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static CARD_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(.*)$").expect("card line pattern"));

#[allow(clippy::expect_used)]
static NOISE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(AMBER|AMETHYST|EMERALD|RUBY|SAPPHIRE|STEEL|TOTAL)\b").expect("noise pattern")
});

/// One `(card_number, card_name)` row of a checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistEntry {
    pub card_number: String,
    pub card_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checklist {
    pub set_name: String,
    pub set: SetIdentifier,
    pub entries: Vec<ChecklistEntry>,
}

/// Strip ink-type words and `TOTAL` from a checklist card name.
pub fn clean_card_name(raw: &str) -> String {
    NOISE_WORDS
        .replace_all(raw, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse extracted checklist text for a named set.
///
/// Lines not starting with a number are ignored, as are lines whose name is
/// empty once cleaned (e.g. a bare total).
pub fn parse_checklist(set_name: &str, text: &str) -> Checklist {
    let entries = text
        .lines()
        .filter_map(|line| {
            let caps = CARD_LINE.captures(line.trim())?;
            let card_name = clean_card_name(&caps[2]);
            if card_name.is_empty() {
                return None;
            }
            Some(ChecklistEntry {
                card_number: caps[1].to_string(),
                card_name,
            })
        })
        .collect();

    let set = resolve_set_identifier(set_name);
    if set.is_provisional() {
        log::info!("Checklist set '{}' has no canonical id; using {}", set_name, set.id());
    }

    Checklist {
        set_name: set_name.to_string(),
        set,
        entries,
    }
}

/// Checklist entries with no consolidated card of the same collector number.
pub fn reconcile<'a>(checklist: &'a Checklist, cards: &[Card]) -> Vec<&'a ChecklistEntry> {
    let known: HashSet<&str> = cards
        .iter()
        .filter_map(|card| card.collector_number.as_deref())
        .map(|number| number.trim_start_matches('0'))
        .collect();

    checklist
        .entries
        .iter()
        .filter(|entry| !known.contains(entry.card_number.trim_start_matches('0')))
        .collect()
}
