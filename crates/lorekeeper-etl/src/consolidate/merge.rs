//! Set and card merge rules.

use chrono::NaiveDate;
use lorekeeper_core::ledger::{ChangeEntry, ChangeLedger};
use lorekeeper_core::model::{is_blank, Card, CardId, CardSet, MonitoredField, SetId};
use std::collections::{BTreeMap, HashMap};

/// Whether a record observed on `observed` is older than the newest
/// observation already folded into the stored entity.
fn is_stale(last_seen: Option<NaiveDate>, observed: NaiveDate) -> bool {
    last_seen.is_some_and(|seen| observed < seen)
}

/// Fold incoming set records into the consolidated sets.
///
/// New sets get `created_at = updated_at = observed`. A known set is
/// overwritten, and its `updated_at` advanced, only when an upstream field
/// differs. Duplicate ids within `incoming` resolve to the last record.
pub fn merge_sets(
    mut existing: BTreeMap<SetId, CardSet>,
    incoming: Vec<CardSet>,
    observed: NaiveDate,
) -> BTreeMap<SetId, CardSet> {
    for mut set in incoming {
        let Some(stored) = existing.get_mut(&set.id) else {
            set.created_at = Some(observed);
            set.updated_at = Some(observed);
            set.processed_at = None;
            existing.insert(set.id.clone(), set);
            continue;
        };

        if is_stale(stored.updated_at, observed) {
            log::debug!("Ignoring stale observation of set {} from {}", set.id, observed);
            continue;
        }

        if stored.content_differs(&set) {
            stored.absorb(set);
            stored.updated_at = Some(observed);
            stored.created_at.get_or_insert(observed);
        }
    }
    existing
}

/// Compare every monitored field of two versions of a card.
///
/// Values that are equal, or blank on both sides, produce no entry.
pub fn diff_card(old: &Card, new: &Card, observed: NaiveDate) -> Vec<ChangeEntry> {
    MonitoredField::ALL
        .iter()
        .filter_map(|&field| {
            let old_value = old.monitored_value(field);
            let new_value = new.monitored_value(field);
            if old_value == new_value || (is_blank(&old_value) && is_blank(&new_value)) {
                return None;
            }
            Some(ChangeEntry::field_change(field, old_value, new_value, observed))
        })
        .collect()
}

/// Fold incoming card records into one set's consolidated cards.
///
/// Existing cards keep their position; cards absent from `incoming` are
/// kept unchanged. Unknown cards are appended in first-seen order and each
/// gets a `card_added` entry. Duplicate ids within `incoming` resolve to the
/// last record.
pub fn merge_cards(
    existing: Vec<Card>,
    incoming: Vec<Card>,
    observed: NaiveDate,
    ledger: &mut ChangeLedger,
) -> Vec<Card> {
    let mut order: Vec<CardId> = Vec::with_capacity(incoming.len());
    let mut latest: HashMap<CardId, Card> = HashMap::with_capacity(incoming.len());
    for card in incoming {
        if !latest.contains_key(&card.id) {
            order.push(card.id.clone());
        }
        latest.insert(card.id.clone(), card);
    }

    let mut merged = Vec::with_capacity(existing.len() + latest.len());
    for mut stored in existing {
        if let Some(newer) = latest.remove(&stored.id) {
            update_card(&mut stored, newer, observed, ledger);
        }
        merged.push(stored);
    }

    for id in order {
        let Some(mut card) = latest.remove(&id) else {
            continue;
        };
        card.created_at = Some(observed);
        card.updated_at = Some(observed);
        card.observed_at = Some(observed);
        ledger.record(&card.id, &card.display_name(), [ChangeEntry::card_added(observed)]);
        log::debug!("New card {} ({})", card.id, card.display_name());
        merged.push(card);
    }

    merged
}

fn update_card(stored: &mut Card, newer: Card, observed: NaiveDate, ledger: &mut ChangeLedger) {
    if is_stale(stored.last_seen(), observed) {
        log::debug!("Ignoring stale observation of card {} from {}", stored.id, observed);
        return;
    }

    let changes = diff_card(stored, &newer, observed);
    let name = newer.display_name();
    stored.absorb(newer);
    stored.created_at.get_or_insert(observed);
    stored.observed_at = Some(observed);

    if !changes.is_empty() {
        log::debug!("Card {} changed in {} field(s)", stored.id, changes.len());
        stored.updated_at = Some(observed);
        ledger.record(&stored.id, &name, changes);
    }
    ledger.rename(&stored.id, &name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn card(id: &str, rarity: &str) -> Card {
        let mut card = Card::new(id, format!("Card {id}"));
        card.version = Some("Base".to_string());
        card.rarity = Some(rarity.to_string());
        card
    }

    #[test]
    fn test_diff_single_monitored_field() {
        let old = card("crd_1", "Common");
        let new = card("crd_1", "Rare");

        let changes = diff_card(&old, &new, date(5));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "rarity");
        assert_eq!(changes[0].old_value, json!("Common"));
        assert_eq!(changes[0].new_value, json!("Rare"));
        assert_eq!(changes[0].date, date(5));
    }

    #[test]
    fn test_diff_ignores_unmonitored_fields() {
        let old = card("crd_1", "Common");
        let mut new = card("crd_1", "Common");
        new.extra.insert("illustrators".into(), json!(["Someone"]));
        new.card_type = Some(vec!["Character".to_string()]);

        assert!(diff_card(&old, &new, date(5)).is_empty());
    }

    #[test]
    fn test_diff_treats_blank_values_as_equal() {
        let mut old = card("crd_1", "Common");
        let mut new = card("crd_1", "Common");
        old.flavor_text = None;
        new.flavor_text = Some(String::new());
        old.keywords = Some(Vec::new());
        new.keywords = None;
        old.strength = Some(0);

        assert!(diff_card(&old, &new, date(5)).is_empty());
    }

    #[test]
    fn test_merge_sets_new_changed_unchanged() {
        let existing = merge_sets(
            BTreeMap::new(),
            vec![
                CardSet::new("set_1", "The First Chapter", "1"),
                CardSet::new("set_2", "Rise of the Floodborn", "2"),
            ],
            date(1),
        );
        let first = &existing[&SetId::new("set_1")];
        assert_eq!(first.created_at, Some(date(1)));
        assert_eq!(first.updated_at, Some(date(1)));

        let merged = merge_sets(
            existing,
            vec![
                CardSet::new("set_1", "The First Chapter", "1"),
                CardSet::new("set_2", "Rise of the Floodborn", "2B"),
            ],
            date(5),
        );
        assert_eq!(merged[&SetId::new("set_1")].updated_at, Some(date(1)));
        let second = &merged[&SetId::new("set_2")];
        assert_eq!(second.code, "2B");
        assert_eq!(second.created_at, Some(date(1)));
        assert_eq!(second.updated_at, Some(date(5)));
    }

    #[test]
    fn test_merge_sets_last_in_batch_wins() {
        let merged = merge_sets(
            BTreeMap::new(),
            vec![
                CardSet::new("set_1", "Draft", "1"),
                CardSet::new("set_1", "The First Chapter", "1"),
            ],
            date(1),
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[&SetId::new("set_1")].name, "The First Chapter");
    }

    #[test]
    fn test_merge_sets_ignores_stale_observation() {
        let existing = merge_sets(
            BTreeMap::new(),
            vec![CardSet::new("set_1", "Old Name", "1")],
            date(1),
        );
        let existing = merge_sets(
            existing,
            vec![CardSet::new("set_1", "New Name", "1")],
            date(5),
        );
        let merged = merge_sets(
            existing,
            vec![CardSet::new("set_1", "Old Name", "1")],
            date(1),
        );
        let set = &merged[&SetId::new("set_1")];
        assert_eq!(set.name, "New Name");
        assert_eq!(set.updated_at, Some(date(5)));
    }

    #[test]
    fn test_merge_cards_order_and_additions() {
        let mut ledger = ChangeLedger::new();
        let existing = merge_cards(
            Vec::new(),
            vec![card("crd_b", "Common"), card("crd_a", "Common")],
            date(1),
            &mut ledger,
        );
        assert_eq!(ledger.total_changes(), 2);

        let merged = merge_cards(
            existing,
            vec![card("crd_c", "Rare"), card("crd_a", "Common")],
            date(10),
            &mut ledger,
        );
        let ids: Vec<_> = merged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["crd_b", "crd_a", "crd_c"]);

        let added = ledger.history(&CardId::new("crd_c")).unwrap();
        assert_eq!(added.card_name, "Card crd_c - Base");
        assert_eq!(added.changes.len(), 1);
        assert!(added.changes[0].is_addition());
        assert_eq!(added.changes[0].date, date(10));
        assert_eq!(merged[1].updated_at, Some(date(1)));
    }

    #[test]
    fn test_merge_cards_never_drops_existing() {
        let mut ledger = ChangeLedger::new();
        let existing = merge_cards(
            Vec::new(),
            vec![card("crd_1", "Common"), card("crd_2", "Common")],
            date(1),
            &mut ledger,
        );
        let merged = merge_cards(existing, Vec::new(), date(5), &mut ledger);
        assert_eq!(merged.len(), 2);
        assert_eq!(ledger.total_changes(), 2);
    }

    #[test]
    fn test_merge_cards_records_field_change() {
        let mut ledger = ChangeLedger::new();
        let existing = merge_cards(Vec::new(), vec![card("crd_1", "Common")], date(1), &mut ledger);
        let merged = merge_cards(existing, vec![card("crd_1", "Rare")], date(5), &mut ledger);

        assert_eq!(merged[0].rarity.as_deref(), Some("Rare"));
        assert_eq!(merged[0].created_at, Some(date(1)));
        assert_eq!(merged[0].updated_at, Some(date(5)));

        let history = ledger.history(&CardId::new("crd_1")).unwrap();
        assert_eq!(history.changes.len(), 2);
        assert_eq!(history.changes[1].field, "rarity");
    }

    #[test]
    fn test_merge_cards_identical_input_is_idempotent() {
        let mut ledger = ChangeLedger::new();
        let batch = vec![card("crd_1", "Common"), card("crd_2", "Rare")];
        let first = merge_cards(Vec::new(), batch.clone(), date(1), &mut ledger);
        let before = ledger.clone();

        let second = merge_cards(first.clone(), batch, date(1), &mut ledger);
        assert_eq!(first, second);
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_merge_cards_refreshes_unmonitored_fields_silently() {
        let mut ledger = ChangeLedger::new();
        let existing = merge_cards(Vec::new(), vec![card("crd_1", "Common")], date(1), &mut ledger);

        let mut newer = card("crd_1", "Common");
        newer.extra.insert("image_uris".into(), json!({"digital": {"small": "s.avif"}}));
        let merged = merge_cards(existing, vec![newer], date(5), &mut ledger);

        assert!(merged[0].extra.contains_key("image_uris"));
        assert_eq!(merged[0].updated_at, Some(date(1)));
        assert_eq!(ledger.total_changes(), 1);
    }

    #[test]
    fn test_merge_cards_duplicate_in_batch() {
        let mut ledger = ChangeLedger::new();
        let merged = merge_cards(
            Vec::new(),
            vec![card("crd_1", "Common"), card("crd_2", "Common"), card("crd_1", "Rare")],
            date(1),
            &mut ledger,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id.as_str(), "crd_1");
        assert_eq!(merged[0].rarity.as_deref(), Some("Rare"));
        assert_eq!(ledger.total_changes(), 2);
    }

    #[test]
    fn test_merge_cards_ignores_stale_observation() {
        let mut ledger = ChangeLedger::new();
        let existing = merge_cards(Vec::new(), vec![card("crd_1", "Common")], date(1), &mut ledger);
        let existing = merge_cards(existing, vec![card("crd_1", "Rare")], date(5), &mut ledger);
        let before = ledger.clone();

        let merged = merge_cards(existing, vec![card("crd_1", "Common")], date(1), &mut ledger);
        assert_eq!(merged[0].rarity.as_deref(), Some("Rare"));
        assert_eq!(merged[0].updated_at, Some(date(5)));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_merge_cards_older_snapshot_keeps_newer_pass_through_fields() {
        let mut ledger = ChangeLedger::new();
        let mut first = card("crd_1", "Common");
        first.extra.insert("image_uris".into(), json!("old.avif"));
        let mut second = card("crd_1", "Common");
        second.extra.insert("image_uris".into(), json!("new.avif"));

        let existing = merge_cards(Vec::new(), vec![first.clone()], date(1), &mut ledger);
        let existing = merge_cards(existing, vec![second], date(5), &mut ledger);
        assert_eq!(existing[0].observed_at, Some(date(5)));
        assert_eq!(existing[0].updated_at, Some(date(1)));

        let merged = merge_cards(existing, vec![first], date(1), &mut ledger);
        assert_eq!(merged[0].extra["image_uris"], json!("new.avif"));
        assert_eq!(merged[0].observed_at, Some(date(5)));
    }
}
