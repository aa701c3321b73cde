use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::model::field::MonitoredField;
use crate::model::ids::CardId;

/// A single card as captured from the card-data API.
///
/// Attributes the upstream payload does not guarantee are optional. Unknown
/// upstream keys (images, set reference, illustrators, ...) are carried in
/// `extra` and written back out untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub willpower: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lore: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<String>,

    /// Format name to legality status (e.g. `"core": "legal"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legalities: Option<BTreeMap<String, Value>>,

    /// Currency key to price; prices may be null upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prices: Option<BTreeMap<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifications: Option<Vec<String>>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<Vec<String>>,

    /// Date this card was first observed in a snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDate>,

    /// Date of the last observed change to a monitored field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDate>,

    /// Date of the newest snapshot this card was merged from. Not
    /// change-tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<NaiveDate>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card {
    #[must_use]
    pub fn new(id: impl Into<CardId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            version: None,
            cost: None,
            strength: None,
            willpower: None,
            lore: None,
            rarity: None,
            collector_number: None,
            text: None,
            flavor_text: None,
            released_at: None,
            legalities: None,
            prices: None,
            keywords: None,
            classifications: None,
            card_type: None,
            created_at: None,
            updated_at: None,
            observed_at: None,
            extra: Map::new(),
        }
    }

    /// The value of a monitored field as JSON, `Null` when absent.
    #[must_use]
    pub fn monitored_value(&self, field: MonitoredField) -> Value {
        fn opt<T: Serialize>(value: Option<&T>) -> Value {
            value
                .and_then(|v| serde_json::to_value(v).ok())
                .unwrap_or(Value::Null)
        }

        match field {
            MonitoredField::Name => opt(self.name.as_ref()),
            MonitoredField::Version => opt(self.version.as_ref()),
            MonitoredField::Cost => opt(self.cost.as_ref()),
            MonitoredField::Strength => opt(self.strength.as_ref()),
            MonitoredField::Willpower => opt(self.willpower.as_ref()),
            MonitoredField::Lore => opt(self.lore.as_ref()),
            MonitoredField::Text => opt(self.text.as_ref()),
            MonitoredField::FlavorText => opt(self.flavor_text.as_ref()),
            MonitoredField::Rarity => opt(self.rarity.as_ref()),
            MonitoredField::ReleasedAt => opt(self.released_at.as_ref()),
            MonitoredField::Legalities => opt(self.legalities.as_ref()),
            MonitoredField::Prices => opt(self.prices.as_ref()),
            MonitoredField::CollectorNumber => opt(self.collector_number.as_ref()),
            MonitoredField::Keywords => opt(self.keywords.as_ref()),
            MonitoredField::Classifications => opt(self.classifications.as_ref()),
        }
    }

    /// Ledger display name: `"<name> - <version>"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} - {}",
            self.name.as_deref().unwrap_or_default(),
            self.version.as_deref().unwrap_or_default()
        )
    }

    /// The newest snapshot date known to have shaped this record.
    #[must_use]
    pub fn last_seen(&self) -> Option<NaiveDate> {
        self.updated_at.max(self.observed_at)
    }

    /// Replace every upstream attribute with `newer`'s, keeping this card's
    /// bookkeeping dates.
    pub fn absorb(&mut self, newer: Self) {
        let created_at = self.created_at;
        let updated_at = self.updated_at;
        let observed_at = self.observed_at;
        *self = Self {
            created_at,
            updated_at,
            observed_at,
            ..newer
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_json() -> Value {
        json!({
            "id": "crd_1",
            "name": "Mickey Mouse",
            "version": "Brave Little Tailor",
            "cost": 8,
            "strength": 5,
            "willpower": 5,
            "lore": 4,
            "rarity": "Legendary",
            "collector_number": "115",
            "legalities": {"core": "legal"},
            "prices": {"usd": "12.50", "usd_foil": null},
            "keywords": ["Evasive"],
            "classifications": ["Storyborn", "Hero"],
            "type": ["Character"],
            "image_uris": {"digital": {"small": "s.avif", "normal": "n.avif", "large": "l.avif"}},
            "set": {"id": "set_1", "code": "1", "name": "The First Chapter"}
        })
    }

    #[test]
    fn test_card_parses_upstream_record() {
        let card: Card = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(card.id.as_str(), "crd_1");
        assert_eq!(card.cost, Some(8));
        assert_eq!(card.card_type, Some(vec!["Character".to_string()]));
        assert!(card.extra.contains_key("image_uris"));
        assert!(card.extra.contains_key("set"));
        assert!(!card.extra.contains_key("type"));
        assert!(card.created_at.is_none());
    }

    #[test]
    fn test_card_writes_back_pass_through_fields() {
        let card: Card = serde_json::from_value(sample_json()).unwrap();
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["image_uris"]["digital"]["normal"], json!("n.avif"));
        assert_eq!(value["type"], json!(["Character"]));
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_monitored_value() {
        let card: Card = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(card.monitored_value(MonitoredField::Rarity), json!("Legendary"));
        assert_eq!(card.monitored_value(MonitoredField::Lore), json!(4));
        assert_eq!(
            card.monitored_value(MonitoredField::Prices),
            json!({"usd": "12.50", "usd_foil": null})
        );
        assert_eq!(card.monitored_value(MonitoredField::Text), Value::Null);
    }

    #[test]
    fn test_display_name() {
        let mut card = Card::new("crd_2", "Stitch");
        assert_eq!(card.display_name(), "Stitch - ");
        card.version = Some("Rock Star".to_string());
        assert_eq!(card.display_name(), "Stitch - Rock Star");
    }

    #[test]
    fn test_absorb_keeps_dates() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut stored = Card::new("crd_3", "Old");
        stored.created_at = Some(day);
        stored.updated_at = Some(day);

        let mut newer = Card::new("crd_3", "New");
        newer.extra.insert("illustrators".to_string(), json!(["Someone"]));
        stored.absorb(newer);

        assert_eq!(stored.name.as_deref(), Some("New"));
        assert_eq!(stored.created_at, Some(day));
        assert!(stored.extra.contains_key("illustrators"));
    }

    #[test]
    fn test_last_seen_is_newest_bookkeeping_date() {
        let mut card = Card::new("crd_4", "Belle");
        assert_eq!(card.last_seen(), None);

        card.updated_at = NaiveDate::from_ymd_opt(2024, 1, 5);
        card.observed_at = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(card.last_seen(), NaiveDate::from_ymd_opt(2024, 1, 5));

        card.observed_at = NaiveDate::from_ymd_opt(2024, 1, 10);
        assert_eq!(card.last_seen(), NaiveDate::from_ymd_opt(2024, 1, 10));
    }
}
