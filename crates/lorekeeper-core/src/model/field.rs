use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A card attribute tracked for change detection.
///
/// Changes to anything outside this list are absorbed silently when a newer
/// record replaces a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoredField {
    Name,
    Version,
    Cost,
    Strength,
    Willpower,
    Lore,
    Text,
    FlavorText,
    Rarity,
    ReleasedAt,
    Legalities,
    Prices,
    CollectorNumber,
    Keywords,
    Classifications,
}

impl MonitoredField {
    /// Every monitored field, in comparison order.
    pub const ALL: [Self; 15] = [
        Self::Name,
        Self::Version,
        Self::Cost,
        Self::Strength,
        Self::Willpower,
        Self::Lore,
        Self::Text,
        Self::FlavorText,
        Self::Rarity,
        Self::ReleasedAt,
        Self::Legalities,
        Self::Prices,
        Self::CollectorNumber,
        Self::Keywords,
        Self::Classifications,
    ];

    /// The upstream JSON key for this field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Version => "version",
            Self::Cost => "cost",
            Self::Strength => "strength",
            Self::Willpower => "willpower",
            Self::Lore => "lore",
            Self::Text => "text",
            Self::FlavorText => "flavor_text",
            Self::Rarity => "rarity",
            Self::ReleasedAt => "released_at",
            Self::Legalities => "legalities",
            Self::Prices => "prices",
            Self::CollectorNumber => "collector_number",
            Self::Keywords => "keywords",
            Self::Classifications => "classifications",
        }
    }
}

impl fmt::Display for MonitoredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitoredField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

/// Whether a JSON value counts as absent for diffing.
///
/// Null, `false`, zero, and empty strings, arrays, and objects are all blank,
/// so a field missing on one side and empty on the other is not a change.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
