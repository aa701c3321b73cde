use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::ids::SetId;

/// A card set as listed by the card-data API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSet {
    pub id: SetId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<String>,

    /// Upstream fields with no dedicated attribute (e.g. `prereleased_at`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Date this set was first observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDate>,

    /// Date of the last observed change to any upstream field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDate>,

    /// Date of the run that last wrote this record. Not change-tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<NaiveDate>,
}

impl CardSet {
    #[must_use]
    pub fn new(id: impl Into<SetId>, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: code.into(),
            released_at: None,
            extra: Map::new(),
            created_at: None,
            updated_at: None,
            processed_at: None,
        }
    }

    /// Whether the upstream content of two records differs, ignoring the
    /// bookkeeping dates.
    #[must_use]
    pub fn content_differs(&self, other: &Self) -> bool {
        self.id != other.id
            || self.name != other.name
            || self.code != other.code
            || self.released_at != other.released_at
            || self.extra != other.extra
    }

    /// Replace the upstream content with `newer`'s, keeping the dates.
    pub fn absorb(&mut self, newer: Self) {
        self.name = newer.name;
        self.code = newer.code;
        self.released_at = newer.released_at;
        self.extra = newer.extra;
    }
}
