use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

define_id!(SetId, "Stable identifier of a card set (`set_...`).");
define_id!(CardId, "Stable identifier of a card, unique across all sets.");

/// Known checklist slugs and the API-issued set id each maps to.
///
/// Apostrophe variants map to the same id; the first slug listed for an id
/// is its display name.
const SET_SLUGS: &[(&str, &str)] = &[
    ("the_first_chapter", "set_7ecb0e0c71af496a9e01110e23824e0a5"),
    ("rise_of_the_floodborn", "set_142d2dfb5d4b4b739a1017dc4bb0fcd2"),
    ("into_the_inklands", "set_10a1db03fe66417c9912494b94463e8e"),
    ("ursula's_return", "set_8f4cbf5aef324eb295c4add5673e684f"),
    ("ursulas_return", "set_8f4cbf5aef324eb295c4add5673e684f"),
    ("shimmering_skies", "set_c64f092e725a4f66966f43af3aa161b6"),
    ("azurite_sea", "set_0df34ab314e04a479ef3538fd6c3e4e1"),
    ("archazia's_island", "set_ceb34c63638a4ce6b80e518393964c8f"),
    ("archazias_island", "set_ceb34c63638a4ce6b80e518393964c8f"),
    ("reign_of_jafar", "set_e4fe64374c144642a035ee7b8451f990"),
    ("fabled", "set_42a2e9232c43494dab2c72945ea6879e"),
    ("d23_collection", "set_ec81a739fb204f10b31dc649c535c82e"),
    ("promo_set_1", "set_c254adfcbf6d4e3482a675ecece86dcc"),
    ("promo_set_2", "set_1fd69818f6e44dd79e922f403aa4f6d9"),
    ("challenge_promo", "set_e0eb34fc0fbb446886f84c34381d4dce"),
];

/// The outcome of resolving a raw set name or id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SetIdentifier {
    /// An API-issued id, either given directly or mapped from a known slug.
    Canonical(SetId),
    /// Synthesized from an unknown slug as `set_<slug>`. Stable, but may not
    /// match the canonical id once the slug becomes known.
    Provisional(SetId),
}

impl SetIdentifier {
    #[must_use]
    pub fn id(&self) -> &SetId {
        match self {
            Self::Canonical(id) | Self::Provisional(id) => id,
        }
    }

    #[must_use]
    pub fn into_id(self) -> SetId {
        match self {
            Self::Canonical(id) | Self::Provisional(id) => id,
        }
    }

    #[must_use]
    pub const fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional(_))
    }
}

fn strip_apostrophes(s: &str) -> String {
    s.chars().filter(|c| *c != '\'' && *c != '\u{2019}').collect()
}

/// Resolve a checklist slug or file stem to a set id.
///
/// Anything already shaped like `set_...` is taken as canonical. Slugs are
/// matched case-insensitively, ignoring apostrophes and underscores.
#[must_use]
pub fn resolve_set_identifier(raw: &str) -> SetIdentifier {
    let raw = raw.trim();
    if raw.starts_with("set_") {
        return SetIdentifier::Canonical(SetId::new(raw));
    }

    let cleaned = strip_apostrophes(&raw.to_lowercase());
    if let Some((_, id)) = SET_SLUGS.iter().find(|(slug, _)| *slug == cleaned) {
        return SetIdentifier::Canonical(SetId::new(*id));
    }

    let squashed = cleaned.replace('_', "");
    if let Some((_, id)) = SET_SLUGS
        .iter()
        .find(|(slug, _)| strip_apostrophes(slug).replace('_', "") == squashed)
    {
        return SetIdentifier::Canonical(SetId::new(*id));
    }

    SetIdentifier::Provisional(SetId::new(format!("set_{}", raw.to_lowercase())))
}

/// Human-readable slug for a set id, falling back to the id without its
/// `set_` prefix.
#[must_use]
pub fn friendly_name(id: &SetId) -> String {
    SET_SLUGS
        .iter()
        .find(|(_, known)| *known == id.as_str())
        .map(|(slug, _)| (*slug).to_string())
        .unwrap_or_else(|| id.as_str().trim_start_matches("set_").to_string())
}

/// Title-cased display form of [`friendly_name`], e.g. "The First Chapter".
#[must_use]
pub fn display_name(id: &SetId) -> String {
    friendly_name(id)
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
