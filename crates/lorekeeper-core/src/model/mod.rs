pub mod card;
pub mod field;
pub mod ids;
pub mod set;

pub use card::Card;
pub use field::{is_blank, MonitoredField};
pub use ids::{
    display_name, friendly_name, resolve_set_identifier, CardId, SetId, SetIdentifier,
};
pub use set::CardSet;
