pub mod checklist;
pub mod config;
pub mod inspect;
pub mod load;
pub mod process;

pub use checklist::run_checklist;
pub use inspect::{show_changes, show_set_details, show_summary};
pub use load::run_load;
pub use process::run_process;
