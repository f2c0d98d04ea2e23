//! Repository layer: table-scoped database operations.
//!
//! Functions take a borrowed `Connection`; locking and connection
//! ownership live one layer up (`history::HistoryStore`,
//! `preferences::ProviderPreferences`).

mod history;
mod preference;

pub use history::*;
pub use preference::*;
