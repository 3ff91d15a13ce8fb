//! Local SQLite record store.
//!
//! Two databases: `calendar_events.db` ([`EventStore`]) and `history.db`
//! ([`HistoryStore`], holding the visit log and the recommendation snapshot).
//! Each invocation opens its own connection; tables are created on open.

mod events;
mod history;
mod recommendations;

pub use events::EventStore;
pub use history::HistoryStore;

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::DeskmateResult;

/// Open a database file, creating its parent directory if needed.
fn open_connection(path: &Path) -> DeskmateResult<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Connection::open(path)?)
}

/// Current time in the format stored in `created_at`/`updated_at` columns.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
