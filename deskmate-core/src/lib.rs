//! Core logic for deskmate.
//!
//! Shared by the `deskmate` CLI and calendar providers:
//! - `event`, `store` and `reconcile` for offline-first calendar events
//! - `visit`, `interests` and `recommend` for history-based recommendations
//! - `content` for video and news search
//! - `remote` for the CLI-provider protocol

pub mod config;
pub mod content;
pub mod date_range;
pub mod error;
pub mod event;
pub mod http;
pub mod interests;
pub mod recommend;
pub mod reconcile;
pub mod remote;
pub mod store;
pub mod visit;

pub use config::DeskmateConfig;
pub use date_range::DateRange;
pub use error::{DeskmateError, DeskmateResult};
pub use event::*;
