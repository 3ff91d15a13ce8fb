use anyhow::{Context, Result};
use clap::ValueEnum;
use deskmate_core::DeskmateConfig;
use deskmate_core::date_range::DateRange;
use deskmate_core::event::EventPayload;
use deskmate_core::reconcile::EventReconciler;
use deskmate_core::remote::Remote;
use deskmate_core::store::EventStore;
use serde_json::Value;
use tracing::{debug, warn};

use super::to_json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum CalendarAction {
    GetEvents,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    SyncEvents,
}

pub struct CalendarArgs {
    pub action: CalendarAction,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub event_id: Option<String>,
    pub event_data: Option<String>,
}

pub async fn run(config: &DeskmateConfig, args: CalendarArgs) -> Result<Value> {
    let store = EventStore::open(config.calendar_db_path())?;
    let reconciler = EventReconciler::new(store, remote_for(config));

    match args.action {
        CalendarAction::GetEvents => {
            let range = DateRange::from_args(args.start_date.as_deref(), args.end_date.as_deref())
                .map_err(|e| anyhow::anyhow!(e))?;
            to_json(&reconciler.get_events(&range).await?)
        }
        CalendarAction::CreateEvent => {
            let payload = parse_event_data(args.event_data.as_deref())?;
            to_json(&reconciler.create_event(payload).await?)
        }
        CalendarAction::UpdateEvent => {
            let event_id = args
                .event_id
                .context("Missing event ID (--event-id is required for update_event)")?;
            let payload = parse_event_data(args.event_data.as_deref())?;
            to_json(&reconciler.update_event(&event_id, payload).await?)
        }
        CalendarAction::DeleteEvent => {
            let event_id = args
                .event_id
                .context("Missing event ID (--event-id is required for delete_event)")?;
            to_json(&reconciler.delete_event(&event_id).await?)
        }
        CalendarAction::SyncEvents => to_json(&reconciler.sync_events().await?),
    }
}

/// The configured remote calendar, if its provider is installed.
fn remote_for(config: &DeskmateConfig) -> Option<Remote> {
    let Some(provider) = config.calendar_provider.as_deref() else {
        debug!("No calendar provider configured, working locally");
        return None;
    };

    let remote = Remote::available(provider, &config.calendar_id);
    if remote.is_none() {
        warn!(
            "Calendar provider '{}' is not installed (deskmate-provider-{} not on PATH), working locally",
            provider, provider
        );
    }
    remote
}

fn parse_event_data(raw: Option<&str>) -> Result<EventPayload> {
    let raw = raw.context("Missing event data (--event-data is required)")?;
    serde_json::from_str(raw).context("Invalid --event-data JSON")
}
