//! Local-first calendar operations with best-effort remote sync.
//!
//! Every write lands in the local store before the remote service is
//! contacted, and a remote failure only downgrades the result to
//! `synced: false`. Reads merge local and remote events, with the remote
//! version winning when both describe the same event.

use std::collections::HashSet;

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::date_range::DateRange;
use crate::error::{DeskmateError, DeskmateResult};
use crate::event::{Event, EventPayload, generate_local_id};
use crate::remote::{Remote, RemoteCalendar};
use crate::store::EventStore;

/// Result of a create/update/delete.
#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
    pub synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WriteOutcome {
    fn synced(event: Option<Event>) -> Self {
        WriteOutcome {
            success: true,
            event,
            synced: true,
            message: None,
        }
    }

    fn local_only(event: Option<Event>, message: String) -> Self {
        WriteOutcome {
            success: true,
            event,
            synced: false,
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub synced_count: usize,
    pub failed_count: usize,
    pub message: String,
}

const REMOTE_UNAVAILABLE: &str = "Remote calendar service not available";

pub struct EventReconciler<R = Remote> {
    store: EventStore,
    remote: Option<R>,
}

impl<R: RemoteCalendar> EventReconciler<R> {
    /// `remote` is None when no calendar service is configured or reachable.
    pub fn new(store: EventStore, remote: Option<R>) -> Self {
        EventReconciler { store, remote }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Events starting in `range`, merged with the remote calendar when it answers.
    ///
    /// A range missing either bound means the current month. Remote events
    /// are written through to the local store.
    pub async fn get_events(&self, range: &DateRange) -> DeskmateResult<Vec<Event>> {
        let range = if range.is_bounded() {
            range.clone()
        } else {
            DateRange::month_of(Local::now().date_naive())
        };

        let local = self.store.get_all(&range)?;

        let Some(remote) = &self.remote else {
            return Ok(local);
        };

        let remote_events = match remote.list_events(&range).await {
            Ok(events) => events,
            Err(e) => {
                warn!("Could not fetch remote events, using local store only: {}", e);
                return Ok(local);
            }
        };

        let remote_events: Vec<Event> = remote_events.into_iter().map(Event::from_remote).collect();
        for event in &remote_events {
            if let Err(e) = self.cache_remote_event(event) {
                warn!("Failed to cache remote event {}: {}", event.id, e);
            }
        }

        Ok(merge_events(local, remote_events))
    }

    /// Write a remote event through to the local store.
    ///
    /// A row already tied to the event (by remote id, else by id) is
    /// refreshed in place under its own local id, wherever it is dated, so
    /// one remote event never owns two rows.
    fn cache_remote_event(&self, event: &Event) -> DeskmateResult<()> {
        let existing = match self.store.get_by_remote_id(&event.id)? {
            Some(row) => Some(row),
            None => self.store.get_by_id(&event.id)?,
        };

        match existing {
            Some(row) if same_content(&row, event) => {}
            Some(row) => {
                let refreshed = Event {
                    id: row.id,
                    created_at: row.created_at,
                    ..event.clone()
                };
                self.store.add_or_update(&refreshed)?;
                debug!("Refreshed local copy {} of remote event {}", refreshed.id, event.id);
            }
            None => {
                self.store.add_or_update(event)?;
                debug!("Cached remote event {}", event.id);
            }
        }

        Ok(())
    }

    /// Save a new event locally, then try to create it remotely.
    pub async fn create_event(&self, payload: EventPayload) -> DeskmateResult<WriteOutcome> {
        let mut event = payload.into_event(generate_local_id)?;
        event.id = self.store.add_or_update(&event)?;

        let Some(remote) = &self.remote else {
            return Ok(WriteOutcome::local_only(
                Some(event),
                format!("Event saved locally only ({})", REMOTE_UNAVAILABLE.to_lowercase()),
            ));
        };

        match remote.insert_event(event.remote_body()).await {
            Ok(created) => match self.store.mark_synced(&event.id, &created.id) {
                Ok(_) => {
                    info!("Event {} created remotely as {}", event.id, created.id);
                    Ok(WriteOutcome::synced(Some(Event::from_remote(created))))
                }
                Err(e) => {
                    warn!(
                        "Event {} created remotely as {} but not marked locally: {}",
                        event.id, created.id, e
                    );
                    Ok(WriteOutcome {
                        message: Some(format!(
                            "Event created remotely but the local copy is still marked unsynced: {e}"
                        )),
                        ..WriteOutcome::synced(Some(Event::from_remote(created)))
                    })
                }
            },
            Err(e) => {
                warn!("Remote create failed for {}: {}", event.id, e);
                Ok(WriteOutcome::local_only(
                    Some(event),
                    format!("Event saved locally but remote sync failed: {e}"),
                ))
            }
        }
    }

    /// Apply `payload` to an existing event locally, then remotely if the
    /// remote service already knows the event.
    ///
    /// Fields missing from `payload` keep their current values.
    pub async fn update_event(&self, id: &str, payload: EventPayload) -> DeskmateResult<WriteOutcome> {
        let existing = self
            .find(id)?
            .ok_or_else(|| DeskmateError::NotFound(format!("event '{id}'")))?;

        let event = apply_update(existing, payload)?;
        self.store.add_or_update(&event)?;

        let Some(remote_id) = event.sync.remote_id().map(str::to_string) else {
            return Ok(WriteOutcome::local_only(
                Some(event),
                "Event updated locally only (not yet synced)".to_string(),
            ));
        };

        let Some(remote) = &self.remote else {
            return Ok(WriteOutcome::local_only(
                Some(event),
                format!("Event updated locally only ({})", REMOTE_UNAVAILABLE.to_lowercase()),
            ));
        };

        match remote.update_event(&remote_id, event.remote_body()).await {
            Ok(updated) => {
                info!("Event {} updated remotely", remote_id);
                Ok(WriteOutcome::synced(Some(Event::from_remote(updated))))
            }
            Err(e) => {
                warn!("Remote update failed for {}: {}", remote_id, e);
                Ok(WriteOutcome::local_only(
                    Some(event),
                    format!("Event updated locally but remote sync failed: {e}"),
                ))
            }
        }
    }

    /// Delete locally, then remotely if the remote service knows the event.
    pub async fn delete_event(&self, id: &str) -> DeskmateResult<WriteOutcome> {
        let existing = self
            .find(id)?
            .ok_or_else(|| DeskmateError::NotFound(format!("event '{id}'")))?;

        self.store.delete(&existing.id)?;
        info!("Deleted event {} locally", existing.id);

        let (Some(remote), Some(remote_id)) = (&self.remote, existing.sync.remote_id()) else {
            let message = if existing.is_synced() {
                format!("Event deleted locally only ({})", REMOTE_UNAVAILABLE.to_lowercase())
            } else {
                "Event deleted locally (it was never synced)".to_string()
            };
            return Ok(WriteOutcome::local_only(None, message));
        };

        match remote.delete_event(remote_id).await {
            Ok(()) => Ok(WriteOutcome::synced(None)),
            Err(e) => {
                warn!("Remote delete failed for {}: {}", remote_id, e);
                Ok(WriteOutcome::local_only(
                    None,
                    format!("Event deleted locally but remote delete failed: {e}"),
                ))
            }
        }
    }

    /// Push every unsynced event to the remote service, one at a time.
    pub async fn sync_events(&self) -> DeskmateResult<SyncReport> {
        let Some(remote) = &self.remote else {
            return Ok(SyncReport {
                success: false,
                synced_count: 0,
                failed_count: 0,
                message: REMOTE_UNAVAILABLE.to_string(),
            });
        };

        let pending = self.store.get_unsynced()?;
        let mut synced_count = 0;
        let mut failed_count = 0;

        for event in &pending {
            let created = match remote.insert_event(event.remote_body()).await {
                Ok(created) => created,
                Err(e) => {
                    warn!("Failed to sync event {}: {}", event.id, e);
                    failed_count += 1;
                    continue;
                }
            };

            match self.store.mark_synced(&event.id, &created.id) {
                Ok(_) => synced_count += 1,
                Err(e) => {
                    warn!("Event {} synced but not marked locally: {}", event.id, e);
                    failed_count += 1;
                }
            }
        }

        info!("Synced {} events, {} failed", synced_count, failed_count);
        Ok(SyncReport {
            success: true,
            synced_count,
            failed_count,
            message: format!("Synced {synced_count} events, {failed_count} failed"),
        })
    }

    /// Look an event up by local id, then by remote id.
    fn find(&self, id: &str) -> DeskmateResult<Option<Event>> {
        match self.store.get_by_id(id)? {
            Some(event) => Ok(Some(event)),
            None => self.store.get_by_remote_id(id),
        }
    }
}

/// Merge by identity with remote events replacing local ones, ordered by start.
fn merge_events(local: Vec<Event>, remote: Vec<Event>) -> Vec<Event> {
    let mut merged: Vec<Event> = {
        let remote_ids: HashSet<&str> = remote.iter().map(|e| e.id.as_str()).collect();
        local
            .into_iter()
            .filter(|e| !remote_ids.contains(e.identity()))
            .collect()
    };
    merged.extend(remote);

    merged.sort_by_key(|e| (e.start.date(), e.start.time()));
    merged
}

fn same_content(stored: &Event, remote: &Event) -> bool {
    stored.sync == remote.sync
        && stored.remote_body() == remote.remote_body()
        && stored.attendees == remote.attendees
        && stored.conference_link == remote.conference_link
}

fn apply_update(existing: Event, payload: EventPayload) -> DeskmateResult<Event> {
    let conference_link = payload.conference_link().or(existing.conference_link);

    let event = Event {
        id: existing.id,
        summary: payload.summary.unwrap_or(existing.summary),
        description: payload.description.unwrap_or(existing.description),
        location: payload.location.unwrap_or(existing.location),
        start: payload.start.unwrap_or(existing.start),
        end: payload.end.unwrap_or(existing.end),
        attendees: payload.attendees.unwrap_or(existing.attendees),
        conference_link,
        sync: existing.sync,
        created_at: existing.created_at,
        updated_at: existing.updated_at,
    };

    event.validate()?;
    Ok(event)
}
