use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info, warn};

use super::{now_timestamp, open_connection};
use crate::date_range::DateRange;
use crate::error::{DeskmateError, DeskmateResult};
use crate::event::{Attendee, Event, EventTime, SyncState, generate_local_id};

const EVENT_COLUMNS: &str = "id, summary, description, location, \
    start_date, start_time, start_time_zone, end_date, end_time, end_time_zone, \
    remote_id, attendees, conference_link, created_at, updated_at, is_synced";

/// Calendar events, keyed by local id.
pub struct EventStore {
    conn: Connection,
}

impl EventStore {
    pub fn open<P: AsRef<Path>>(path: P) -> DeskmateResult<Self> {
        let store = Self {
            conn: open_connection(path.as_ref())?,
        };
        store.init_schema()?;
        debug!("Event store opened at {}", path.as_ref().display());
        Ok(store)
    }

    pub fn open_in_memory() -> DeskmateResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> DeskmateResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS calendar_events (
                id TEXT PRIMARY KEY,
                summary TEXT,
                description TEXT,
                location TEXT,
                start_date TEXT,
                start_time TEXT,
                start_time_zone TEXT,
                end_date TEXT,
                end_time TEXT,
                end_time_zone TEXT,
                remote_id TEXT,
                attendees TEXT,
                conference_link TEXT,
                created_at TEXT,
                updated_at TEXT,
                is_synced INTEGER DEFAULT 0
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_calendar_events_start
                ON calendar_events(start_date, start_time)",
            [],
        )?;

        Ok(())
    }

    /// Insert a new event or update the row with the same id.
    ///
    /// An empty id gets a fresh local id. Updates keep `created_at` and bump
    /// `updated_at`. Returns the id the row is stored under.
    pub fn add_or_update(&self, event: &Event) -> DeskmateResult<String> {
        let id = if event.id.is_empty() {
            generate_local_id()
        } else {
            event.id.clone()
        };

        let attendees = if event.attendees.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&event.attendees)
                    .map_err(|e| DeskmateError::Serialization(e.to_string()))?,
            )
        };

        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM calendar_events WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let now = now_timestamp();
        let remote_id = event.sync.remote_id();
        let is_synced = event.sync.is_synced();

        if existing.is_some() {
            self.conn.execute(
                "UPDATE calendar_events SET
                    summary = ?1, description = ?2, location = ?3,
                    start_date = ?4, start_time = ?5, start_time_zone = ?6,
                    end_date = ?7, end_time = ?8, end_time_zone = ?9,
                    remote_id = ?10, attendees = ?11, conference_link = ?12,
                    updated_at = ?13, is_synced = ?14
                WHERE id = ?15",
                params![
                    event.summary,
                    event.description,
                    event.location,
                    event.start.date_column(),
                    event.start.time_column(),
                    event.start.time_zone(),
                    event.end.date_column(),
                    event.end.time_column(),
                    event.end.time_zone(),
                    remote_id,
                    attendees,
                    event.conference_link,
                    now,
                    is_synced,
                    id,
                ],
            )?;
            debug!("Updated event {}", id);
        } else {
            self.conn.execute(
                &format!(
                    "INSERT INTO calendar_events ({EVENT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
                ),
                params![
                    id,
                    event.summary,
                    event.description,
                    event.location,
                    event.start.date_column(),
                    event.start.time_column(),
                    event.start.time_zone(),
                    event.end.date_column(),
                    event.end.time_column(),
                    event.end.time_zone(),
                    remote_id,
                    attendees,
                    event.conference_link,
                    now,
                    now,
                    is_synced,
                ],
            )?;
            info!("Stored new event {}", id);
        }

        Ok(id)
    }

    /// Events whose start date falls in `range`, ordered by start.
    pub fn get_all(&self, range: &DateRange) -> DeskmateResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events
             WHERE (?1 IS NULL OR start_date >= ?1)
               AND (?2 IS NULL OR start_date <= ?2)
             ORDER BY start_date, start_time"
        ))?;

        let from = range.from.map(|d| d.format("%Y-%m-%d").to_string());
        let to = range.to.map(|d| d.format("%Y-%m-%d").to_string());

        let events = stmt
            .query_map(params![from, to], row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    pub fn get_by_id(&self, id: &str) -> DeskmateResult<Option<Event>> {
        let event = self
            .conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM calendar_events WHERE id = ?1"),
                params![id],
                row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    /// The event the remote service knows as `remote_id`.
    pub fn get_by_remote_id(&self, remote_id: &str) -> DeskmateResult<Option<Event>> {
        let event = self
            .conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM calendar_events WHERE remote_id = ?1 AND is_synced = 1"),
                params![remote_id],
                row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    /// Events the remote service has not confirmed, in insertion order.
    pub fn get_unsynced(&self) -> DeskmateResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events WHERE is_synced = 0 ORDER BY rowid"
        ))?;
        let events = stmt
            .query_map([], row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// Record that the remote service knows event `id` as `remote_id`.
    ///
    /// Returns false when no row has that id.
    pub fn mark_synced(&self, id: &str, remote_id: &str) -> DeskmateResult<bool> {
        let changed = self.conn.execute(
            "UPDATE calendar_events SET remote_id = ?1, is_synced = 1 WHERE id = ?2",
            params![remote_id, id],
        )?;
        Ok(changed > 0)
    }

    /// Returns false when no row had that id.
    pub fn delete(&self, id: &str) -> DeskmateResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM calendar_events WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

fn conversion_error(idx: usize, e: DeskmateError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let id: String = row.get(0)?;

    let start_date: String = row.get(4)?;
    let start_time: Option<String> = row.get(5)?;
    let start_tz: Option<String> = row.get(6)?;
    let start = EventTime::from_columns(
        &start_date,
        start_time.as_deref().unwrap_or_default(),
        start_tz.as_deref(),
    )
    .map_err(|e| conversion_error(4, e))?;

    let end_date: String = row.get(7)?;
    let end_time: Option<String> = row.get(8)?;
    let end_tz: Option<String> = row.get(9)?;
    let end = EventTime::from_columns(
        &end_date,
        end_time.as_deref().unwrap_or_default(),
        end_tz.as_deref(),
    )
    .map_err(|e| conversion_error(7, e))?;

    let remote_id: Option<String> = row.get(10)?;
    let is_synced: bool = row.get::<_, Option<bool>>(15)?.unwrap_or(false);
    let sync = match remote_id {
        Some(remote_id) if is_synced => SyncState::Confirmed(remote_id),
        _ => SyncState::Pending,
    };

    // A damaged attendee list only loses the attendees, not the event
    let attendees_json: Option<String> = row.get(11)?;
    let attendees = match attendees_json {
        Some(json) => serde_json::from_str::<Vec<Attendee>>(&json).unwrap_or_else(|e| {
            warn!("Dropping unreadable attendees for event {}: {}", id, e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    Ok(Event {
        summary: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        location: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        start,
        end,
        attendees,
        conference_link: row.get(12)?,
        sync,
        created_at: parse_timestamp(row.get(13)?),
        updated_at: parse_timestamp(row.get(14)?),
        id,
    })
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventPayload, LOCAL_ID_PREFIX};
    use serde_json::json;

    fn event(id: &str, date: &str, summary: &str) -> Event {
        let payload: EventPayload = serde_json::from_value(json!({
            "id": id,
            "summary": summary,
            "start": {"dateTime": format!("{date}T10:00:00"), "timeZone": "UTC"},
            "end": {"dateTime": format!("{date}T11:00:00"), "timeZone": "UTC"},
        }))
        .unwrap();
        payload.into_event(generate_local_id).unwrap()
    }

    fn count_rows(store: &EventStore) -> i64 {
        store
            .conn
            .query_row("SELECT COUNT(*) FROM calendar_events", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_add_generates_local_id_when_empty() {
        let store = EventStore::open_in_memory().unwrap();
        let mut e = event("x", "2025-04-01", "Test");
        e.id = String::new();

        let id = store.add_or_update(&e).unwrap();
        assert!(id.starts_with(LOCAL_ID_PREFIX));
        assert!(store.get_by_id(&id).unwrap().is_some());
    }

    #[test]
    fn test_upsert_is_idempotent_and_keeps_created_at() {
        let store = EventStore::open_in_memory().unwrap();
        let e = event("local_1", "2025-04-01", "Test");

        store.add_or_update(&e).unwrap();
        let first = store.get_by_id("local_1").unwrap().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.add_or_update(&e).unwrap();
        let second = store.get_by_id("local_1").unwrap().unwrap();

        assert_eq!(count_rows(&store), 1);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[test]
    fn test_round_trips_fields() {
        let store = EventStore::open_in_memory().unwrap();
        let payload: EventPayload = serde_json::from_value(json!({
            "id": "abc",
            "summary": "Planning",
            "description": "Quarterly",
            "location": "Room 4",
            "start": {"date": "2025-04-03"},
            "end": {"date": "2025-04-04"},
            "attendees": [{"email": "a@example.com", "responseStatus": "accepted"}],
            "hangoutLink": "https://meet.google.com/xyz"
        }))
        .unwrap();
        let e = Event::from_remote(payload.into_event(generate_local_id).unwrap());

        store.add_or_update(&e).unwrap();
        let stored = store.get_by_id("abc").unwrap().unwrap();

        assert_eq!(stored.summary, "Planning");
        assert_eq!(stored.start, e.start);
        assert_eq!(stored.attendees, e.attendees);
        assert_eq!(stored.conference_link.as_deref(), Some("https://meet.google.com/xyz"));
        assert_eq!(stored.sync, SyncState::Confirmed("abc".into()));
    }

    #[test]
    fn test_get_all_filters_inclusive_range_and_orders() {
        let store = EventStore::open_in_memory().unwrap();
        store.add_or_update(&event("a", "2025-04-30", "Last day")).unwrap();
        store.add_or_update(&event("b", "2025-03-31", "Before")).unwrap();
        store.add_or_update(&event("c", "2025-04-01", "First day")).unwrap();
        store.add_or_update(&event("d", "2025-05-01", "After")).unwrap();

        let range = DateRange::from_args(Some("2025-04-01"), Some("2025-04-30")).unwrap();
        let ids: Vec<_> = store
            .get_all(&range)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["c", "a"]);

        assert_eq!(store.get_all(&DateRange::default()).unwrap().len(), 4);
    }

    #[test]
    fn test_get_all_orders_same_day_by_start_time() {
        let store = EventStore::open_in_memory().unwrap();
        let timed = |id: &str, start: &str, end: &str| -> Event {
            let payload: EventPayload = serde_json::from_value(json!({
                "id": id,
                "start": {"dateTime": format!("2025-04-10T{start}"), "timeZone": "UTC"},
                "end": {"dateTime": format!("2025-04-10T{end}"), "timeZone": "UTC"},
            }))
            .unwrap();
            payload.into_event(generate_local_id).unwrap()
        };
        store.add_or_update(&timed("late", "16:00:00", "17:00:00")).unwrap();
        store.add_or_update(&timed("early", "08:30:00", "09:00:00")).unwrap();
        store.add_or_update(&timed("noon", "12:00:00", "13:00:00")).unwrap();

        let range = DateRange::from_args(Some("2025-04-10"), Some("2025-04-10")).unwrap();
        let ids: Vec<_> = store
            .get_all(&range)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["early", "noon", "late"]);
    }

    #[test]
    fn test_unsynced_and_mark_synced() {
        let store = EventStore::open_in_memory().unwrap();
        store.add_or_update(&event("local_1", "2025-04-01", "One")).unwrap();
        store.add_or_update(&event("local_2", "2025-04-02", "Two")).unwrap();

        assert_eq!(store.get_unsynced().unwrap().len(), 2);

        assert!(store.mark_synced("local_1", "g-1").unwrap());
        assert!(store.mark_synced("local_1", "g-1").unwrap());
        assert!(!store.mark_synced("missing", "g-2").unwrap());

        let unsynced = store.get_unsynced().unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].id, "local_2");

        let synced = store.get_by_id("local_1").unwrap().unwrap();
        assert_eq!(synced.sync, SyncState::Confirmed("g-1".into()));

        let by_remote = store.get_by_remote_id("g-1").unwrap().unwrap();
        assert_eq!(by_remote.id, "local_1");
        assert!(store.get_by_remote_id("local_2").unwrap().is_none());
    }

    #[test]
    fn test_sync_marker_matches_remote_id() {
        let store = EventStore::open_in_memory().unwrap();
        store.add_or_update(&event("local_1", "2025-04-01", "Local")).unwrap();
        store
            .add_or_update(&Event::from_remote(event("g-9", "2025-04-01", "Remote")))
            .unwrap();

        let rows: Vec<(Option<String>, bool)> = store
            .conn
            .prepare("SELECT remote_id, is_synced FROM calendar_events")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for (remote_id, is_synced) in rows {
            let confirmed = remote_id.is_some_and(|id| !id.starts_with(LOCAL_ID_PREFIX));
            assert_eq!(is_synced, confirmed);
        }
    }

    #[test]
    fn test_bad_attendees_json_is_dropped() {
        let store = EventStore::open_in_memory().unwrap();
        store.add_or_update(&event("e1", "2025-04-01", "Meeting")).unwrap();
        store
            .conn
            .execute("UPDATE calendar_events SET attendees = '{not json' WHERE id = 'e1'", [])
            .unwrap();

        let stored = store.get_by_id("e1").unwrap().unwrap();
        assert!(stored.attendees.is_empty());
        assert_eq!(stored.summary, "Meeting");
    }

    #[test]
    fn test_delete() {
        let store = EventStore::open_in_memory().unwrap();
        store.add_or_update(&event("e1", "2025-04-01", "Meeting")).unwrap();
        assert!(store.delete("e1").unwrap());
        assert!(!store.delete("e1").unwrap());
        assert!(store.get_by_id("e1").unwrap().is_none());
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("calendar_events.db");
        let store = EventStore::open(&path).unwrap();
        store.add_or_update(&event("e1", "2025-04-01", "Meeting")).unwrap();
        assert!(path.exists());
    }
}
