//! Calendar event types.
//!
//! Events travel in the Google Calendar JSON shape (`start.date` or
//! `start.dateTime` + `start.timeZone`, `hangoutLink`, `conferenceData`),
//! which is what the CLI accepts, what it prints, and what providers return.
//! Internally the start/end values are an [`EventTime`] and sync status is an
//! explicit [`SyncState`].

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DeskmateError, DeskmateResult};

/// Prefix for ids generated locally, before the remote service has seen the event.
pub const LOCAL_ID_PREFIX: &str = "local_";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const DEFAULT_TIME_ZONE: &str = "UTC";

/// Generate a fresh local event id (`local_<uuid>`).
pub fn generate_local_id() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4().simple())
}

/// A calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    /// Video call URL
    #[serde(
        rename = "hangoutLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub conference_link: Option<String>,

    // Local bookkeeping, never exchanged with the remote service
    #[serde(skip)]
    pub sync: SyncState,
    #[serde(skip)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Adopt an event fetched from the remote service. Its id is the remote id.
    pub fn from_remote(mut event: Event) -> Self {
        event.sync = SyncState::Confirmed(event.id.clone());
        event
    }

    /// The id the remote service knows this event by, falling back to the local id.
    ///
    /// Used to match local rows against remote events when merging.
    pub fn identity(&self) -> &str {
        self.sync.remote_id().unwrap_or(&self.id)
    }

    pub fn is_synced(&self) -> bool {
        self.sync.is_synced()
    }

    /// Fields sent to the remote service on create/update.
    pub fn remote_body(&self) -> RemoteEventBody {
        RemoteEventBody {
            summary: self.summary.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }

    /// Check that `end` is not before `start`.
    pub fn validate(&self) -> DeskmateResult<()> {
        if self.end.to_utc() < self.start.to_utc() {
            return Err(DeskmateError::InvalidEvent(format!(
                "event '{}' ends before it starts",
                self.id
            )));
        }
        Ok(())
    }
}

/// Whether the remote service has confirmed this event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncState {
    /// Only known locally
    #[default]
    Pending,
    /// Known to the remote service under this id
    Confirmed(String),
}

impl SyncState {
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            SyncState::Pending => None,
            SyncState::Confirmed(id) => Some(id),
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SyncState::Confirmed(_))
    }
}

/// The subset of an event sent to the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEventBody {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: EventTime,
    pub end: EventTime,
}

/// An event participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// "accepted", "declined", "tentative", "needsAction"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub organizer: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    #[serde(default)]
    pub entry_point_type: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// Start or end of an event: either a whole day or a wall-clock time in a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EventDateTime", into = "EventDateTime")]
pub enum EventTime {
    Date(NaiveDate),
    DateTime {
        datetime: NaiveDateTime,
        time_zone: String,
    },
}

impl EventTime {
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::Date(d) => *d,
            EventTime::DateTime { datetime, .. } => datetime.date(),
        }
    }

    pub fn time(&self) -> Option<NaiveTime> {
        match self {
            EventTime::Date(_) => None,
            EventTime::DateTime { datetime, .. } => Some(datetime.time()),
        }
    }

    pub fn time_zone(&self) -> Option<&str> {
        match self {
            EventTime::Date(_) => None,
            EventTime::DateTime { time_zone, .. } => Some(time_zone),
        }
    }

    /// The instant this value represents. Whole days start at UTC midnight.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => d.and_time(NaiveTime::MIN).and_utc(),
            EventTime::DateTime {
                datetime,
                time_zone,
            } => match Tz::from_str(time_zone) {
                Ok(tz) => tz
                    .from_local_datetime(datetime)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|| datetime.and_utc()),
                Err(_) => datetime.and_utc(),
            },
        }
    }

    /// Stored date column (`YYYY-MM-DD`).
    pub fn date_column(&self) -> String {
        self.date().format(DATE_FORMAT).to_string()
    }

    /// Stored time column (`HH:MM:SS`), empty for whole-day values.
    pub fn time_column(&self) -> String {
        self.time()
            .map(|t| t.format(TIME_FORMAT).to_string())
            .unwrap_or_default()
    }

    /// Rebuild from stored columns. An empty `time` means a whole day.
    pub fn from_columns(date: &str, time: &str, time_zone: Option<&str>) -> DeskmateResult<Self> {
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|e| DeskmateError::InvalidEvent(format!("bad stored date '{date}': {e}")))?;

        if time.is_empty() {
            return Ok(EventTime::Date(date));
        }

        let time = NaiveTime::parse_from_str(time, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
            .map_err(|e| DeskmateError::InvalidEvent(format!("bad stored time '{time}': {e}")))?;

        Ok(EventTime::DateTime {
            datetime: date.and_time(time),
            time_zone: time_zone.unwrap_or(DEFAULT_TIME_ZONE).to_string(),
        })
    }
}

/// Wire form of [`EventTime`], as used by the Google Calendar API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl TryFrom<EventDateTime> for EventTime {
    type Error = DeskmateError;

    fn try_from(value: EventDateTime) -> Result<Self, Self::Error> {
        let tz = match value.time_zone.as_deref().filter(|s| !s.is_empty()) {
            Some(name) => Some(
                Tz::from_str(name)
                    .map_err(|_| DeskmateError::InvalidEvent(format!("unknown time zone '{name}'")))?,
            ),
            None => None,
        };

        match (value.date, value.date_time) {
            (Some(_), Some(_)) => Err(DeskmateError::InvalidEvent(
                "both 'date' and 'dateTime' given".into(),
            )),
            (None, None) => Err(DeskmateError::InvalidEvent(
                "one of 'date' or 'dateTime' is required".into(),
            )),
            (Some(date), None) => NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .map(EventTime::Date)
                .map_err(|e| DeskmateError::InvalidEvent(format!("bad date '{date}': {e}"))),
            (None, Some(date_time)) => parse_date_time(&date_time, tz),
        }
    }
}

impl From<EventTime> for EventDateTime {
    fn from(value: EventTime) -> Self {
        match value {
            EventTime::Date(d) => EventDateTime {
                date: Some(d.format(DATE_FORMAT).to_string()),
                ..Default::default()
            },
            EventTime::DateTime {
                datetime,
                time_zone,
            } => EventDateTime {
                date: None,
                date_time: Some(datetime.format("%Y-%m-%dT%H:%M:%S").to_string()),
                time_zone: Some(time_zone),
            },
        }
    }
}

/// Parse a `dateTime` value.
///
/// Values with an offset are converted into `tz` when given, otherwise into
/// UTC. Values without an offset are wall-clock times in `tz` (default UTC).
fn parse_date_time(s: &str, tz: Option<Tz>) -> DeskmateResult<EventTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(match tz {
            Some(tz) => EventTime::DateTime {
                datetime: dt.with_timezone(&tz).naive_local(),
                time_zone: tz.name().to_string(),
            },
            None => EventTime::DateTime {
                datetime: dt.with_timezone(&Utc).naive_utc(),
                time_zone: DEFAULT_TIME_ZONE.to_string(),
            },
        });
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| DeskmateError::InvalidEvent(format!("bad dateTime '{s}': {e}")))?;

    Ok(EventTime::DateTime {
        datetime: naive,
        time_zone: tz
            .map(|tz| tz.name().to_string())
            .unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string()),
    })
}

/// An event as submitted by a caller or returned by the Google API.
///
/// Everything is optional here; [`EventPayload::into_event`] decides what is
/// required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub attendees: Option<Vec<Attendee>>,
    pub hangout_link: Option<String>,
    pub conference_data: Option<ConferenceData>,
}

impl EventPayload {
    /// `hangoutLink` if set, else the first entry point with a non-empty URI.
    pub fn conference_link(&self) -> Option<String> {
        if let Some(link) = self.hangout_link.as_ref().filter(|l| !l.is_empty()) {
            return Some(link.clone());
        }

        self.conference_data.as_ref().and_then(|cd| {
            cd.entry_points
                .iter()
                .filter_map(|ep| ep.uri.as_ref())
                .find(|uri| !uri.is_empty())
                .cloned()
        })
    }

    /// Build an event, using the payload's own id when present and `fallback_id` otherwise.
    pub fn into_event(self, fallback_id: impl FnOnce() -> String) -> DeskmateResult<Event> {
        let conference_link = self.conference_link();

        let start = self
            .start
            .ok_or_else(|| DeskmateError::InvalidEvent("missing 'start'".into()))?;
        let end = self
            .end
            .ok_or_else(|| DeskmateError::InvalidEvent("missing 'end'".into()))?;

        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(fallback_id);

        let event = Event {
            id,
            summary: self.summary.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            start,
            end,
            attendees: self.attendees.unwrap_or_default(),
            conference_link,
            sync: SyncState::Pending,
            created_at: None,
            updated_at: None,
        };

        event.validate()?;
        Ok(event)
    }
}
