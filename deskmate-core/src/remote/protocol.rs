//! JSON protocol spoken between deskmate and calendar provider binaries
//! over stdin/stdout.
//!
//! One request line in (`{"command": ..., "params": {...}}`), one response
//! line out (`{"status": "success", "data": ...}` or
//! `{"status": "error", "error": "..."}`).

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::event::{Event, RemoteEventBody};

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListEvents,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
}

/// Request sent from deskmate to a provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from a provider to deskmate.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

impl<T: Serialize> Response<T> {
    pub fn success(data: T) -> String {
        serde_json::to_string(&Response::Success { data })
            .unwrap_or_else(|e| Response::error(&format!("Failed to encode response: {e}")))
    }
}

impl Response<()> {
    pub fn error(msg: &str) -> String {
        serde_json::json!({ "status": "error", "error": msg }).to_string()
    }
}

/// List events within a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEvents {
    pub calendar_id: String,
    /// RFC3339
    pub time_min: String,
    /// RFC3339
    pub time_max: String,
    pub max_results: u32,
    /// Expand recurring events into instances
    pub single_events: bool,
    pub order_by: String,
    /// Partial-response field selector, passed through to the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
}

impl ProviderCommand for ListEvents {
    type Response = Vec<Event>;
    fn command() -> Command {
        Command::ListEvents
    }
}

/// Create a new event. Returns the event as the service stored it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEvent {
    pub calendar_id: String,
    pub event: RemoteEventBody,
}

impl ProviderCommand for CreateEvent {
    type Response = Event;
    fn command() -> Command {
        Command::CreateEvent
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub calendar_id: String,
    pub event_id: String,
    pub event: RemoteEventBody,
}

impl ProviderCommand for UpdateEvent {
    type Response = Event;
    fn command() -> Command {
        Command::UpdateEvent
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteEvent {
    pub calendar_id: String,
    pub event_id: String,
}

impl ProviderCommand for DeleteEvent {
    type Response = ();
    fn command() -> Command {
        Command::DeleteEvent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let params = serde_json::to_value(DeleteEvent {
            calendar_id: "primary".into(),
            event_id: "abc".into(),
        })
        .unwrap();
        let request = Request {
            command: DeleteEvent::command(),
            params,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "command": "delete_event",
                "params": {"calendar_id": "primary", "event_id": "abc"}
            })
        );
    }

    #[test]
    fn test_response_round_trip() {
        let ok: Response<Vec<u32>> = serde_json::from_str(&Response::success(vec![1, 2])).unwrap();
        assert!(matches!(ok, Response::Success { data } if data == vec![1, 2]));

        let err: Response<()> = serde_json::from_str(&Response::error("boom")).unwrap();
        assert!(matches!(err, Response::Error { error } if error == "boom"));

        let unit: Response<()> = serde_json::from_str(r#"{"status":"success","data":null}"#).unwrap();
        assert!(matches!(unit, Response::Success { .. }));
    }
}
