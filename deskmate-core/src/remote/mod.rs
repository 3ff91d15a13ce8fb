//! Remote calendar service access.

pub mod protocol;
pub mod provider;

use std::future::Future;

use crate::date_range::DateRange;
use crate::error::DeskmateResult;
use crate::event::{Event, RemoteEventBody};
use crate::remote::protocol::{CreateEvent, DeleteEvent, ListEvents, UpdateEvent};
use crate::remote::provider::Provider;

/// Most events fetched for one window (the Calendar API's page ceiling).
pub const MAX_LIST_RESULTS: u32 = 2500;

/// Partial-response projection for listed events. Keeps the page token so
/// providers can follow it.
pub const LIST_FIELDS: &str = "nextPageToken,\
    items(id,summary,description,location,start,end,attendees,hangoutLink,conferenceData)";

/// The operations the reconciler needs from a remote calendar.
pub trait RemoteCalendar {
    /// Events starting in `range`, as the service knows them.
    fn list_events(&self, range: &DateRange) -> impl Future<Output = DeskmateResult<Vec<Event>>>;

    fn insert_event(&self, body: RemoteEventBody) -> impl Future<Output = DeskmateResult<Event>>;

    fn update_event(
        &self,
        remote_id: &str,
        body: RemoteEventBody,
    ) -> impl Future<Output = DeskmateResult<Event>>;

    fn delete_event(&self, remote_id: &str) -> impl Future<Output = DeskmateResult<()>>;
}

/// A calendar reached through a provider binary.
#[derive(Debug, Clone)]
pub struct Remote {
    pub provider: Provider,
    pub calendar_id: String,
}

impl Remote {
    pub fn new(provider: Provider, calendar_id: &str) -> Self {
        Remote {
            provider,
            calendar_id: calendar_id.to_string(),
        }
    }

    /// A remote for `provider_name`, or None when its binary isn't installed.
    pub fn available(provider_name: &str, calendar_id: &str) -> Option<Self> {
        let provider = Provider::from_name(provider_name);
        provider
            .is_installed()
            .then(|| Remote::new(provider, calendar_id))
    }

    fn list_request(&self, range: &DateRange) -> ListEvents {
        ListEvents {
            calendar_id: self.calendar_id.clone(),
            time_min: range.time_min(),
            time_max: range.time_max(),
            max_results: MAX_LIST_RESULTS,
            single_events: true,
            order_by: "startTime".to_string(),
            fields: Some(LIST_FIELDS.to_string()),
        }
    }
}

impl RemoteCalendar for Remote {
    async fn list_events(&self, range: &DateRange) -> DeskmateResult<Vec<Event>> {
        self.provider.call(self.list_request(range)).await
    }

    async fn insert_event(&self, body: RemoteEventBody) -> DeskmateResult<Event> {
        self.provider
            .call(CreateEvent {
                calendar_id: self.calendar_id.clone(),
                event: body,
            })
            .await
    }

    async fn update_event(&self, remote_id: &str, body: RemoteEventBody) -> DeskmateResult<Event> {
        self.provider
            .call(UpdateEvent {
                calendar_id: self.calendar_id.clone(),
                event_id: remote_id.to_string(),
                event: body,
            })
            .await
    }

    async fn delete_event(&self, remote_id: &str) -> DeskmateResult<()> {
        self.provider
            .call(DeleteEvent {
                calendar_id: self.calendar_id.clone(),
                event_id: remote_id.to_string(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_request_covers_whole_window() {
        let remote = Remote::new(Provider::from_name("google"), "primary");
        let range = DateRange::from_args(Some("2025-04-01"), Some("2025-04-30")).unwrap();

        let request = remote.list_request(&range);
        assert_eq!(request.max_results, 2500);
        assert!(request.single_events);
        assert_eq!(request.order_by, "startTime");

        let fields = request.fields.unwrap();
        assert!(fields.starts_with("nextPageToken,items("));
        for field in ["hangoutLink", "conferenceData", "attendees", "start", "end"] {
            assert!(fields.contains(field), "missing {field}");
        }
    }
}
