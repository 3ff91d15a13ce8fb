//! Google Calendar v3 REST calls.

use anyhow::{Context, Result};
use deskmate_core::DeskmateError;
use deskmate_core::event::{Event, EventPayload, RemoteEventBody};
use deskmate_core::http::{HttpClient, decode_json};
use deskmate_core::remote::protocol::ListEvents;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::token::Token;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
    #[serde(default)]
    items: Vec<EventPayload>,
    #[serde(default)]
    next_page_token: Option<String>,
}

pub struct GoogleCalendar {
    http: HttpClient,
    token: Token,
    base_url: String,
}

impl GoogleCalendar {
    pub fn new(http: HttpClient, token: Token) -> Self {
        GoogleCalendar {
            http,
            token,
            base_url: CALENDAR_API_BASE.to_string(),
        }
    }

    /// `{base}/calendars/{calendar_id}/events[/{event_id}]`, with ids percent-encoded.
    fn events_url(&self, calendar_id: &str, event_id: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.base_url))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("API base URL cannot carry a path"))?;
            segments.pop_if_empty().extend(["calendars", calendar_id, "events"]);
            if let Some(event_id) = event_id {
                segments.push(event_id);
            }
        }
        Ok(url)
    }

    /// Follows `nextPageToken` until the window is exhausted or `max_results`
    /// items have been read.
    pub async fn list_events(&self, params: &ListEvents) -> Result<Vec<Event>> {
        let url = self.events_url(&params.calendar_id, None)?;
        let max_results = params.max_results.to_string();
        let single_events = params.single_events.to_string();

        let mut query = vec![
            ("timeMin", params.time_min.as_str()),
            ("timeMax", params.time_max.as_str()),
            ("maxResults", max_results.as_str()),
            ("singleEvents", single_events.as_str()),
            ("orderBy", params.order_by.as_str()),
        ];
        if let Some(fields) = params.fields.as_deref() {
            query.push(("fields", fields));
        }

        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(&url, &query, page_token.as_deref()).await?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) if items.len() < params.max_results as usize => {
                    page_token = Some(token);
                }
                _ => break,
            }
        }
        items.truncate(params.max_results as usize);

        debug!("Fetched {} events from {}", items.len(), params.calendar_id);
        Ok(events_from_items(items))
    }

    async fn fetch_page(
        &self,
        url: &Url,
        query: &[(&str, &str)],
        page_token: Option<&str>,
    ) -> Result<EventList> {
        let resp = self
            .http
            .send(|client| {
                let request = client
                    .get(url.clone())
                    .bearer_auth(&self.token.access_token)
                    .query(query);
                match page_token {
                    Some(token) => request.query(&[("pageToken", token)]),
                    None => request,
                }
            })
            .await
            .context("Failed to list events")?;

        Ok(decode_json(resp).await?)
    }

    pub async fn insert_event(&self, calendar_id: &str, body: &RemoteEventBody) -> Result<Event> {
        let url = self.events_url(calendar_id, None)?;

        let resp = self
            .http
            .send(|client| {
                client
                    .post(url.clone())
                    .bearer_auth(&self.token.access_token)
                    .json(body)
            })
            .await
            .context("Failed to create event")?;

        to_event(decode_json(resp).await?)
    }

    /// PATCH rather than PUT so attendees and conference data set elsewhere survive.
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        body: &RemoteEventBody,
    ) -> Result<Event> {
        let url = self.events_url(calendar_id, Some(event_id))?;

        let resp = self
            .http
            .send(|client| {
                client
                    .patch(url.clone())
                    .bearer_auth(&self.token.access_token)
                    .json(body)
            })
            .await
            .with_context(|| format!("Failed to update event: {}", event_id))?;

        to_event(decode_json(resp).await?)
    }

    /// Deleting an event that is already gone counts as success.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()> {
        let url = self.events_url(calendar_id, Some(event_id))?;

        let result = self
            .http
            .send(|client| {
                client
                    .delete(url.clone())
                    .bearer_auth(&self.token.access_token)
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(DeskmateError::Api { status: 410, .. }) => {
                debug!("Event {} already deleted", event_id);
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete event: {}", event_id)),
        }
    }
}

fn to_event(payload: EventPayload) -> Result<Event> {
    payload
        .into_event(String::new)
        .context("Calendar API returned an unusable event")
}

/// Items that cannot be read as events (cancelled instances have no start) are skipped.
fn events_from_items(items: Vec<EventPayload>) -> Vec<Event> {
    items
        .into_iter()
        .filter_map(|item| {
            let id = item.id.clone().unwrap_or_default();
            match item.into_event(String::new) {
                Ok(event) if !event.id.is_empty() => Some(event),
                Ok(_) => {
                    warn!("Skipping event without an id");
                    None
                }
                Err(e) => {
                    warn!("Skipping event {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}
