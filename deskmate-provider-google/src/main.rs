//! deskmate-provider-google - Google Calendar provider for deskmate
//!
//! This binary implements the deskmate provider protocol, communicating
//! with deskmate via JSON over stdin/stdout. Logs go to stderr.
//!
//! The access token is read from $DESKMATE_GOOGLE_ACCESS_TOKEN or
//!   ~/.config/deskmate/providers/google/token.json

mod google;
mod token;

use std::io::{self, BufRead, Write};

use anyhow::Result;
use deskmate_core::http::HttpClient;
use deskmate_core::remote::protocol::{
    Command, CreateEvent, DeleteEvent, ListEvents, Request, Response, UpdateEvent,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::google::GoogleCalendar;

#[tokio::main]
async fn main() {
    init_tracing();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(request).await,
            Err(e) => Response::error(&format!("Failed to parse request: {}", e)),
        };

        if let Err(e) = writeln!(stdout, "{}", response).and_then(|_| stdout.flush()) {
            error!("Failed to write response: {}", e);
            break;
        }
    }
}

async fn handle_request(request: Request) -> String {
    debug!("Handling {:?}", request.command);

    let calendar = match connect() {
        Ok(calendar) => calendar,
        Err(e) => return Response::error(&format!("{:#}", e)),
    };

    match request.command {
        Command::ListEvents => {
            respond(&request.params, |p: ListEvents| async move {
                calendar.list_events(&p).await
            })
            .await
        }
        Command::CreateEvent => {
            respond(&request.params, |p: CreateEvent| async move {
                calendar.insert_event(&p.calendar_id, &p.event).await
            })
            .await
        }
        Command::UpdateEvent => {
            respond(&request.params, |p: UpdateEvent| async move {
                calendar
                    .update_event(&p.calendar_id, &p.event_id, &p.event)
                    .await
            })
            .await
        }
        Command::DeleteEvent => {
            respond(&request.params, |p: DeleteEvent| async move {
                calendar.delete_event(&p.calendar_id, &p.event_id).await
            })
            .await
        }
    }
}

/// Decode `params`, run `handler` and encode its outcome as a response line.
async fn respond<P, T, F, Fut>(params: &serde_json::Value, handler: F) -> String
where
    P: DeserializeOwned,
    T: Serialize,
    F: FnOnce(P) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let params: P = match serde_json::from_value(params.clone()) {
        Ok(p) => p,
        Err(e) => return Response::error(&format!("Invalid params: {}", e)),
    };

    match handler(params).await {
        Ok(data) => Response::success(data),
        Err(e) => Response::error(&format!("{:#}", e)),
    }
}

fn connect() -> Result<GoogleCalendar> {
    let token = token::load()?;
    let http = HttpClient::new()?;
    Ok(GoogleCalendar::new(http, token))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("DESKMATE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
