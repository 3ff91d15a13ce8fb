//! Outbound HTTP with a per-request timeout and bounded retry.
//!
//! 429 responses and transport failures are retried with exponential
//! backoff (`base_delay * 2^attempt`); any other non-success status is
//! returned immediately as [`DeskmateError::Api`].

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{DeskmateError, DeskmateResult};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts including the first one
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles each time
    pub base_delay: Duration,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// How long to wait after failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryConfig,
}

impl HttpClient {
    pub fn new() -> DeskmateResult<Self> {
        Self::with_retry(RetryConfig::default())
    }

    pub fn with_retry(retry: RetryConfig) -> DeskmateResult<Self> {
        let client = Client::builder()
            .timeout(retry.timeout)
            .user_agent(concat!("deskmate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeskmateError::Http(e.to_string()))?;
        Ok(HttpClient { client, retry })
    }

    /// Send the request produced by `build`, rebuilding it for each attempt.
    pub async fn send<F>(&self, build: F) -> DeskmateResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut last_error = DeskmateError::RateLimited(0);

        for attempt in 0..self.retry.max_attempts {
            match build(&self.client).send().await {
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    warn!(
                        "Rate limited by {} (attempt {}/{})",
                        resp.url(),
                        attempt + 1,
                        self.retry.max_attempts
                    );
                    last_error = DeskmateError::RateLimited(attempt + 1);
                }
                Ok(resp) => return check_response(resp).await,
                Err(e) => {
                    warn!(
                        "Request error (attempt {}/{}): {}",
                        attempt + 1,
                        self.retry.max_attempts,
                        e
                    );
                    last_error = DeskmateError::Http(e.to_string());
                }
            }

            if attempt + 1 < self.retry.max_attempts {
                let delay = self.retry.delay_for(attempt);
                debug!("Retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error)
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> DeskmateResult<T> {
        let resp = self.send(|client| client.get(url).query(query)).await?;
        decode_json(resp).await
    }
}

pub async fn decode_json<T: DeserializeOwned>(resp: Response) -> DeskmateResult<T> {
    resp.json::<T>()
        .await
        .map_err(|e| DeskmateError::Serialization(e.to_string()))
}

/// Pass successful responses through; turn anything else into [`DeskmateError::Api`].
pub async fn check_response(resp: Response) -> DeskmateResult<Response> {
    let status = resp.status();
    if !status.is_success() {
        return Err(DeskmateError::Api {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// A throwaway HTTP server answering each connection with the next canned response.
#[cfg(test)]
pub(crate) mod test_server {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    pub fn status(code: u16, reason: &str) -> String {
        format!("HTTP/1.1 {code} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
    }

    pub fn json(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    /// Returns the base url and a counter of requests served.
    pub async fn serve(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), hits)
    }
}

#[cfg(test)]
mod tests {
    use super::test_server::{json, serve, status};
    use super::*;
    use std::sync::atomic::Ordering;

    fn fast_client() -> HttpClient {
        HttpClient::with_retry(RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[derive(Debug, serde::Deserialize)]
    struct Ping {
        ok: bool,
    }

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(0), Duration::from_secs(1));
        assert_eq!(retry.delay_for(1), Duration::from_secs(2));
        assert_eq!(retry.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let (url, hits) = serve(vec![
            status(429, "Too Many Requests"),
            status(429, "Too Many Requests"),
            json(r#"{"ok":true}"#),
        ])
        .await;

        let body: Ping = fast_client().get_json(&url, &[("q", "rust")]).await.unwrap();
        assert!(body.ok);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (url, hits) = serve(vec![status(429, "Too Many Requests"); 3]).await;

        let err = fast_client().get_json::<Ping>(&url, &[]).await.unwrap_err();
        assert!(matches!(err, DeskmateError::RateLimited(3)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let (url, hits) = serve(vec![status(500, "Internal Server Error")]).await;

        let err = fast_client().get_json::<Ping>(&url, &[]).await.unwrap_err();
        assert!(matches!(err, DeskmateError::Api { status: 500, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
