use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ContentResults, MAX_FALLBACK_RESULTS, search_url};
use crate::error::DeskmateResult;
use crate::http::HttpClient;

pub const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

// YouTube Data API v3 search response (only the parts we read)

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl From<SearchResponse> for Vec<Video> {
    fn from(resp: SearchResponse) -> Self {
        resp.items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(Video {
                    title: item.snippet.title,
                    description: item.snippet.description,
                    url: format!("https://www.youtube.com/watch?v={video_id}"),
                    thumbnail: item
                        .snippet
                        .thumbnails
                        .and_then(|t| t.medium)
                        .map(|t| t.url),
                })
            })
            .collect()
    }
}

pub struct VideoSearch {
    http: HttpClient,
    api_key: Option<String>,
    endpoint: String,
}

impl VideoSearch {
    pub fn new(http: HttpClient, api_key: Option<String>) -> Self {
        VideoSearch {
            http,
            api_key: api_key.filter(|k| !k.is_empty()),
            endpoint: YOUTUBE_SEARCH_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Search YouTube, falling back to placeholder videos on any failure.
    pub async fn search(&self, query: &str, max_results: usize) -> ContentResults<Video> {
        let Some(api_key) = &self.api_key else {
            info!("No YouTube API key configured, using placeholder videos");
            return ContentResults::placeholder(query, fallback_videos(query, max_results));
        };

        match self.fetch(api_key, query, max_results).await {
            Ok(videos) => ContentResults::live(query, videos),
            Err(e) => {
                warn!("Video search failed, using placeholder videos: {}", e);
                ContentResults::placeholder(query, fallback_videos(query, max_results))
            }
        }
    }

    async fn fetch(&self, api_key: &str, query: &str, max_results: usize) -> DeskmateResult<Vec<Video>> {
        let max_results = max_results.to_string();
        let resp: SearchResponse = self
            .http
            .get_json(
                &self.endpoint,
                &[
                    ("part", "snippet"),
                    ("q", query),
                    ("type", "video"),
                    ("maxResults", max_results.as_str()),
                    ("key", api_key),
                    ("relevanceLanguage", "en"),
                    ("videoDuration", "medium"),
                ],
            )
            .await?;
        Ok(resp.into())
    }
}

/// Up to three placeholder videos pointing at a YouTube search for `query`.
pub fn fallback_videos(query: &str, max_results: usize) -> Vec<Video> {
    let titles = [
        format!("The Ultimate Guide to {query}"),
        format!("{query} Explained in 5 Minutes"),
        format!("The Future of {query}: Expert Analysis"),
    ];
    let url = search_url("https://www.youtube.com/results", "search_query", query);

    titles
        .into_iter()
        .take(max_results.min(MAX_FALLBACK_RESULTS))
        .map(|title| Video {
            title,
            description: format!("A comprehensive video about {query}. Click to watch on YouTube."),
            url: url.clone(),
            thumbnail: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryConfig;
    use crate::http::test_server::{json, serve, status};
    use std::time::Duration;

    fn http() -> HttpClient {
        HttpClient::with_retry(RetryConfig {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_parse_search_response() {
        let resp: SearchResponse = serde_json::from_str(
            r#"{"items": [
                {"id": {"kind": "youtube#video", "videoId": "abc123"},
                 "snippet": {"title": "Rust in 100 Seconds", "description": "Fast intro",
                             "thumbnails": {"medium": {"url": "https://i.ytimg.com/vi/abc123/mqdefault.jpg"}}}},
                {"id": {"kind": "youtube#channel", "channelId": "UCxyz"},
                 "snippet": {"title": "A channel", "description": ""}}
            ]}"#,
        )
        .unwrap();

        let videos: Vec<Video> = resp.into();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(
            videos[0].thumbnail.as_deref(),
            Some("https://i.ytimg.com/vi/abc123/mqdefault.jpg")
        );
    }

    #[test]
    fn test_fallback_is_deterministic_and_capped() {
        let videos = fallback_videos("machine learning", 10);
        assert_eq!(videos.len(), 3);
        assert_eq!(videos[0].title, "The Ultimate Guide to machine learning");
        assert_eq!(
            videos[0].url,
            "https://www.youtube.com/results?search_query=machine+learning"
        );
        assert_eq!(videos, fallback_videos("machine learning", 10));
        assert_eq!(fallback_videos("rust", 2).len(), 2);
    }

    #[tokio::test]
    async fn test_missing_key_uses_fallback() {
        let results = VideoSearch::new(http(), None).search("rust", 3).await;
        assert!(results.fallback);
        assert_eq!(results.results.len(), 3);
    }

    #[tokio::test]
    async fn test_live_search() {
        let (url, _) = serve(vec![json(
            r#"{"items":[{"id":{"videoId":"v1"},"snippet":{"title":"Live","description":"d"}}]}"#,
        )])
        .await;

        let results = VideoSearch::new(http(), Some("key".into()))
            .with_endpoint(&url)
            .search("rust", 3)
            .await;
        assert!(!results.fallback);
        assert_eq!(results.results[0].title, "Live");
    }

    #[tokio::test]
    async fn test_failed_search_uses_fallback() {
        let (url, _) = serve(vec![status(403, "Forbidden")]).await;

        let results = VideoSearch::new(http(), Some("bad-key".into()))
            .with_endpoint(&url)
            .search("rust", 1)
            .await;
        assert!(results.fallback);
        assert_eq!(results.results.len(), 1);
        assert_eq!(results.query, "rust");
    }
}
