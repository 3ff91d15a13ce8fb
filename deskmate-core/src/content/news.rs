use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ContentResults, MAX_FALLBACK_RESULTS, search_url};
use crate::error::DeskmateResult;
use crate::http::HttpClient;

pub const NEWSDATA_URL: &str = "https://newsdata.io/api/1/news";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub description: String,
    pub source: String,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: Option<String>,
    link: Option<String>,
    url: Option<String>,
    description: Option<String>,
    source_id: Option<String>,
}

impl RawArticle {
    /// Articles without a title or link are dropped.
    fn into_article(self) -> Option<NewsArticle> {
        let title = self.title.filter(|t| !t.is_empty())?;
        let url = self.link.or(self.url).filter(|u| !u.is_empty())?;
        Some(NewsArticle {
            title,
            url,
            description: self.description.unwrap_or_default(),
            source: self.source_id.unwrap_or_default(),
        })
    }
}

pub struct NewsSearch {
    http: HttpClient,
    api_key: Option<String>,
    endpoint: String,
}

impl NewsSearch {
    pub fn new(http: HttpClient, api_key: Option<String>) -> Self {
        NewsSearch {
            http,
            api_key: api_key.filter(|k| !k.is_empty()),
            endpoint: NEWSDATA_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Search NewsData.io, falling back to placeholder articles on any failure.
    pub async fn search(&self, query: &str, max_results: usize) -> ContentResults<NewsArticle> {
        let Some(api_key) = &self.api_key else {
            info!("No news API key configured, using placeholder articles");
            return ContentResults::placeholder(query, fallback_news(query, max_results));
        };

        match self.fetch(api_key, query, max_results).await {
            Ok(articles) => ContentResults::live(query, articles),
            Err(e) => {
                warn!("News search failed, using placeholder articles: {}", e);
                ContentResults::placeholder(query, fallback_news(query, max_results))
            }
        }
    }

    async fn fetch(
        &self,
        api_key: &str,
        query: &str,
        max_results: usize,
    ) -> DeskmateResult<Vec<NewsArticle>> {
        let resp: NewsResponse = self
            .http
            .get_json(
                &self.endpoint,
                &[("apikey", api_key), ("q", query), ("language", "en")],
            )
            .await?;

        Ok(resp
            .results
            .into_iter()
            .take(max_results)
            .filter_map(RawArticle::into_article)
            .collect())
    }
}

/// Up to three placeholder articles, one per news search engine.
pub fn fallback_news(query: &str, max_results: usize) -> Vec<NewsArticle> {
    let sources = [
        (
            "Google News",
            "https://news.google.com/search",
            format!("Breaking: New Developments in {query}"),
        ),
        (
            "Bing News",
            "https://www.bing.com/news/search",
            format!("{query} Trends That Are Reshaping the Industry"),
        ),
        (
            "Yahoo News",
            "https://news.yahoo.com/search",
            format!("Experts Weigh In on the Future of {query}"),
        ),
    ];

    sources
        .into_iter()
        .take(max_results.min(MAX_FALLBACK_RESULTS))
        .map(|(name, base, title)| NewsArticle {
            title,
            url: search_url(base, "q", query),
            description: format!("Latest news about {query} from {name}."),
            source: name.to_string(),
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
    fn test_fallback_sources() {
        let articles = fallback_news("climate", 5);
        let sources: Vec<_> = articles.iter().map(|a| a.source.as_str()).collect();
        assert_eq!(sources, vec!["Google News", "Bing News", "Yahoo News"]);
        assert_eq!(articles[0].url, "https://news.google.com/search?q=climate");
        assert_eq!(articles[0].description, "Latest news about climate from Google News.");
        assert!(fallback_news("climate", 0).is_empty());
    }

    #[tokio::test]
    async fn test_live_search_drops_incomplete_articles() {
        let (url, _) = serve(vec![json(
            r#"{"status":"success","results":[
                {"title":"Heatwave","link":"https://example.com/a","description":"Hot","source_id":"bbc"},
                {"title":null,"link":"https://example.com/b"},
                {"title":"Storm","url":"https://example.com/c"}
            ]}"#,
        )])
        .await;

        let results = NewsSearch::new(http(), Some("key".into()))
            .with_endpoint(&url)
            .search("weather", 5)
            .await;
        assert!(!results.fallback);
        assert_eq!(results.results.len(), 2);
        assert_eq!(results.results[0].source, "bbc");
        assert_eq!(results.results[1].url, "https://example.com/c");
        assert_eq!(results.results[1].description, "");
    }

    #[tokio::test]
    async fn test_rate_limited_search_falls_back() {
        let (url, hits) = serve(vec![status(429, "Too Many Requests"); 2]).await;

        let results = NewsSearch::new(http(), Some("key".into()))
            .with_endpoint(&url)
            .search("weather", 2)
            .await;
        assert!(results.fallback);
        assert_eq!(results.results.len(), 2);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
