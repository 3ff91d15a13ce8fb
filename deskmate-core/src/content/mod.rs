//! External content search (videos and news) with placeholder fallbacks.
//!
//! A live search that fails for any reason, or that has no API key to work
//! with, is answered with deterministic placeholder results instead. The
//! `fallback` flag on [`ContentResults`] tells the two apart.

mod news;
mod video;

pub use news::{NEWSDATA_URL, NewsArticle, NewsSearch, fallback_news};
pub use video::{Video, VideoSearch, YOUTUBE_SEARCH_URL, fallback_videos};

use serde::Serialize;

/// Most placeholder results a fallback produces.
pub const MAX_FALLBACK_RESULTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentResults<T> {
    pub query: String,
    pub results: Vec<T>,
    /// True when `results` are placeholders rather than live search results
    pub fallback: bool,
}

impl<T> ContentResults<T> {
    fn live(query: &str, results: Vec<T>) -> Self {
        ContentResults {
            query: query.to_string(),
            results,
            fallback: false,
        }
    }

    fn placeholder(query: &str, results: Vec<T>) -> Self {
        ContentResults {
            query: query.to_string(),
            results,
            fallback: true,
        }
    }
}

/// `base` with `query` appended as a form-encoded parameter.
fn search_url(base: &str, param: &str, query: &str) -> String {
    url::Url::parse_with_params(base, &[(param, query)])
        .map(String::from)
        .unwrap_or_else(|_| base.to_string())
}
