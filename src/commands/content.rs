use anyhow::Result;
use clap::ValueEnum;
use deskmate_core::DeskmateConfig;
use deskmate_core::content::{NewsSearch, VideoSearch};
use deskmate_core::http::HttpClient;
use serde_json::Value;

use super::to_json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ContentMethod {
    SearchVideos,
    SearchNews,
}

pub async fn run(
    config: &DeskmateConfig,
    method: ContentMethod,
    query: &str,
    max_results: usize,
) -> Result<Value> {
    let http = HttpClient::new()?;

    match method {
        ContentMethod::SearchVideos => {
            let search = VideoSearch::new(http, config.youtube_api_key.clone());
            to_json(&search.search(query, max_results).await)
        }
        ContentMethod::SearchNews => {
            let search = NewsSearch::new(http, config.news_api_key.clone());
            to_json(&search.search(query, max_results).await)
        }
    }
}
