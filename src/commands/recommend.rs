use std::io::Read;

use anyhow::{Context, Result};
use clap::ValueEnum;
use deskmate_core::DeskmateConfig;
use deskmate_core::recommend::Recommender;
use deskmate_core::store::HistoryStore;
use deskmate_core::visit::Visit;
use serde_json::{Value, json};

use super::to_json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum RecommendMethod {
    AnalyzeHistory,
    GenerateRecommendations,
    GetUserInterests,
    GetCategoryStats,
    GetRecommendations,
    RecordVisits,
}

pub fn run(
    config: &DeskmateConfig,
    method: RecommendMethod,
    limit: usize,
    visits: Option<String>,
) -> Result<Value> {
    let store = HistoryStore::open(config.history_db_path())?;
    let mut recommender = Recommender::new(store);

    match method {
        RecommendMethod::AnalyzeHistory => to_json(&recommender.analyze_history()?),
        RecommendMethod::GenerateRecommendations => {
            to_json(&recommender.generate_recommendations(limit)?)
        }
        RecommendMethod::GetUserInterests => to_json(&recommender.compute_interest_profile()?),
        RecommendMethod::GetCategoryStats => to_json(&recommender.get_category_stats()?),
        RecommendMethod::GetRecommendations => to_json(&recommender.get_recommendations(limit)?),
        RecommendMethod::RecordVisits => {
            let raw = visits.context("Missing visits (--visits is required for record_visits)")?;
            let visits = parse_visits(&raw)?;
            let recorded = recommender.record_visits(visits)?;
            Ok(json!({ "success": true, "recorded": recorded }))
        }
    }
}

fn parse_visits(raw: &str) -> Result<Vec<Visit>> {
    let raw = if raw == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read visits from stdin")?;
        buf
    } else {
        raw.to_string()
    };

    serde_json::from_str(&raw).context("Invalid --visits JSON (expected an array of visits)")
}
