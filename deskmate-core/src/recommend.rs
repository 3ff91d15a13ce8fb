//! Ranked, deduplicated recommendations from the interest profile.

use std::collections::HashSet;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DeskmateResult;
use crate::interests::{CategoryScore, InterestProfile, compute_interest_profile};
use crate::store::HistoryStore;
use crate::visit::{CategoryPatterns, CategoryStats, HistoryAnalysis, VISIT_TIME_FORMAT, Visit};

/// A fixed recommendation candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub title: &'static str,
    pub url: &'static str,
}

const fn source(title: &'static str, url: &'static str) -> Source {
    Source { title, url }
}

/// Candidates per category. The order of categories breaks score ties and the
/// order within a category is the order candidates are emitted in.
pub const CATEGORY_SOURCES: &[(&str, &[Source])] = &[
    (
        "Technology",
        &[
            source("GitHub Explore - Trending Projects", "https://github.com/explore"),
            source("DEV Community", "https://dev.to"),
            source("Hacker News", "https://news.ycombinator.com"),
            source("Medium Technology", "https://medium.com/topic/technology"),
            source("Product Hunt", "https://www.producthunt.com"),
        ],
    ),
    (
        "News",
        &[
            source("Google News", "https://news.google.com"),
            source("Reuters", "https://reuters.com"),
            source("Associated Press", "https://apnews.com"),
            source("BBC News", "https://www.bbc.com/news"),
            source("Al Jazeera", "https://www.aljazeera.com"),
        ],
    ),
    (
        "Entertainment",
        &[
            source("YouTube Trending", "https://www.youtube.com/trending"),
            source("IMDb", "https://www.imdb.com"),
            source("Spotify Browse", "https://www.spotify.com/browse"),
            source("Netflix Browse", "https://www.netflix.com/browse"),
            source("Twitch Directory", "https://www.twitch.tv/directory"),
        ],
    ),
    (
        "Productivity",
        &[
            source("Notion - All-in-one Workspace", "https://www.notion.so"),
            source("Trello", "https://trello.com"),
            source("Evernote", "https://www.evernote.com"),
            source("Google Calendar", "https://calendar.google.com"),
            source("Todoist", "https://todoist.com"),
        ],
    ),
    (
        "Social",
        &[
            source("LinkedIn", "https://www.linkedin.com"),
            source("Twitter", "https://twitter.com"),
            source("Reddit", "https://www.reddit.com"),
            source("Mastodon", "https://joinmastodon.org"),
            source("Discord", "https://discord.com"),
        ],
    ),
    (
        "Education",
        &[
            source("Coursera", "https://www.coursera.org"),
            source("Udemy", "https://www.udemy.com"),
            source("edX", "https://www.edx.org"),
            source("Khan Academy", "https://www.khanacademy.org"),
            source("Codecademy", "https://www.codecademy.com"),
        ],
    ),
    (
        "Shopping",
        &[
            source("Amazon", "https://www.amazon.com"),
            source("eBay", "https://www.ebay.com"),
            source("Etsy", "https://www.etsy.com"),
        ],
    ),
];

/// Position of `category` in [`CATEGORY_SOURCES`]; unknown categories sort last.
pub fn category_rank(category: &str) -> usize {
    CATEGORY_SOURCES
        .iter()
        .position(|(name, _)| *name == category)
        .unwrap_or(CATEGORY_SOURCES.len())
}

pub fn sources_for(category: &str) -> &'static [Source] {
    CATEGORY_SOURCES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, sources)| *sources)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub url: String,
    pub description: String,
    pub category: String,
    /// Percentage, two decimals
    pub confidence: f64,
    pub timestamp: String,
    #[serde(default)]
    pub is_visited: bool,
}

/// Walk the profile's categories highest score first and take their
/// candidates in order, skipping urls already taken, until `limit` is reached.
pub fn rank_recommendations(
    profile: &InterestProfile,
    limit: usize,
    timestamp: &str,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();
    let mut used_urls = HashSet::new();

    'categories: for CategoryScore { category, score } in profile.ranked() {
        let confidence = (score * 10_000.0).round() / 100.0;
        let description = format!("Recommended based on your interest in {category}");

        for source in sources_for(&category) {
            if recommendations.len() >= limit {
                break 'categories;
            }
            if !used_urls.insert(source.url) {
                continue;
            }
            recommendations.push(Recommendation {
                title: source.title.to_string(),
                url: source.url.to_string(),
                description: description.clone(),
                category: category.clone(),
                confidence,
                timestamp: timestamp.to_string(),
                is_visited: false,
            });
        }
    }

    recommendations
}

/// Scoring and recommendation operations over the history database.
pub struct Recommender {
    store: HistoryStore,
}

impl Recommender {
    pub fn new(store: HistoryStore) -> Self {
        Recommender { store }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn record_visits(&mut self, visits: Vec<Visit>) -> DeskmateResult<usize> {
        let visits: Vec<Visit> = visits.into_iter().map(Visit::with_derived_domain).collect();
        self.store.record_visits(&visits)
    }

    pub fn compute_interest_profile(&self) -> DeskmateResult<InterestProfile> {
        let activity = self.store.category_activity().inspect_err(|e| {
            warn!("Failed to read category activity: {}", e);
        })?;
        Ok(compute_interest_profile(&activity, Local::now().naive_local()))
    }

    /// Generate up to `limit` recommendations and replace the saved snapshot with them.
    pub fn generate_recommendations(&mut self, limit: usize) -> DeskmateResult<Vec<Recommendation>> {
        let mut profile = self.compute_interest_profile()?;
        if profile.is_empty() {
            info!("No user interests found, using the default profile");
            profile = InterestProfile::default_profile();
        }

        let timestamp = Local::now().format(VISIT_TIME_FORMAT).to_string();
        let recommendations = rank_recommendations(&profile, limit, &timestamp);

        self.store
            .replace_recommendations(&recommendations)
            .inspect_err(|e| warn!("Failed to save recommendations: {}", e))?;
        info!("Generated and saved {} recommendations", recommendations.len());

        Ok(recommendations)
    }

    /// The saved snapshot, highest confidence first.
    pub fn get_recommendations(&self, limit: usize) -> DeskmateResult<Vec<Recommendation>> {
        self.store.saved_recommendations(limit)
    }

    pub fn get_category_stats(&self) -> DeskmateResult<Vec<CategoryStats>> {
        self.store.category_stats()
    }

    pub fn analyze_history(&self) -> DeskmateResult<HistoryAnalysis> {
        let distribution = self.store.category_distribution()?;
        let total_visits = distribution.total();

        Ok(HistoryAnalysis {
            categories: CategoryPatterns {
                distribution,
                time_patterns: self.store.hourly_counts()?,
                weekly_patterns: self.store.weekday_counts()?,
            },
            total_visits,
        })
    }
}
