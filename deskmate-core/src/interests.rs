//! Interest profile: per-category weights derived from visit frequency and recency.

use chrono::{DateTime, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::recommend::category_rank;
use crate::visit::{CategoryActivity, OTHER_CATEGORY, VISIT_TIME_FORMAT};

const VISIT_WEIGHT: f64 = 0.7;
const RECENCY_WEIGHT: f64 = 0.3;
/// Recency used when a category's latest visit time can't be read.
const FALLBACK_RECENCY: f64 = 0.1;

/// Profile used when there is no usable history.
pub const DEFAULT_PROFILE: &[(&str, f64)] = &[
    ("Technology", 0.30),
    ("News", 0.20),
    ("Entertainment", 0.20),
    ("Productivity", 0.15),
    ("Social", 0.15),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category: String,
    pub score: f64,
}

/// Category → weight mapping. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterestProfile(Vec<CategoryScore>);

impl InterestProfile {
    pub fn from_scores<I, S>(scores: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        InterestProfile(
            scores
                .into_iter()
                .map(|(category, score)| CategoryScore {
                    category: category.into(),
                    score,
                })
                .collect(),
        )
    }

    pub fn default_profile() -> Self {
        Self::from_scores(DEFAULT_PROFILE.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.score)
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|s| s.score).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryScore> {
        self.0.iter()
    }

    /// Categories by score, highest first. Ties keep the source-table order.
    pub fn ranked(&self) -> Vec<CategoryScore> {
        let mut ranked = self.0.clone();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| category_rank(&a.category).cmp(&category_rank(&b.category)))
                .then_with(|| a.category.cmp(&b.category))
        });
        ranked
    }
}

impl Serialize for InterestProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for s in &self.0 {
            map.serialize_entry(&s.category, &s.score)?;
        }
        map.end()
    }
}

/// Score each category as `0.7 * share_of_visits + 0.3 / (days_since_last_visit + 1)`,
/// then normalize so the scores sum to 1.
///
/// Null and "Other" categories are ignored. Returns an empty profile when
/// nothing qualifies.
pub fn compute_interest_profile(activity: &[CategoryActivity], now: NaiveDateTime) -> InterestProfile {
    let scoreable: Vec<&CategoryActivity> = activity
        .iter()
        .filter(|a| !a.category.is_empty() && a.category != OTHER_CATEGORY && a.visit_count > 0)
        .collect();

    let total_visits: i64 = scoreable.iter().map(|a| a.visit_count).sum();
    if total_visits == 0 {
        return InterestProfile::default();
    }

    let raw: Vec<(String, f64)> = scoreable
        .iter()
        .map(|a| {
            let visit_score = a.visit_count as f64 / total_visits as f64;
            let recency_score = a
                .last_visit
                .as_deref()
                .and_then(parse_visit_time)
                .map(|last| {
                    let days = (now - last).num_days().max(0);
                    1.0 / (days as f64 + 1.0)
                })
                .unwrap_or(FALLBACK_RECENCY);
            (
                a.category.clone(),
                VISIT_WEIGHT * visit_score + RECENCY_WEIGHT * recency_score,
            )
        })
        .collect();

    let total: f64 = raw.iter().map(|(_, s)| s).sum();
    if total <= 0.0 {
        return InterestProfile::default();
    }

    InterestProfile::from_scores(raw.into_iter().map(|(c, s)| (c, s / total)))
}

fn parse_visit_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, VISIT_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 20)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn activity(category: &str, visits: i64, days_ago: i64) -> CategoryActivity {
        CategoryActivity {
            category: category.to_string(),
            visit_count: visits,
            last_visit: Some(
                (now() - Duration::days(days_ago))
                    .format(VISIT_TIME_FORMAT)
                    .to_string(),
            ),
        }
    }

    #[test]
    fn test_recent_frequent_category_wins() {
        let profile = compute_interest_profile(
            &[activity("Technology", 3, 2), activity("News", 1, 10)],
            now(),
        );

        let tech = profile.get("Technology").unwrap();
        let news = profile.get("News").unwrap();
        assert!(tech > news);
        assert!((profile.total() - 1.0).abs() < 1e-6);

        // raw: tech = 0.7*0.75 + 0.3/3 = 0.625, news = 0.7*0.25 + 0.3/11
        let news_raw = 0.7 * 0.25 + 0.3 / 11.0;
        assert!((tech - 0.625 / (0.625 + news_raw)).abs() < 1e-9);
    }

    #[test]
    fn test_scores_normalized_and_non_negative() {
        let profile = compute_interest_profile(
            &[
                activity("Technology", 12, 0),
                activity("News", 4, 30),
                activity("Social", 1, 400),
                activity("Education", 7, 3),
            ],
            now(),
        );
        assert_eq!(profile.len(), 4);
        assert!(profile.iter().all(|s| s.score >= 0.0));
        assert!((profile.total() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unparseable_time_uses_fallback_recency() {
        let mut broken = activity("News", 1, 0);
        broken.last_visit = Some("last tuesday".to_string());
        let profile = compute_interest_profile(&[activity("Technology", 1, 0), broken], now());

        // tech raw = 0.35 + 0.3, news raw = 0.35 + 0.03
        let expected = 0.38 / (0.65 + 0.38);
        assert!((profile.get("News").unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_other_and_empty_history_give_empty_profile() {
        assert!(compute_interest_profile(&[], now()).is_empty());
        assert!(compute_interest_profile(&[activity("Other", 5, 1)], now()).is_empty());
    }

    #[test]
    fn test_future_visit_counts_as_today() {
        let profile = compute_interest_profile(&[activity("News", 1, -3)], now());
        assert!((profile.get("News").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ranked_breaks_ties_by_table_order() {
        let profile = InterestProfile::from_scores([
            ("Social", 0.25),
            ("Education", 0.25),
            ("News", 0.25),
            ("Technology", 0.25),
        ]);
        let order: Vec<_> = profile.ranked().into_iter().map(|s| s.category).collect();
        assert_eq!(order, vec!["Technology", "News", "Social", "Education"]);
    }

    #[test]
    fn test_serializes_as_object() {
        let profile = InterestProfile::from_scores([("News", 0.5), ("Technology", 0.5)]);
        assert_eq!(
            serde_json::to_string(&profile).unwrap(),
            r#"{"News":0.5,"Technology":0.5}"#
        );
    }
}
