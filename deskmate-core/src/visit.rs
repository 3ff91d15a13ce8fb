//! Browsing-history types.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use url::Url;

/// Categories with this name are never scored.
pub const OTHER_CATEGORY: &str = "Other";

/// Timestamp format for `visit_time` and recommendation timestamps.
pub const VISIT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One browsing-history observation. Visits are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub visit_time: String,
    #[serde(default)]
    pub domain: String,
    /// Assigned by an external classifier
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_confidence: f64,
    #[serde(default = "default_visit_count")]
    pub visit_count: i64,
}

fn default_visit_count() -> i64 {
    1
}

impl Visit {
    pub fn new(url: &str, title: &str, visit_time: &str, category: Option<&str>) -> Self {
        Visit {
            url: url.to_string(),
            title: title.to_string(),
            visit_time: visit_time.to_string(),
            domain: domain_of(url),
            category: category.map(str::to_string),
            category_confidence: 0.0,
            visit_count: 1,
        }
    }

    /// Fill in `domain` from the url when the caller left it empty.
    pub fn with_derived_domain(mut self) -> Self {
        if self.domain.is_empty() {
            self.domain = domain_of(&self.url);
        }
        self
    }
}

/// Host of `url` without a leading `www.`; empty when the url has no host.
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|host| host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
        .unwrap_or_default()
}

/// Per-category aggregates used for interest scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryActivity {
    pub category: String,
    pub visit_count: i64,
    /// Most recent `visit_time` in the category, as stored
    pub last_visit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub visit_count: i64,
    pub unique_domains: i64,
    pub last_visit: Option<String>,
}

/// Label → count pairs that serialize as a JSON object in their given order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counts(pub Vec<(String, i64)>);

impl Counts {
    pub fn total(&self) -> i64 {
        self.0.iter().map(|(_, n)| n).sum()
    }
}

impl Serialize for Counts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryAnalysis {
    pub categories: CategoryPatterns,
    pub total_visits: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPatterns {
    /// Visits per category, most visited first
    pub distribution: Counts,
    /// Visits per hour of day (`"00"`..`"23"`), busiest first
    pub time_patterns: Counts,
    /// Visits per weekday (`"0"` = Sunday), in weekday order
    pub weekly_patterns: Counts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://github.com/explore"), "github.com");
        assert_eq!(domain_of("https://www.bbc.com/news"), "bbc.com");
        assert_eq!(domain_of("https://news.google.com"), "news.google.com");
        assert_eq!(domain_of("not a url"), "");
    }

    #[test]
    fn test_visit_deserialize_defaults() {
        let v: Visit = serde_json::from_str(
            r#"{"url": "https://dev.to/x", "visit_time": "2025-04-01 10:00:00", "category": "Technology"}"#,
        )
        .unwrap();
        let v = v.with_derived_domain();
        assert_eq!(v.visit_count, 1);
        assert_eq!(v.domain, "dev.to");
        assert_eq!(v.category.as_deref(), Some("Technology"));
    }

    #[test]
    fn test_counts_serialize_in_order() {
        let counts = Counts(vec![("b".into(), 3), ("a".into(), 1)]);
        assert_eq!(serde_json::to_string(&counts).unwrap(), r#"{"b":3,"a":1}"#);
        assert_eq!(counts.total(), 4);
    }
}
