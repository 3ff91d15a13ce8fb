//! Date range for filtering events.

use chrono::{Datelike, Months, NaiveDate, NaiveTime};

/// Inclusive range of calendar days.
/// None values mean unbounded in that direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Parse optional `YYYY-MM-DD` bounds.
    pub fn from_args(from: Option<&str>, to: Option<&str>) -> Result<Self, String> {
        Ok(DateRange {
            from: from.map(parse_date).transpose()?,
            to: to.map(parse_date).transpose()?,
        })
    }

    /// From the first day of `today`'s month to the first day of the next month.
    pub fn month_of(today: NaiveDate) -> Self {
        let first = today.with_day(1).unwrap_or(today);
        let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
        DateRange {
            from: Some(first),
            to: Some(next),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    /// Start of the range as RFC3339, using a very old date if unbounded.
    pub fn time_min(&self) -> String {
        let from = self
            .from
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN));
        from.and_time(NaiveTime::MIN).and_utc().to_rfc3339()
    }

    /// End of the range (end of the last day) as RFC3339, far future if unbounded.
    pub fn time_max(&self) -> String {
        let to = self
            .to
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(2100, 1, 1).unwrap_or(NaiveDate::MAX));
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        to.and_time(end_of_day).and_utc().to_rfc3339()
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_of_wraps_december() {
        let range = DateRange::month_of(date(2025, 12, 17));
        assert_eq!(range.from, Some(date(2025, 12, 1)));
        assert_eq!(range.to, Some(date(2026, 1, 1)));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = DateRange::from_args(Some("2025-04-01"), Some("2025-04-30")).unwrap();
        assert!(range.contains(date(2025, 4, 1)));
        assert!(range.contains(date(2025, 4, 30)));
        assert!(!range.contains(date(2025, 5, 1)));
        assert!(!range.contains(date(2025, 3, 31)));
    }

    #[test]
    fn test_open_ended() {
        let range = DateRange::from_args(None, Some("2025-04-30")).unwrap();
        assert!(range.contains(date(1999, 1, 1)));
        assert!(!range.is_bounded());
    }

    #[test]
    fn test_invalid_date() {
        assert!(DateRange::from_args(Some("04/01/2025"), None).is_err());
    }

    #[test]
    fn test_time_bounds() {
        let range = DateRange::from_args(Some("2025-04-01"), Some("2025-04-30")).unwrap();
        assert_eq!(range.time_min(), "2025-04-01T00:00:00+00:00");
        assert_eq!(range.time_max(), "2025-04-30T23:59:59+00:00");
    }
}
