use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::CaseRecord;

/// Optional record filters. Text filters are either prefix-only
/// (`service_name_prefix`) or exact; infix matching is never done, so the
/// same filter can be pushed down to the upstream query unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFilters {
    pub service_name_prefix: Option<String>,
    pub neighborhood: Option<String>,
    pub supervisor_district: Option<String>,
}

pub fn matches_prefix(value: &str, prefix: &str) -> bool {
    value.starts_with(prefix)
}

fn matches_exact(value: Option<&str>, expected: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => value == Some(expected),
    }
}

impl CaseFilters {
    pub fn matches(&self, record: &CaseRecord) -> bool {
        self.service_name_prefix
            .as_deref()
            .map_or(true, |prefix| matches_prefix(&record.category, prefix))
            && matches_exact(record.neighborhood.as_deref(), self.neighborhood.as_deref())
            && matches_exact(
                record.supervisor_district.as_deref(),
                self.supervisor_district.as_deref(),
            )
    }
}

/// Closed interval `[now - days, now]` over `requested_at`. A lookback
/// reaching past the representable range starts at the earliest instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LookbackWindow {
    pub fn new(now: DateTime<Utc>, lookback_days: u32) -> Self {
        Self {
            start: now
                .checked_sub_signed(Duration::days(i64::from(lookback_days)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: now,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(category: &str, neighborhood: Option<&str>, district: Option<&str>) -> CaseRecord {
        CaseRecord {
            id: "1".to_string(),
            requested_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            closed_at: None,
            address: "100 LARKIN ST".to_string(),
            category: category.to_string(),
            subtype: "Encampment Reports".to_string(),
            status: "Open".to_string(),
            neighborhood: neighborhood.map(str::to_string),
            supervisor_district: district.map(str::to_string),
        }
    }

    #[test]
    fn test_prefix_matches_start_only() {
        assert!(matches_prefix("Encampments", "Encamp"));
        assert!(!matches_prefix("Abandoned Encampment", "Encamp"));
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert!(!matches_prefix("Encampments", "encamp"));
    }

    #[test]
    fn test_service_name_filter_never_matches_infix() {
        let filters = CaseFilters {
            service_name_prefix: Some("Encamp".to_string()),
            ..CaseFilters::default()
        };

        assert!(filters.matches(&record("Encampments", None, None)));
        assert!(!filters.matches(&record("Abandoned Encampment", None, None)));
    }

    #[test]
    fn test_empty_filters_match_everything() {
        assert!(CaseFilters::default().matches(&record("Graffiti", None, None)));
    }

    #[test]
    fn test_neighborhood_and_district_are_exact() {
        let filters = CaseFilters {
            neighborhood: Some("Mission".to_string()),
            supervisor_district: Some("9".to_string()),
            ..CaseFilters::default()
        };

        assert!(filters.matches(&record("Graffiti", Some("Mission"), Some("9"))));
        assert!(!filters.matches(&record("Graffiti", Some("Mission Bay"), Some("9"))));
        assert!(!filters.matches(&record("Graffiti", Some("Mission"), None)));
    }

    #[test]
    fn test_lookback_window_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let window = LookbackWindow::new(now, 30);

        assert!(window.contains(now));
        assert!(window.contains(now - Duration::days(30)));
        assert!(!window.contains(now - Duration::days(30) - Duration::seconds(1)));
        assert!(!window.contains(now + Duration::seconds(1)));
    }

    #[test]
    fn test_lookback_past_representable_range_starts_at_earliest_instant() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let window = LookbackWindow::new(now, u32::MAX);

        assert_eq!(window.start, DateTime::<Utc>::MIN_UTC);
        assert!(window.contains(Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap()));
    }
}
