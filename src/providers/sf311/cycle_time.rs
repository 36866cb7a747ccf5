use chrono::{DateTime, Utc};

use super::filters::{CaseFilters, LookbackWindow};
use crate::insights::{round2, CycleTimeStats};
use crate::models::CaseRecord;

/// Closure-duration statistics over closed cases requested inside the window.
///
/// Negative durations from clock-skewed source rows are kept.
pub fn compute_cycle_times(
    records: &[CaseRecord],
    filters: &CaseFilters,
    lookback_days: u32,
    now: DateTime<Utc>,
) -> CycleTimeStats {
    let window = LookbackWindow::new(now, lookback_days);

    let mut durations: Vec<f64> = records
        .iter()
        .filter(|r| window.contains(r.requested_at) && filters.matches(r))
        .filter_map(CaseRecord::duration_days)
        .collect();

    summarize_durations(&mut durations)
}

#[allow(clippy::cast_precision_loss)]
fn summarize_durations(durations: &mut [f64]) -> CycleTimeStats {
    if durations.is_empty() {
        return CycleTimeStats::default();
    }

    durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = durations.len();
    let avg = durations.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 1 {
        durations[count / 2]
    } else {
        (durations[count / 2 - 1] + durations[count / 2]) / 2.0
    };

    CycleTimeStats {
        count,
        avg_days: round2(avg),
        median_days: round2(median),
        min_days: round2(durations[0]),
        max_days: round2(durations[count - 1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()
    }

    fn closed_case(id: &str, category: &str, requested_days_ago: i64, took: Duration) -> CaseRecord {
        let requested_at = now() - Duration::days(requested_days_ago);
        CaseRecord {
            id: id.to_string(),
            requested_at,
            closed_at: Some(requested_at + took),
            address: "1 MARKET ST".to_string(),
            category: category.to_string(),
            subtype: "General".to_string(),
            status: "Closed".to_string(),
            neighborhood: Some("Financial District".to_string()),
            supervisor_district: Some("3".to_string()),
        }
    }

    fn durations(days: &[i64]) -> Vec<CaseRecord> {
        days.iter()
            .enumerate()
            .map(|(i, &d)| closed_case(&i.to_string(), "Graffiti", 10, Duration::days(d)))
            .collect()
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let stats = compute_cycle_times(&[], &CaseFilters::default(), 30, now());

        assert_eq!(stats, CycleTimeStats::default());
        assert_eq!(stats.count, 0);
    }

    #[test]
    fn test_everything_filtered_out_is_all_zero() {
        let filters = CaseFilters {
            service_name_prefix: Some("Encamp".to_string()),
            ..CaseFilters::default()
        };

        let stats = compute_cycle_times(&durations(&[1, 2]), &filters, 30, now());

        assert_eq!(stats, CycleTimeStats::default());
    }

    #[test]
    fn test_odd_count_median_is_middle_element() {
        let stats = compute_cycle_times(&durations(&[3, 1, 2]), &CaseFilters::default(), 30, now());

        assert_eq!(stats.count, 3);
        assert_eq!(stats.median_days, 2.0);
        assert_eq!(stats.avg_days, 2.0);
        assert_eq!(stats.min_days, 1.0);
        assert_eq!(stats.max_days, 3.0);
    }

    #[test]
    fn test_even_count_median_averages_central_pair() {
        let stats = compute_cycle_times(&durations(&[4, 1, 3, 2]), &CaseFilters::default(), 30, now());

        assert_eq!(stats.median_days, 2.5);
        assert_eq!(stats.avg_days, 2.5);
    }

    #[test]
    fn test_fractional_days_are_rounded() {
        let records = vec![closed_case("1", "Graffiti", 5, Duration::hours(10))];

        let stats = compute_cycle_times(&records, &CaseFilters::default(), 30, now());

        assert_eq!(stats.avg_days, 0.42);
    }

    #[test]
    fn test_open_and_out_of_window_cases_are_skipped() {
        let mut open = closed_case("open", "Graffiti", 5, Duration::days(1));
        open.status = "Open".to_string();
        let old = closed_case("old", "Graffiti", 45, Duration::days(9));
        let kept = closed_case("kept", "Graffiti", 5, Duration::days(2));

        let stats = compute_cycle_times(&[open, old, kept], &CaseFilters::default(), 30, now());

        assert_eq!(stats.count, 1);
        assert_eq!(stats.avg_days, 2.0);
    }

    #[test]
    fn test_negative_durations_flow_into_statistics() {
        let records = vec![
            closed_case("skewed", "Graffiti", 5, Duration::days(-1)),
            closed_case("normal", "Graffiti", 5, Duration::days(3)),
        ];

        let stats = compute_cycle_times(&records, &CaseFilters::default(), 30, now());

        assert_eq!(stats.count, 2);
        assert_eq!(stats.min_days, -1.0);
        assert_eq!(stats.avg_days, 1.0);
    }

    #[test]
    fn test_neighborhood_filter_is_exact() {
        let mut elsewhere = closed_case("2", "Graffiti", 5, Duration::days(8));
        elsewhere.neighborhood = Some("Mission".to_string());
        let records = vec![closed_case("1", "Graffiti", 5, Duration::days(2)), elsewhere];
        let filters = CaseFilters {
            neighborhood: Some("Mission".to_string()),
            ..CaseFilters::default()
        };

        let stats = compute_cycle_times(&records, &filters, 30, now());

        assert_eq!(stats.count, 1);
        assert_eq!(stats.max_days, 8.0);
    }
}
