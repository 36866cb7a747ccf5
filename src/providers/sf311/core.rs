use chrono::{DateTime, Utc};
use log::{info, warn};

use super::client::{CaseQuery, SocrataClient};
use super::cycle_time::compute_cycle_times;
use super::filters::{CaseFilters, LookbackWindow};
use super::resubmissions::detect_resubmissions;
use crate::auth::Token;
use crate::error::Result;
use crate::insights::{CycleTimeStats, ResubmissionReport};

pub struct Sf311Provider {
    pub client: SocrataClient,
    pub case_limit: usize,
}

impl Sf311Provider {
    pub fn new(base_url: &str, app_token: Option<Token>, case_limit: usize) -> Result<Self> {
        let client = SocrataClient::new(base_url, app_token)?;

        Ok(Self { client, case_limit })
    }

    fn query(
        &self,
        filters: &CaseFilters,
        lookback_days: u32,
        closed_only: bool,
        order: &'static str,
        now: DateTime<Utc>,
    ) -> CaseQuery {
        CaseQuery {
            filters: filters.clone(),
            since: LookbackWindow::new(now, lookback_days).start,
            closed_only,
            order,
            limit: self.case_limit,
        }
    }

    /// Returns whether `fetched` reached the row limit, warning if so.
    fn warn_if_truncated(&self, fetched: usize) -> bool {
        let truncated = fetched >= self.case_limit;
        if truncated {
            warn!(
                "Case fetch hit the limit of {}; results cover a truncated sample",
                self.case_limit
            );
        }
        truncated
    }

    pub async fn cycle_times(
        &self,
        filters: &CaseFilters,
        lookback_days: u32,
    ) -> Result<CycleTimeStats> {
        let now = Utc::now();
        let query = self.query(filters, lookback_days, true, "requested_datetime DESC", now);
        let records = self.client.fetch_cases(&query).await?;

        self.warn_if_truncated(records.len());

        let stats = compute_cycle_times(&records, filters, lookback_days, now);
        info!("Computed cycle times over {} closed cases", stats.count);

        Ok(stats)
    }

    pub async fn resubmissions(
        &self,
        filters: &CaseFilters,
        lookback_days: u32,
        reopen_window_days: u32,
    ) -> Result<ResubmissionReport> {
        let now = Utc::now();
        let query = self.query(
            filters,
            lookback_days,
            false,
            "address, service_subtype, requested_datetime",
            now,
        );
        let records = self.client.fetch_cases(&query).await?;

        self.warn_if_truncated(records.len());

        let report = detect_resubmissions(&records, filters, lookback_days, reopen_window_days, now);
        info!(
            "Found {} resubmissions in {} scanned cases",
            report.resubmission_count, report.scanned_count
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mockito::Matcher;

    fn soql(ts: DateTime<Utc>) -> String {
        ts.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    }

    #[tokio::test]
    async fn test_resubmissions_end_to_end() {
        let closed = Utc::now() - Duration::days(10);
        let reopened = closed + Duration::days(2);
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/resource/vw6y-z8j6.json")
            .match_query(Matcher::Regex("starts_with".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!([
                    {
                        "service_request_id": "1",
                        "requested_datetime": soql(closed - Duration::days(1)),
                        "closed_date": soql(closed),
                        "status_description": "Closed",
                        "service_name": "Encampments",
                        "service_subtype": "Encampment Reports",
                        "address": "100 LARKIN ST"
                    },
                    {
                        "service_request_id": "2",
                        "requested_datetime": soql(reopened),
                        "status_description": "Open",
                        "service_name": "Encampments",
                        "service_subtype": "Encampment Reports",
                        "address": "100 LARKIN ST"
                    }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let provider = Sf311Provider::new(&server.url(), None, 5000).unwrap();
        let filters = CaseFilters {
            service_name_prefix: Some("Encamp".to_string()),
            ..CaseFilters::default()
        };
        let report = provider.resubmissions(&filters, 30, 7).await.unwrap();

        assert_eq!(report.scanned_count, 2);
        assert_eq!(report.resubmission_count, 1);
        assert_eq!(report.examples[0].resubmitted_id, "2");
    }

    #[tokio::test]
    async fn test_cycle_times_with_no_rows_is_all_zero() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/resource/vw6y-z8j6.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let provider = Sf311Provider::new(&server.url(), None, 5000).unwrap();
        let stats = provider
            .cycle_times(&CaseFilters::default(), 30)
            .await
            .unwrap();

        assert_eq!(stats, CycleTimeStats::default());
    }

    #[test]
    fn test_truncation_is_flagged_at_the_limit() {
        let provider = Sf311Provider::new("http://127.0.0.1:1", None, 2).unwrap();

        assert!(!provider.warn_if_truncated(1));
        assert!(provider.warn_if_truncated(2));
    }

    #[tokio::test]
    async fn test_resubmissions_at_row_limit_still_report() {
        let requested = Utc::now() - Duration::days(3);
        let rows: Vec<_> = (0..3)
            .map(|i| {
                serde_json::json!({
                    "service_request_id": i.to_string(),
                    "requested_datetime": soql(requested),
                    "status_description": "Open",
                    "service_name": "Graffiti",
                    "service_subtype": "Graffiti on Building",
                    "address": format!("{i} MARKET ST")
                })
            })
            .collect();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/resource/vw6y-z8j6.json")
            .match_query(Matcher::UrlEncoded("$limit".to_string(), "3".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::Value::Array(rows).to_string())
            .create_async()
            .await;

        let provider = Sf311Provider::new(&server.url(), None, 3).unwrap();
        let report = provider
            .resubmissions(&CaseFilters::default(), 30, 7)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(report.scanned_count, 3);
        assert_eq!(report.resubmission_count, 0);
    }

    #[test]
    fn test_huge_lookback_does_not_overflow() {
        let provider = Sf311Provider::new("http://127.0.0.1:1", None, 10).unwrap();

        let query = provider.query(
            &CaseFilters::default(),
            u32::MAX,
            true,
            "requested_datetime DESC",
            Utc::now(),
        );

        assert!(query.since < Utc::now());
    }
}
