use std::time::Duration;

use chrono::Utc;
use futures::{stream, StreamExt};
use log::{info, warn};

use super::client::{GitHubClient, GitHubRepositoryDto};
use super::health::{find_by_issue_kind, score_repository, IssueFilter, StalenessPolicy};
use super::portfolio::{analyze_portfolio, summarize_issues};
use crate::auth::Token;
use crate::error::Result;
use crate::insights::{BatchHealthReport, FetchFailure, HealthReport, Issue, IssueSummary, PortfolioSummary};
use crate::models::RepositoryRecord;

/// Pacing for the per-repository README probes.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub delay: Duration,
    pub concurrency: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            concurrency: 1,
        }
    }
}

pub struct GitHubProvider {
    pub client: GitHubClient,
    pub probe: ProbeSettings,
}

impl GitHubProvider {
    pub fn new(base_url: &str, token: Option<Token>, probe: ProbeSettings) -> Result<Self> {
        let client = GitHubClient::new(base_url, token)?;

        Ok(Self { client, probe })
    }

    async fn probe_readme(&self, owner: &str, dto: GitHubRepositoryDto) -> RepositoryRecord {
        if !self.probe.delay.is_zero() {
            tokio::time::sleep(self.probe.delay).await;
        }
        let has_readme = self.client.has_readme(owner, &dto.name).await;
        dto.into_record(has_readme)
    }

    /// List all repositories and resolve README presence for each.
    ///
    /// Probes run with bounded concurrency but results keep listing order.
    pub async fn fetch_records(&self, owner: &str) -> Result<Vec<RepositoryRecord>> {
        let repositories = self.client.list_repositories(owner).await?;

        info!(
            "Probing README for {} repositories of {owner}...",
            repositories.len()
        );

        let records = stream::iter(repositories)
            .map(|dto| self.probe_readme(owner, dto))
            .buffered(self.probe.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        Ok(records)
    }

    pub async fn fetch_record(&self, owner: &str, repo: &str) -> Result<RepositoryRecord> {
        let dto = self.client.get_repository(owner, repo).await?;
        Ok(self.probe_readme(owner, dto).await)
    }

    pub async fn portfolio(&self, owner: &str) -> Result<PortfolioSummary> {
        info!("Starting portfolio analysis for: {owner}");

        let records = self.fetch_records(owner).await?;

        if records.is_empty() {
            warn!("No repositories found for: {owner}");
        }

        Ok(analyze_portfolio(owner, &records, Utc::now()))
    }

    pub async fn repository_health(&self, owner: &str, repo: &str) -> Result<HealthReport> {
        info!("Checking health of {owner}/{repo}");

        let record = self.fetch_record(owner, repo).await?;
        Ok(score_repository(&record, Utc::now()))
    }

    pub async fn find_issues(&self, owner: &str, filter: IssueFilter) -> Result<Vec<Issue>> {
        let records = self.fetch_records(owner).await?;

        Ok(find_by_issue_kind(
            &records,
            filter,
            &StalenessPolicy::PORTFOLIO,
            Utc::now(),
        ))
    }

    pub async fn auto_classify(&self, owner: &str) -> Result<IssueSummary> {
        let records = self.fetch_records(owner).await?;

        Ok(summarize_issues(owner, &records, Utc::now()))
    }

    /// Health-check several repositories. A failed fetch is recorded and the
    /// rest of the batch still completes.
    pub async fn batch_health(&self, owner: &str, repos: &[String]) -> BatchHealthReport {
        let now = Utc::now();

        let results = stream::iter(repos.iter().cloned())
            .map(|repo: String| async move {
                let result = self.fetch_record(owner, &repo).await;
                (repo, result)
            })
            .buffered(self.probe.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut reports = Vec::new();
        let mut failures = Vec::new();

        for (repo, result) in results {
            match result {
                Ok(record) => reports.push(score_repository(&record, now)),
                Err(e) => {
                    warn!("Skipping {owner}/{repo}: {e}");
                    failures.push(FetchFailure {
                        repository: repo,
                        error: e.to_string(),
                    });
                }
            }
        }

        BatchHealthReport {
            owner: owner.to_string(),
            reports,
            failures,
        }
    }
}
