use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    MissingLicense,
    WeakDescription,
    MissingReadme,
    Stale,
    PracticeShouldBePrivate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub repo_name: String,
    pub kind: IssueKind,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Severity,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub name: String,
    pub score: u8,
    pub issues: Vec<String>,
    pub strengths: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub owner: String,
    pub collected_at: DateTime<Utc>,
    pub total_repositories: usize,
    pub public_repositories: usize,
    pub private_repositories: usize,
    pub total_stars: u64,
    pub total_forks: u64,
    pub language_histogram: IndexMap<String, usize>,
    pub license_coverage_percent: u8,
    pub readme_coverage_percent: u8,
    pub repositories_with_issues: usize,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryScore {
    pub name: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub owner: String,
    pub total_repositories: usize,
    pub total_issues: usize,
    pub high_severity: usize,
    pub medium_severity: usize,
    pub low_severity: usize,
    pub healthy_repositories: Vec<String>,
    pub scores: Vec<RepositoryScore>,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub repository: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchHealthReport {
    pub owner: String,
    pub reports: Vec<HealthReport>,
    pub failures: Vec<FetchFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleTimeStats {
    pub count: usize,
    pub avg_days: f64,
    pub median_days: f64,
    pub min_days: f64,
    pub max_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResubmissionExample {
    pub original_id: String,
    pub closed_at: DateTime<Utc>,
    pub resubmitted_id: String,
    pub opened_at: DateTime<Utc>,
    pub address: String,
    pub category: String,
    pub subtype: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResubmissionReport {
    pub scanned_count: usize,
    pub resubmission_count: usize,
    pub rate_percent: f64,
    pub examples: Vec<ResubmissionExample>,
}

/// Round to two decimal places, the precision every day/percent figure uses.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
