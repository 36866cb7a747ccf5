use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::insights::{HealthReport, Issue, IssueKind, Recommendation, Severity};
use crate::models::RepositoryRecord;

pub const PRACTICE_KEYWORDS: [&str; 8] = [
    "practice",
    "test",
    "learning",
    "tutorial",
    "example",
    "demo",
    "temp",
    "experiment",
];

const MIN_DESCRIPTION_CHARS: usize = 10;
const NOTABLE_STAR_COUNT: u64 = 10;

/// Score deduction per issue kind.
///
/// The two call sites weigh a missing license differently (15 in the
/// portfolio audit, 20 in the single-repository health check); both weights
/// are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyTable {
    pub missing_license: u32,
    pub weak_description: u32,
    pub missing_readme: u32,
    pub stale: u32,
    pub practice_should_be_private: u32,
}

impl PenaltyTable {
    pub const HEALTH_CHECK: Self = Self {
        missing_license: 20,
        weak_description: 10,
        missing_readme: 20,
        stale: 10,
        practice_should_be_private: 0,
    };

    pub const PORTFOLIO_AUDIT: Self = Self {
        missing_license: 15,
        weak_description: 10,
        missing_readme: 20,
        stale: 10,
        practice_should_be_private: 0,
    };

    pub fn penalty(&self, kind: IssueKind) -> u32 {
        match kind {
            IssueKind::MissingLicense => self.missing_license,
            IssueKind::WeakDescription => self.weak_description,
            IssueKind::MissingReadme => self.missing_readme,
            IssueKind::Stale => self.stale,
            IssueKind::PracticeShouldBePrivate => self.practice_should_be_private,
        }
    }
}

/// How old `updated_at` may be before a repository counts as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub months: u32,
    pub severity: Severity,
    pub description: &'static str,
}

impl StalenessPolicy {
    pub const PORTFOLIO: Self = Self {
        months: 6,
        severity: Severity::Low,
        description: "Not updated in 6+ months",
    };

    pub const HEALTH_CHECK: Self = Self {
        months: 1,
        severity: Severity::Low,
        description: "Not updated in over a month",
    };

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_months(Months::new(self.months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IssueFilter {
    MissingLicense,
    MissingReadme,
    WeakDescription,
    Stale,
    All,
}

impl IssueFilter {
    fn kinds(self) -> &'static [IssueKind] {
        match self {
            Self::MissingLicense => &[IssueKind::MissingLicense],
            Self::MissingReadme => &[IssueKind::MissingReadme],
            Self::WeakDescription => &[IssueKind::WeakDescription],
            Self::Stale => &[IssueKind::Stale],
            Self::All => &[
                IssueKind::MissingLicense,
                IssueKind::MissingReadme,
                IssueKind::WeakDescription,
                IssueKind::Stale,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub issues: Vec<Issue>,
    pub strengths: Vec<String>,
}

impl Classification {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

fn is_weak_description(description: Option<&str>) -> bool {
    description.map_or(true, |d| d.trim().chars().count() < MIN_DESCRIPTION_CHARS)
}

fn looks_like_practice(record: &RepositoryRecord) -> bool {
    let name = record.name.to_lowercase();
    let description = record
        .description
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    PRACTICE_KEYWORDS
        .iter()
        .any(|keyword| name.contains(keyword) || description.contains(keyword))
}

/// Apply a single classification rule.
fn detect(
    record: &RepositoryRecord,
    kind: IssueKind,
    staleness: &StalenessPolicy,
    now: DateTime<Utc>,
) -> Option<Issue> {
    let (triggered, severity, description) = match kind {
        IssueKind::MissingLicense => (
            !record.has_license,
            Severity::High,
            "Missing LICENSE file",
        ),
        IssueKind::WeakDescription => (
            is_weak_description(record.description.as_deref()),
            Severity::Medium,
            "Weak or missing description",
        ),
        IssueKind::MissingReadme => (!record.has_readme, Severity::High, "Missing README.md"),
        IssueKind::Stale => (
            record.updated_at < staleness.cutoff(now),
            staleness.severity,
            staleness.description,
        ),
        IssueKind::PracticeShouldBePrivate => (
            !record.is_private && looks_like_practice(record),
            Severity::Medium,
            "Practice/demo code should be private",
        ),
    };

    triggered.then(|| Issue {
        repo_name: record.name.clone(),
        kind,
        severity,
        description: description.to_string(),
    })
}

const RULE_ORDER: [IssueKind; 5] = [
    IssueKind::MissingLicense,
    IssueKind::WeakDescription,
    IssueKind::MissingReadme,
    IssueKind::Stale,
    IssueKind::PracticeShouldBePrivate,
];

pub fn classify_repository(
    record: &RepositoryRecord,
    staleness: &StalenessPolicy,
    now: DateTime<Utc>,
) -> Classification {
    let issues: Vec<Issue> = RULE_ORDER
        .iter()
        .filter_map(|&kind| detect(record, kind, staleness, now))
        .collect();

    let has = |kind: IssueKind| issues.iter().any(|i| i.kind == kind);
    let mut strengths = Vec::new();

    if !has(IssueKind::MissingLicense) {
        match &record.license_name {
            Some(license) => strengths.push(format!("Has license: {license}")),
            None => strengths.push("Has license".to_string()),
        }
    }
    if !has(IssueKind::WeakDescription) {
        strengths.push("Has description".to_string());
    }
    if !has(IssueKind::MissingReadme) {
        strengths.push("Has README.md".to_string());
    }
    if !has(IssueKind::Stale) {
        strengths.push("Recently updated".to_string());
    }
    if record.star_count > NOTABLE_STAR_COUNT {
        strengths.push(format!("{} stars", record.star_count));
    }

    Classification { issues, strengths }
}

fn recommendation_for(kind: IssueKind) -> Option<Recommendation> {
    let (priority, action) = match kind {
        IssueKind::MissingReadme => (
            Severity::High,
            "Add a README.md that explains what the project does and how to run it",
        ),
        IssueKind::MissingLicense => (
            Severity::High,
            "Add a LICENSE file so others know how they may use the code",
        ),
        IssueKind::WeakDescription => (
            Severity::Medium,
            "Write a repository description of at least 10 characters",
        ),
        IssueKind::Stale | IssueKind::PracticeShouldBePrivate => return None,
    };

    Some(Recommendation {
        priority,
        action: action.to_string(),
    })
}

const RECOMMENDATION_ORDER: [IssueKind; 3] = [
    IssueKind::MissingReadme,
    IssueKind::MissingLicense,
    IssueKind::WeakDescription,
];

pub fn score_with(
    record: &RepositoryRecord,
    staleness: &StalenessPolicy,
    penalties: &PenaltyTable,
    now: DateTime<Utc>,
) -> HealthReport {
    let Classification { issues, strengths } = classify_repository(record, staleness, now);

    let score = penalty_score(&issues, penalties);

    let recommendations = RECOMMENDATION_ORDER
        .iter()
        .filter(|&&kind| issues.iter().any(|i| i.kind == kind))
        .filter_map(|&kind| recommendation_for(kind))
        .collect();

    HealthReport {
        name: record.name.clone(),
        score,
        issues: issues.into_iter().map(|i| i.description).collect(),
        strengths,
        recommendations,
    }
}

/// `100 - sum(penalties)`, clamped to `[0, 100]`.
pub fn penalty_score(issues: &[Issue], penalties: &PenaltyTable) -> u8 {
    let total_penalty: i64 = issues
        .iter()
        .map(|issue| i64::from(penalties.penalty(issue.kind)))
        .sum();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = (100 - total_penalty).clamp(0, 100) as u8;
    score
}

/// Single-repository health check: one-month staleness, license weighs 20.
pub fn score_repository(record: &RepositoryRecord, now: DateTime<Utc>) -> HealthReport {
    score_with(
        record,
        &StalenessPolicy::HEALTH_CHECK,
        &PenaltyTable::HEALTH_CHECK,
        now,
    )
}

pub fn find_by_issue_kind(
    records: &[RepositoryRecord],
    filter: IssueFilter,
    staleness: &StalenessPolicy,
    now: DateTime<Utc>,
) -> Vec<Issue> {
    records
        .iter()
        .flat_map(|record| {
            filter
                .kinds()
                .iter()
                .filter_map(move |&kind| detect(record, kind, staleness, now))
        })
        .collect()
}
