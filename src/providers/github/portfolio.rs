use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use super::health::{classify_repository, penalty_score, PenaltyTable, StalenessPolicy};
use crate::insights::{Issue, IssueSummary, PortfolioSummary, RepositoryScore, Severity};
use crate::models::RepositoryRecord;

const LICENSE_COVERAGE_TARGET: u8 = 80;

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn coverage_percent(covered: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((covered as f64 / total as f64) * 100.0).round() as u8
}

/// Most frequent language; on a tie the one seen first wins.
fn top_language(histogram: &IndexMap<String, usize>) -> Option<(&str, usize)> {
    let mut best: Option<(&str, usize)> = None;

    for (language, &count) in histogram {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((language.as_str(), count));
        }
    }

    best
}

fn generate_insights(
    total: usize,
    license_coverage: u8,
    unlicensed: usize,
    public: usize,
    private: usize,
    histogram: &IndexMap<String, usize>,
) -> Vec<String> {
    let mut insights = Vec::new();

    if total > 0 && license_coverage < LICENSE_COVERAGE_TARGET {
        insights.push(format!(
            "Only {license_coverage}% of repositories have a license; {unlicensed} still need one"
        ));
    }

    if public > 2 * private {
        insights.push(format!(
            "{public} public vs {private} private repositories: consider making practice and demo repositories private"
        ));
    }

    if let Some((language, count)) = top_language(histogram) {
        insights.push(format!("Most used language: {language} ({count} repositories)"));
    }

    insights
}

pub fn analyze_portfolio(
    owner: &str,
    records: &[RepositoryRecord],
    now: DateTime<Utc>,
) -> PortfolioSummary {
    let total = records.len();
    let mut private = 0;
    let mut licensed = 0;
    let mut with_readme = 0;
    let mut with_issues = 0;
    let mut total_stars = 0;
    let mut total_forks = 0;
    let mut language_histogram: IndexMap<String, usize> = IndexMap::new();

    for record in records {
        if record.is_private {
            private += 1;
        }
        if record.has_license {
            licensed += 1;
        }
        if record.has_readme {
            with_readme += 1;
        }
        if !classify_repository(record, &StalenessPolicy::PORTFOLIO, now).is_healthy() {
            with_issues += 1;
        }
        total_stars += record.star_count;
        total_forks += record.fork_count;

        if let Some(language) = &record.language {
            *language_histogram.entry(language.clone()).or_insert(0) += 1;
        }
    }

    let public = total - private;
    let license_coverage_percent = coverage_percent(licensed, total);
    let insights = generate_insights(
        total,
        license_coverage_percent,
        total - licensed,
        public,
        private,
        &language_histogram,
    );

    PortfolioSummary {
        owner: owner.to_string(),
        collected_at: now,
        total_repositories: total,
        public_repositories: public,
        private_repositories: private,
        total_stars,
        total_forks,
        language_histogram,
        license_coverage_percent,
        readme_coverage_percent: coverage_percent(with_readme, total),
        repositories_with_issues: with_issues,
        insights,
    }
}

/// Classify every repository with the portfolio-wide policy and score it
/// with the portfolio audit weights.
pub fn summarize_issues(
    owner: &str,
    records: &[RepositoryRecord],
    now: DateTime<Utc>,
) -> IssueSummary {
    let mut healthy_repositories = Vec::new();
    let mut scores = Vec::with_capacity(records.len());
    let mut issues: Vec<Issue> = Vec::new();

    for record in records {
        let classification = classify_repository(record, &StalenessPolicy::PORTFOLIO, now);
        if classification.is_healthy() {
            healthy_repositories.push(record.name.clone());
        }
        scores.push(RepositoryScore {
            name: record.name.clone(),
            score: penalty_score(&classification.issues, &PenaltyTable::PORTFOLIO_AUDIT),
        });
        issues.extend(classification.issues);
    }

    let count = |severity: Severity| issues.iter().filter(|i| i.severity == severity).count();

    IssueSummary {
        owner: owner.to_string(),
        total_repositories: records.len(),
        total_issues: issues.len(),
        high_severity: count(Severity::High),
        medium_severity: count(Severity::Medium),
        low_severity: count(Severity::Low),
        healthy_repositories,
        scores,
        issues,
    }
}
