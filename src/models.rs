use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of one repository's metadata at analysis time.
///
/// `has_readme` is derived from a separate existence probe; a failed probe
/// is recorded as `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub name: String,
    pub description: Option<String>,
    pub has_license: bool,
    pub license_name: Option<String>,
    pub has_readme: bool,
    pub is_private: bool,
    pub updated_at: DateTime<Utc>,
    pub star_count: u64,
    pub fork_count: u64,
    pub language: Option<String>,
}

/// One SF 311 service request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    pub requested_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub address: String,
    pub category: String,
    pub subtype: String,
    pub status: String,
    pub neighborhood: Option<String>,
    pub supervisor_district: Option<String>,
}

impl CaseRecord {
    /// Closed means both a close timestamp and a closed status.
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some() && self.status.eq_ignore_ascii_case("closed")
    }

    /// Open-to-close duration in fractional days. Negative when the source
    /// data has the close before the open; callers keep such values.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_days(&self) -> Option<f64> {
        if !self.is_closed() {
            return None;
        }
        self.closed_at
            .map(|closed| (closed - self.requested_at).num_seconds() as f64 / 86_400.0)
    }
}
