use chrono::{DateTime, Utc};

use super::filters::{CaseFilters, LookbackWindow};
use crate::insights::{round2, ResubmissionExample, ResubmissionReport};
use crate::models::CaseRecord;

pub const DEFAULT_REOPEN_WINDOW_DAYS: u32 = 7;
const MAX_EXAMPLES: usize = 5;

/// Flag cases reopened at the same address and subtype shortly after the
/// previous one closed.
///
/// Only neighbours in `(address, subtype, requested_at)` order are compared,
/// so this undercounts when same-key records are not adjacent. That is a
/// known limitation of the heuristic.
#[allow(clippy::cast_precision_loss)]
pub fn detect_resubmissions(
    records: &[CaseRecord],
    filters: &CaseFilters,
    lookback_days: u32,
    reopen_window_days: u32,
    now: DateTime<Utc>,
) -> ResubmissionReport {
    let window = LookbackWindow::new(now, lookback_days);

    let mut scanned: Vec<&CaseRecord> = records
        .iter()
        .filter(|r| window.contains(r.requested_at) && filters.matches(r))
        .collect();

    scanned.sort_by(|a, b| {
        a.address
            .cmp(&b.address)
            .then_with(|| a.subtype.cmp(&b.subtype))
            .then_with(|| a.requested_at.cmp(&b.requested_at))
    });

    let reopen_window = f64::from(reopen_window_days);
    let mut resubmission_count = 0;
    let mut examples = Vec::new();

    for pair in scanned.windows(2) {
        let (previous, current) = (pair[0], pair[1]);

        if previous.address != current.address || previous.subtype != current.subtype {
            continue;
        }
        let Some(closed_at) = previous.closed_at else {
            continue;
        };

        let gap_days = (current.requested_at - closed_at).num_seconds() as f64 / 86_400.0;
        if !(0.0..=reopen_window).contains(&gap_days) {
            continue;
        }

        resubmission_count += 1;
        if examples.len() < MAX_EXAMPLES {
            examples.push(ResubmissionExample {
                original_id: previous.id.clone(),
                closed_at,
                resubmitted_id: current.id.clone(),
                opened_at: current.requested_at,
                address: current.address.clone(),
                category: current.category.clone(),
                subtype: current.subtype.clone(),
            });
        }
    }

    let scanned_count = scanned.len();
    let rate_percent = if scanned_count > 0 {
        round2(resubmission_count as f64 / scanned_count as f64 * 100.0)
    } else {
        0.0
    };

    ResubmissionReport {
        scanned_count,
        resubmission_count,
        rate_percent,
        examples,
    }
}
