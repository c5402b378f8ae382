//! Applies suspension decisions to the store.

use tracing::debug;

use crate::errors::RegPeriodResult;
use crate::evaluator::{decide, Decision, RegistrationWindow};
use crate::logging::{log_suspension_event, SuspensionEvent};
use crate::store::RegistrationStore;

/// Outcome counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub candidates: usize,
    pub skipped_deleted: usize,
    pub suspended: usize,
    pub reactivated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl ReconcileReport {
    /// Number of flags actually written.
    pub fn writes(&self) -> usize {
        self.suspended + self.reactivated
    }

    /// No per-user write failed.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} candidates: {} suspended, {} reactivated, {} unchanged, {} deleted skipped, {} failed",
            self.candidates,
            self.suspended,
            self.reactivated,
            self.unchanged,
            self.skipped_deleted,
            self.failed
        )
    }
}

/// Bring every candidate's suspension flag in line with its registration window.
///
/// All candidates are judged against the same `now`. Writes happen only on a
/// mismatch and touch nothing but the suspension flag. A rejected write is
/// counted and the run continues; a connectivity failure aborts the run.
pub async fn reconcile<S>(
    store: &S,
    now: i64,
    candidates: &[RegistrationWindow],
) -> RegPeriodResult<ReconcileReport>
where
    S: RegistrationStore + ?Sized,
{
    let mut report = ReconcileReport {
        candidates: candidates.len(),
        ..ReconcileReport::default()
    };

    for window in candidates {
        let decision = decide(now, window);

        let Some(target) = decision.target() else {
            if decision == Decision::SkipDeleted {
                report.skipped_deleted += 1;
                log_suspension_event(SuspensionEvent::SkippedDeleted, window.user_id, None);
            } else {
                report.unchanged += 1;
            }
            continue;
        };

        match store.set_suspended(window.user_id, target).await {
            Ok(true) => {
                let event = if target {
                    report.suspended += 1;
                    SuspensionEvent::Suspended
                } else {
                    report.reactivated += 1;
                    SuspensionEvent::Reactivated
                };
                log_suspension_event(event, window.user_id, None);
            }
            Ok(false) => {
                report.failed += 1;
                log_suspension_event(
                    SuspensionEvent::WriteFailed,
                    window.user_id,
                    Some("user no longer exists"),
                );
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                report.failed += 1;
                log_suspension_event(
                    SuspensionEvent::WriteFailed,
                    window.user_id,
                    Some(&e.to_string()),
                );
            }
        }
    }

    debug!(%report, "Reconciliation finished");

    Ok(report)
}
