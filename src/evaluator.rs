//! Suspension decision rules.
//!
//! A user is expected to be active while `now` lies inside its registration
//! window. Either bound may be missing; a missing or non-positive bound places no
//! constraint on that side.

use crate::store::{RegistrationRow, UserId};

/// Registration state of one user, as loaded for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationWindow {
    pub user_id: UserId,
    pub is_deleted: bool,
    pub is_suspended: bool,
    /// Registration start, Unix seconds.
    pub start_epoch: Option<i64>,
    /// Registration end, Unix seconds.
    pub end_epoch: Option<i64>,
}

/// Zero is the "cleared" sentinel.
fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v > 0)
}

impl From<RegistrationRow> for RegistrationWindow {
    fn from(row: RegistrationRow) -> Self {
        Self {
            user_id: row.user_id,
            is_deleted: row.deleted,
            is_suspended: row.suspended,
            start_epoch: positive(row.start_value),
            end_epoch: positive(row.end_value),
        }
    }
}

impl RegistrationWindow {
    /// Whether at least one bound is set.
    pub fn has_constraint(&self) -> bool {
        positive(self.start_epoch).is_some() || positive(self.end_epoch).is_some()
    }

    pub fn is_before_start(&self, now: i64) -> bool {
        positive(self.start_epoch).is_some_and(|start| now < start)
    }

    pub fn is_after_end(&self, now: i64) -> bool {
        positive(self.end_epoch).is_some_and(|end| now > end)
    }
}

/// The suspension flag a user should carry at `now`.
pub fn desired_suspension(now: i64, window: &RegistrationWindow) -> bool {
    window.is_before_start(now) || window.is_after_end(now)
}

/// What the writer should do with one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Deleted accounts are never modified.
    SkipDeleted,
    /// Stored flag already matches.
    Unchanged,
    Suspend,
    Reactivate,
}

impl Decision {
    /// The flag to write, if any.
    pub fn target(self) -> Option<bool> {
        match self {
            Decision::Suspend => Some(true),
            Decision::Reactivate => Some(false),
            Decision::SkipDeleted | Decision::Unchanged => None,
        }
    }
}

pub fn decide(now: i64, window: &RegistrationWindow) -> Decision {
    if window.is_deleted {
        return Decision::SkipDeleted;
    }

    match (window.is_suspended, desired_suspension(now, window)) {
        (false, true) => Decision::Suspend,
        (true, false) => Decision::Reactivate,
        _ => Decision::Unchanged,
    }
}
