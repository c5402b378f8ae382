//! Structured logging for regperiod.
//!
//! Output goes through `tracing`; [`init_logging`] installs a `tracing-subscriber`
//! fmt subscriber at the configured level. Per-user state changes are reported
//! with [`log_suspension_event`] so every change carries the same span fields.

use std::str::FromStr;

use tracing::{debug, info, info_span, warn, Level};

use crate::config::LoggingConfig;
use crate::errors::{RegPeriodError, RegPeriodResult};
use crate::store::UserId;

/// Suspension state change event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspensionEvent {
    /// User was suspended because it is outside its registration window
    Suspended,
    /// User was reactivated because it is back inside its registration window
    Reactivated,
    /// Writing the new flag failed
    WriteFailed,
    /// User is deleted and was left untouched
    SkippedDeleted,
}

impl std::fmt::Display for SuspensionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SuspensionEvent::Suspended => "suspended",
            SuspensionEvent::Reactivated => "reactivated",
            SuspensionEvent::WriteFailed => "write_failed",
            SuspensionEvent::SkippedDeleted => "skipped_deleted",
        };
        write!(f, "{}", s)
    }
}

/// Log a suspension state change for one user.
///
/// # Arguments
///
/// * `event` - The type of suspension event
/// * `user_id` - The affected user
/// * `details` - Optional additional details (e.g. the write error)
pub fn log_suspension_event(event: SuspensionEvent, user_id: UserId, details: Option<&str>) {
    let span = info_span!(
        "suspension_event",
        event = %event,
        user_id = %user_id,
    );
    let _enter = span.enter();

    match event {
        SuspensionEvent::WriteFailed => {
            if let Some(d) = details {
                warn!(reason = %d, "Suspension update failed");
            } else {
                warn!("Suspension update failed");
            }
        }
        SuspensionEvent::SkippedDeleted => {
            debug!("Deleted user left untouched");
        }
        _ => {
            if let Some(d) = details {
                info!(details = %d, "Suspension state changed");
            } else {
                info!("Suspension state changed");
            }
        }
    }
}

/// Parse a configured log level.
pub fn parse_level(level: &str) -> RegPeriodResult<Level> {
    Level::from_str(level.trim())
        .map_err(|_| RegPeriodError::ConfigError(format!("invalid log level '{level}'")))
}

/// Install the global fmt subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> RegPeriodResult<()> {
    let level = parse_level(&config.level)?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| RegPeriodError::ConfigError(format!("failed to initialise logging: {e}")))
}
