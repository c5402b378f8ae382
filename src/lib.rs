//! regperiod - registration period enforcement for user accounts
//!
//! Users may carry a registration start and/or end timestamp in two custom
//! profile fields (`startreg`, `endreg` by default). A periodic check suspends
//! every user outside that window and reactivates users inside it.
//!
//! # Features
//!
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//! - `background-jobs` - Cron scheduler around the check. Enabled by default.
//!
//! # Example
//!
//! ```rust,ignore
//! use regperiod::config::get_config;
//! use regperiod::store::Database;
//! use regperiod::task::RegistrationPeriodTask;
//!
//! let config = get_config()?;
//! let db = Database::new().await?;
//! let report = RegistrationPeriodTask::new(db, config.fields.clone()).execute().await?;
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod fields;
pub mod loader;
pub mod logging;
pub mod reconciler;
pub mod store;
pub mod task;

// Scheduler (requires "background-jobs" feature)
#[cfg(feature = "background-jobs")]
pub mod jobs;

pub use errors::{RegPeriodError, RegPeriodResult};
pub use evaluator::{desired_suspension, RegistrationWindow};
pub use reconciler::ReconcileReport;
pub use task::RegistrationPeriodTask;
