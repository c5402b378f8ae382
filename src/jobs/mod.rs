//! Background job scheduler for regperiod.
//!
//! Runs the registration period check on a cron schedule.
//! Requires the `background-jobs` feature to be enabled.
//!
//! # Usage
//!
//! ```rust,ignore
//! use regperiod::config::get_config;
//! use regperiod::jobs::JobScheduler;
//! use regperiod::store::Database;
//!
//! let config = get_config()?;
//! let db = Database::new().await?;
//! let scheduler = JobScheduler::new(db, config).await?;
//! scheduler.start().await?;
//! ```

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler as TokioJobScheduler};
use tracing::{error, info, warn};

use crate::config::RegPeriodConfig;
use crate::errors::{RegPeriodError, RegPeriodResult};
use crate::reconciler::ReconcileReport;
use crate::store::RegistrationStore;
use crate::task::RegistrationPeriodTask;

fn scheduler_err(e: impl std::fmt::Display) -> RegPeriodError {
    RegPeriodError::SchedulerError(e.to_string())
}

/// Cron-driven runner for [`RegistrationPeriodTask`].
///
/// A tick that fires while the previous run is still in progress is skipped.
pub struct JobScheduler<S: ?Sized> {
    scheduler: TokioJobScheduler,
    task: Arc<RegistrationPeriodTask<S>>,
    run_lock: Arc<Mutex<()>>,
    cron: String,
}

impl<S> JobScheduler<S>
where
    S: RegistrationStore + ?Sized + 'static,
{
    /// Create a new job scheduler.
    pub async fn new(store: Arc<S>, config: &RegPeriodConfig) -> RegPeriodResult<Self> {
        let scheduler = TokioJobScheduler::new().await.map_err(scheduler_err)?;

        Ok(Self {
            scheduler,
            task: Arc::new(RegistrationPeriodTask::new(store, config.fields.clone())),
            run_lock: Arc::new(Mutex::new(())),
            cron: config.job.cron.clone(),
        })
    }

    /// Register the registration check and start the scheduler.
    pub async fn start(&self) -> RegPeriodResult<()> {
        info!("Starting regperiod job scheduler");

        self.add_registration_job().await?;

        self.scheduler.start().await.map_err(scheduler_err)?;

        info!("regperiod job scheduler started successfully");

        Ok(())
    }

    /// Stop the job scheduler.
    pub async fn shutdown(&mut self) -> RegPeriodResult<()> {
        info!("Shutting down regperiod job scheduler");
        self.scheduler.shutdown().await.map_err(scheduler_err)
    }

    async fn add_registration_job(&self) -> RegPeriodResult<()> {
        let task = Arc::clone(&self.task);
        let run_lock = Arc::clone(&self.run_lock);

        let job = Job::new_async(self.cron.as_str(), move |_uuid, _l| {
            let task = Arc::clone(&task);
            let run_lock = Arc::clone(&run_lock);
            Box::pin(async move {
                let Ok(_guard) = run_lock.try_lock() else {
                    warn!("{} still running, skipping this tick", task.name());
                    return;
                };

                if let Err(e) = task.execute().await {
                    error!("{} failed: {}", task.name(), e);
                }
            })
        })
        .map_err(scheduler_err)?;

        self.scheduler.add(job).await.map_err(scheduler_err)?;

        info!(
            "Added registration period job (schedule: {})",
            self.cron
        );

        Ok(())
    }

    /// Run the check immediately, waiting for any scheduled run to finish first.
    pub async fn run_now(&self) -> RegPeriodResult<ReconcileReport> {
        let _guard = self.run_lock.lock().await;
        self.task.execute().await
    }
}
