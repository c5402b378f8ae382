//! The registration period check, as invoked by a scheduler.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, info_span, Instrument};

use crate::config::FieldsConfig;
use crate::errors::RegPeriodResult;
use crate::fields::resolve_fields;
use crate::loader::load_candidates;
use crate::reconciler::{reconcile, ReconcileReport};
use crate::store::RegistrationStore;

/// Human-readable task name.
pub const TASK_NAME: &str = "Check registration periods";

/// Suspends users outside their registration period and reactivates users inside it.
///
/// Holds no state between runs.
pub struct RegistrationPeriodTask<S: ?Sized> {
    store: Arc<S>,
    fields: FieldsConfig,
}

impl<S> RegistrationPeriodTask<S>
where
    S: RegistrationStore + ?Sized,
{
    pub fn new(store: Arc<S>, fields: FieldsConfig) -> Self {
        Self { store, fields }
    }

    pub fn name(&self) -> &'static str {
        TASK_NAME
    }

    /// Run one check against the current time.
    pub async fn execute(&self) -> RegPeriodResult<ReconcileReport> {
        self.execute_at(Utc::now().timestamp()).await
    }

    /// Run one check with every user judged against `now` (Unix seconds).
    pub async fn execute_at(&self, now: i64) -> RegPeriodResult<ReconcileReport> {
        let span = info_span!("registration_check", now = now);

        async move {
            let fields = resolve_fields(&*self.store, &self.fields).await?;
            let candidates = load_candidates(&*self.store, fields).await?;
            let report = reconcile(&*self.store, now, &candidates).await?;

            if report.writes() > 0 || !report.is_clean() {
                info!(%report, "Registration check completed");
            } else {
                debug!(%report, "Registration check completed");
            }

            Ok(report)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn task_has_readable_name() {
        let store = Arc::new(MemoryStore::new());
        let task = RegistrationPeriodTask::new(store, FieldsConfig::default());
        assert_eq!(task.name(), "Check registration periods");
    }

    #[tokio::test]
    async fn unconfigured_store_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(1, true, false).unwrap();

        let task = RegistrationPeriodTask::new(Arc::clone(&store), FieldsConfig::default());
        let report = task.execute().await.unwrap();

        assert_eq!(report, ReconcileReport::default());
        assert_eq!(store.bulk_query_count().unwrap(), 0);
        assert_eq!(
            store.get_suspended_and_deleted(1).await.unwrap(),
            Some((true, false))
        );
    }
}
