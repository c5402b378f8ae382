//! Behaviour of a full registration check against the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use regperiod::config::FieldsConfig;
use regperiod::errors::{RegPeriodError, RegPeriodResult};
use regperiod::evaluator::RegistrationWindow;
use regperiod::reconciler::reconcile;
use regperiod::store::{
    FieldId, MemoryStore, RegistrationInfo, RegistrationRow, RegistrationStore, UserId,
};
use regperiod::task::RegistrationPeriodTask;

const NOW: i64 = 1_760_000_000;

/// Store with both fields provisioned; returns `(store, start, end)`.
fn provisioned_store() -> (Arc<MemoryStore>, FieldId, FieldId) {
    let store = Arc::new(MemoryStore::new());
    let start = store.define_field("startreg").unwrap();
    let end = store.define_field("endreg").unwrap();
    (store, start, end)
}

fn add_user(
    store: &MemoryStore,
    id: UserId,
    suspended: bool,
    deleted: bool,
    start: Option<(FieldId, i64)>,
    end: Option<(FieldId, i64)>,
) {
    store.insert_user(id, suspended, deleted).unwrap();
    for (field, value) in start.into_iter().chain(end) {
        store.set_field_value(id, field, value).unwrap();
    }
}

async fn suspended(store: &MemoryStore, id: UserId) -> bool {
    store
        .get_suspended_and_deleted(id)
        .await
        .unwrap()
        .expect("user exists")
        .0
}

fn task(store: &Arc<MemoryStore>) -> RegistrationPeriodTask<MemoryStore> {
    RegistrationPeriodTask::new(Arc::clone(store), FieldsConfig::default())
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn registration_scenarios() {
    let (store, s, e) = provisioned_store();

    // (id, start, end, expected suspension)
    let cases = [
        (1, Some(NOW - 1000), Some(NOW + 1000), false),
        (2, Some(NOW - 2000), Some(NOW - 1000), true),
        (3, Some(NOW + 1000), Some(NOW + 2000), true),
        (4, None, Some(NOW - 2000), true),
        (5, Some(NOW - 2000), None, false),
        (6, None, Some(NOW + 2000), false),
        (7, Some(NOW + 2000), None, true),
    ];

    for (id, start, end, _) in cases {
        add_user(&store, id, false, false, start.map(|v| (s, v)), end.map(|v| (e, v)));
    }

    task(&store).execute_at(NOW).await.unwrap();

    for (id, _, _, expected) in cases {
        assert_eq!(suspended(&store, id).await, expected, "user {id}");
    }
}

#[tokio::test]
async fn users_without_bounds_are_never_touched() {
    let (store, s, e) = provisioned_store();
    add_user(&store, 1, true, false, None, None);
    add_user(&store, 2, true, false, Some((s, 0)), Some((e, 0)));
    add_user(&store, 3, false, false, Some((s, 0)), None);

    let report = task(&store).execute_at(NOW).await.unwrap();

    assert_eq!(report.candidates, 0);
    assert_eq!(store.write_count().unwrap(), 0);
    assert!(suspended(&store, 1).await);
    assert!(suspended(&store, 2).await);
    assert!(!suspended(&store, 3).await);
}

#[tokio::test]
async fn single_bound_properties_hold_around_now() {
    let (store, s, e) = provisioned_store();
    let offsets = [-3600, -1, 0, 1, 3600];

    let mut id = 0;
    let mut expected = Vec::new();
    for offset in offsets {
        for initially_suspended in [false, true] {
            id += 1;
            add_user(&store, id, initially_suspended, false, Some((s, NOW + offset)), None);
            expected.push((id, NOW < NOW + offset));

            id += 1;
            add_user(&store, id, initially_suspended, false, None, Some((e, NOW + offset)));
            expected.push((id, NOW > NOW + offset));
        }
    }

    task(&store).execute_at(NOW).await.unwrap();

    for (id, want) in expected {
        assert_eq!(suspended(&store, id).await, want, "user {id}");
    }
}

// ============================================================================
// Write policy
// ============================================================================

#[tokio::test]
async fn second_run_issues_no_writes() {
    let (store, s, e) = provisioned_store();
    add_user(&store, 1, false, false, Some((s, NOW + 10)), None);
    add_user(&store, 2, true, false, None, Some((e, NOW + 10)));
    add_user(&store, 3, false, false, Some((s, NOW - 10)), Some((e, NOW - 5)));

    let first = task(&store).execute_at(NOW).await.unwrap();
    assert_eq!(first.writes(), 3);
    let writes_after_first = store.write_count().unwrap();

    let second = task(&store).execute_at(NOW).await.unwrap();
    assert_eq!(second.writes(), 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(store.write_count().unwrap(), writes_after_first);
}

#[tokio::test]
async fn deleted_users_are_never_written() {
    let (store, s, e) = provisioned_store();
    add_user(&store, 1, false, true, Some((s, NOW + 100)), None);
    add_user(&store, 2, true, true, Some((s, NOW - 100)), Some((e, NOW + 100)));

    let report = task(&store).execute_at(NOW).await.unwrap();

    assert_eq!(report.skipped_deleted, 2);
    assert_eq!(store.write_count().unwrap(), 0);
    assert_eq!(
        store.get_suspended_and_deleted(1).await.unwrap(),
        Some((false, true))
    );
    assert_eq!(
        store.get_suspended_and_deleted(2).await.unwrap(),
        Some((true, true))
    );
}

#[tokio::test]
async fn registration_values_are_left_alone() {
    let (store, s, e) = provisioned_store();
    add_user(&store, 1, true, false, Some((s, NOW - 100)), Some((e, NOW + 100)));

    task(&store).execute_at(NOW).await.unwrap();

    assert!(!suspended(&store, 1).await);
    assert_eq!(
        store.get_registration_info(1, Some(s), Some(e)).await.unwrap(),
        RegistrationInfo {
            start: Some(NOW - 100),
            end: Some(NOW + 100)
        }
    );
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn rejected_write_does_not_stop_the_run() {
    let (store, _s, e) = provisioned_store();
    for id in 1..=3 {
        add_user(&store, id, false, false, None, Some((e, NOW - 100)));
    }
    store.reject_writes_for(2).unwrap();

    let report = task(&store).execute_at(NOW).await.unwrap();

    assert_eq!(report.suspended, 2);
    assert_eq!(report.failed, 1);
    assert!(!report.is_clean());
    assert!(suspended(&store, 1).await);
    assert!(!suspended(&store, 2).await);
    assert!(suspended(&store, 3).await);
}

#[tokio::test]
async fn offline_store_fails_the_run() {
    let (store, _s, e) = provisioned_store();
    add_user(&store, 1, false, false, None, Some((e, NOW - 100)));
    store.set_offline(true).unwrap();

    let err = task(&store).execute_at(NOW).await.unwrap_err();
    assert!(matches!(err, RegPeriodError::ConnectionError(_)));

    store.set_offline(false).unwrap();
    assert!(!suspended(&store, 1).await);
}

/// Loses its connection after a fixed number of writes.
struct DroppingStore {
    inner: MemoryStore,
    writes_left: AtomicUsize,
}

#[async_trait]
impl RegistrationStore for DroppingStore {
    async fn lookup_field_id(&self, shortname: &str) -> RegPeriodResult<Option<FieldId>> {
        self.inner.lookup_field_id(shortname).await
    }

    async fn load_registration_rows(
        &self,
        start_field: Option<FieldId>,
        end_field: Option<FieldId>,
    ) -> RegPeriodResult<Vec<RegistrationRow>> {
        self.inner.load_registration_rows(start_field, end_field).await
    }

    async fn set_suspended(&self, user_id: UserId, suspended: bool) -> RegPeriodResult<bool> {
        let left = self.writes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(RegPeriodError::ConnectionError("connection reset".into()));
        }
        self.writes_left.store(left - 1, Ordering::SeqCst);
        self.inner.set_suspended(user_id, suspended).await
    }

    async fn get_suspended_and_deleted(
        &self,
        user_id: UserId,
    ) -> RegPeriodResult<Option<(bool, bool)>> {
        self.inner.get_suspended_and_deleted(user_id).await
    }

    async fn get_registration_info(
        &self,
        user_id: UserId,
        start_field: Option<FieldId>,
        end_field: Option<FieldId>,
    ) -> RegPeriodResult<RegistrationInfo> {
        self.inner
            .get_registration_info(user_id, start_field, end_field)
            .await
    }
}

async fn load(store: &DroppingStore, end: FieldId) -> Vec<RegistrationWindow> {
    store
        .load_registration_rows(None, Some(end))
        .await
        .unwrap()
        .into_iter()
        .map(RegistrationWindow::from)
        .collect()
}

#[tokio::test]
async fn connection_loss_mid_run_aborts_and_rerun_recovers() {
    let store = DroppingStore {
        inner: MemoryStore::new(),
        writes_left: AtomicUsize::new(1),
    };
    let end = store.inner.define_field("endreg").unwrap();
    for id in 1..=3 {
        add_user(&store.inner, id, false, false, None, Some((end, NOW - 100)));
    }

    let err = reconcile(&store, NOW, &load(&store, end).await)
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(store.inner.write_count().unwrap(), 1);

    store.writes_left.store(usize::MAX, Ordering::SeqCst);
    let report = reconcile(&store, NOW, &load(&store, end).await)
        .await
        .unwrap();

    // The user written before the failure is already correct.
    assert_eq!(report.suspended, 2);
    assert_eq!(report.unchanged, 1);
    for id in 1..=3 {
        assert!(suspended(&store.inner, id).await);
    }
}
