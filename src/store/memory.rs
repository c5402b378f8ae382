//! In-memory user directory.
//!
//! Mirrors the three tables the database store reads (`users`, `user_info_field`,
//! `user_info_data`) and supports injecting write and connectivity failures.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::errors::{RegPeriodError, RegPeriodResult};

use super::{FieldId, RegistrationInfo, RegistrationRow, RegistrationStore, UserId};

#[derive(Debug, Clone, Copy, Default)]
struct UserRecord {
    suspended: bool,
    deleted: bool,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, UserRecord>,
    fields: HashMap<String, FieldId>,
    next_field_id: FieldId,
    data: HashMap<(UserId, FieldId), i64>,
    rejected_writes: HashSet<UserId>,
    offline: bool,
    writes: usize,
    bulk_queries: usize,
}

/// Thread-safe in-memory implementation of [`RegistrationStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RegPeriodResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| {
            RegPeriodError::ConnectionError("failed to acquire memory store lock".into())
        })
    }

    fn online(&self) -> RegPeriodResult<MutexGuard<'_, State>> {
        let state = self.lock()?;
        if state.offline {
            return Err(RegPeriodError::ConnectionError(
                "memory store is offline".into(),
            ));
        }
        Ok(state)
    }

    /// Define a custom field, returning its id. Redefining a shortname returns the
    /// existing id.
    pub fn define_field(&self, shortname: &str) -> RegPeriodResult<FieldId> {
        let mut state = self.lock()?;
        if let Some(id) = state.fields.get(shortname) {
            return Ok(*id);
        }
        state.next_field_id += 1;
        let id = state.next_field_id;
        state.fields.insert(shortname.to_string(), id);
        Ok(id)
    }

    /// Insert or replace a user record.
    pub fn insert_user(
        &self,
        user_id: UserId,
        suspended: bool,
        deleted: bool,
    ) -> RegPeriodResult<()> {
        self.lock()?
            .users
            .insert(user_id, UserRecord { suspended, deleted });
        Ok(())
    }

    /// Store a custom field value for a user.
    pub fn set_field_value(
        &self,
        user_id: UserId,
        field: FieldId,
        value: i64,
    ) -> RegPeriodResult<()> {
        self.lock()?.data.insert((user_id, field), value);
        Ok(())
    }

    /// Make every future `set_suspended` for this user fail with a statement error.
    pub fn reject_writes_for(&self, user_id: UserId) -> RegPeriodResult<()> {
        self.lock()?.rejected_writes.insert(user_id);
        Ok(())
    }

    /// Simulate losing (or regaining) the connection to the store.
    pub fn set_offline(&self, offline: bool) -> RegPeriodResult<()> {
        self.lock()?.offline = offline;
        Ok(())
    }

    /// Number of successful suspension writes so far.
    pub fn write_count(&self) -> RegPeriodResult<usize> {
        Ok(self.lock()?.writes)
    }

    /// Number of bulk registration queries issued so far.
    pub fn bulk_query_count(&self) -> RegPeriodResult<usize> {
        Ok(self.lock()?.bulk_queries)
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn lookup_field_id(&self, shortname: &str) -> RegPeriodResult<Option<FieldId>> {
        Ok(self.online()?.fields.get(shortname).copied())
    }

    async fn load_registration_rows(
        &self,
        start_field: Option<FieldId>,
        end_field: Option<FieldId>,
    ) -> RegPeriodResult<Vec<RegistrationRow>> {
        let mut state = self.online()?;
        state.bulk_queries += 1;

        let value_of = |user_id: UserId, field: Option<FieldId>| {
            field.and_then(|f| state.data.get(&(user_id, f)).copied())
        };

        let rows = state
            .users
            .iter()
            .filter_map(|(&user_id, record)| {
                let start_value = value_of(user_id, start_field);
                let end_value = value_of(user_id, end_field);
                let matched =
                    start_value.is_some_and(|v| v > 0) || end_value.is_some_and(|v| v > 0);
                matched.then_some(RegistrationRow {
                    user_id,
                    suspended: record.suspended,
                    deleted: record.deleted,
                    start_value,
                    end_value,
                })
            })
            .collect();

        Ok(rows)
    }

    async fn set_suspended(&self, user_id: UserId, suspended: bool) -> RegPeriodResult<bool> {
        let mut state = self.online()?;
        if state.rejected_writes.contains(&user_id) {
            return Err(RegPeriodError::DatabaseError(format!(
                "set_suspended: write rejected for user {user_id}"
            )));
        }
        match state.users.get_mut(&user_id) {
            Some(record) => {
                record.suspended = suspended;
                state.writes += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_suspended_and_deleted(
        &self,
        user_id: UserId,
    ) -> RegPeriodResult<Option<(bool, bool)>> {
        Ok(self
            .online()?
            .users
            .get(&user_id)
            .map(|record| (record.suspended, record.deleted)))
    }

    async fn get_registration_info(
        &self,
        user_id: UserId,
        start_field: Option<FieldId>,
        end_field: Option<FieldId>,
    ) -> RegPeriodResult<RegistrationInfo> {
        let state = self.online()?;
        let value_of = |field: Option<FieldId>| {
            field.and_then(|f| state.data.get(&(user_id, f)).copied())
        };
        Ok(RegistrationInfo {
            start: value_of(start_field),
            end: value_of(end_field),
        })
    }
}
