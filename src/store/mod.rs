// src/store/mod.rs

//! Storage seam for the registration period job.
//!
//! This module contains:
//! - `RegistrationStore` → the operations the job needs from the user directory
//! - `database`          → sqlx implementation over SQLite/Postgres
//! - `memory`            → in-memory implementation for tests and dry runs

use async_trait::async_trait;
use sqlx::FromRow;

use crate::errors::RegPeriodResult;

pub mod database;
pub mod memory;

pub use database::Database;
pub use memory::MemoryStore;

/// Identifier of a user record.
pub type UserId = i64;
/// Identifier of a custom field definition.
pub type FieldId = i64;

/// One row of the bulk registration query.
///
/// Values are returned as stored; non-positive values are still present here and
/// are normalised by the loader.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RegistrationRow {
    pub user_id: UserId,
    pub suspended: bool,
    pub deleted: bool,
    pub start_value: Option<i64>,
    pub end_value: Option<i64>,
}

/// Raw registration values stored for a single user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationInfo {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// Operations the registration period job performs against the user directory.
///
/// Implementations surface connectivity problems as
/// [`RegPeriodError::ConnectionError`](crate::errors::RegPeriodError::ConnectionError)
/// and rejected statements as
/// [`RegPeriodError::DatabaseError`](crate::errors::RegPeriodError::DatabaseError).
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Look up a custom field definition by shortname.
    async fn lookup_field_id(&self, shortname: &str) -> RegPeriodResult<Option<FieldId>>;

    /// Fetch every user holding a positive value for at least one of the given fields,
    /// one row per user.
    async fn load_registration_rows(
        &self,
        start_field: Option<FieldId>,
        end_field: Option<FieldId>,
    ) -> RegPeriodResult<Vec<RegistrationRow>>;

    /// Set the suspension flag of a user.
    ///
    /// Returns `Ok(false)` when no user row was updated.
    async fn set_suspended(&self, user_id: UserId, suspended: bool) -> RegPeriodResult<bool>;

    /// Read back `(suspended, deleted)` for a user, `None` if the user does not exist.
    async fn get_suspended_and_deleted(
        &self,
        user_id: UserId,
    ) -> RegPeriodResult<Option<(bool, bool)>>;

    /// Read the raw start/end values of a user for the given fields.
    async fn get_registration_info(
        &self,
        user_id: UserId,
        start_field: Option<FieldId>,
        end_field: Option<FieldId>,
    ) -> RegPeriodResult<RegistrationInfo>;
}
