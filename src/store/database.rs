use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar};
use std::sync::Arc;
use tracing::error;

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

#[cfg(feature = "postgres")]
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::{get_config, DatabaseConfig};
use crate::errors::{RegPeriodError, RegPeriodResult};

use super::{FieldId, RegistrationInfo, RegistrationRow, RegistrationStore, UserId};

/// Users holding a positive value for at least one of the two fields, one row each.
///
/// A NULL field id never matches its join, so an unprovisioned field contributes
/// nothing.
#[cfg(feature = "sqlite")]
const SQLITE_LOAD_REGISTRATIONS: &str = r#"
    SELECT
        u.id          AS user_id,
        u.suspended   AS suspended,
        u.deleted     AS deleted,
        MAX(s.data)   AS start_value,
        MAX(e.data)   AS end_value
    FROM users u
    LEFT JOIN user_info_data s ON s.userid = u.id AND s.fieldid = ?
    LEFT JOIN user_info_data e ON e.userid = u.id AND e.fieldid = ?
    WHERE s.data > 0 OR e.data > 0
    GROUP BY u.id, u.suspended, u.deleted
    ORDER BY u.id
"#;

#[cfg(feature = "postgres")]
const POSTGRES_LOAD_REGISTRATIONS: &str = r#"
    SELECT
        u.id          AS user_id,
        u.suspended   AS suspended,
        u.deleted     AS deleted,
        MAX(s.data)   AS start_value,
        MAX(e.data)   AS end_value
    FROM users u
    LEFT JOIN user_info_data s ON s.userid = u.id AND s.fieldid = $1
    LEFT JOIN user_info_data e ON e.userid = u.id AND e.fieldid = $2
    WHERE s.data > 0 OR e.data > 0
    GROUP BY u.id, u.suspended, u.deleted
    ORDER BY u.id
"#;

#[cfg(feature = "sqlite")]
const SQLITE_REGISTRATION_INFO: &str = r#"
    SELECT
        (SELECT MAX(data) FROM user_info_data WHERE userid = ? AND fieldid = ?) AS start_value,
        (SELECT MAX(data) FROM user_info_data WHERE userid = ? AND fieldid = ?) AS end_value
"#;

#[cfg(feature = "postgres")]
const POSTGRES_REGISTRATION_INFO: &str = r#"
    SELECT
        (SELECT MAX(data) FROM user_info_data WHERE userid = $1 AND fieldid = $2) AS start_value,
        (SELECT MAX(data) FROM user_info_data WHERE userid = $1 AND fieldid = $3) AS end_value
"#;

/// Database-backed user directory over SQLite or Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
///
/// Expected tables (provisioned outside this crate):
/// - `users(id, suspended, deleted)`
/// - `user_info_field(id, shortname)`
/// - `user_info_data(id, userid, fieldid, data)`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl Database {
    /// Connect using the global configuration.
    pub async fn new() -> RegPeriodResult<Arc<Self>> {
        let config = get_config()?;
        Ok(Arc::new(Self::connect(&config.database).await?))
    }

    /// Connect using an explicit database configuration.
    pub async fn connect(db_config: &DatabaseConfig) -> RegPeriodResult<Self> {
        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .connect(db_config.url())
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        RegPeriodError::ConnectionError(format!(
                            "failed to connect to SQLite: {e}"
                        ))
                    })?;

                Ok(Database::SQLite(pool))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(RegPeriodError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .connect(db_config.url())
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        RegPeriodError::ConnectionError(format!(
                            "failed to connect to PostgreSQL: {e}"
                        ))
                    })?;

                Ok(Database::Postgres(pool))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(RegPeriodError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(RegPeriodError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Backend name, for logging.
    pub fn db_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }
}

fn db_err(op: &str, e: sqlx::Error) -> RegPeriodError {
    error!("{op} failed: {e}");
    RegPeriodError::from_sqlx(op, e)
}

#[async_trait]
impl RegistrationStore for Database {
    async fn lookup_field_id(&self, shortname: &str) -> RegPeriodResult<Option<FieldId>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_scalar::<_, i64>(
                "SELECT id FROM user_info_field WHERE shortname = ? ORDER BY id LIMIT 1",
            )
            .bind(shortname)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_err("lookup_field_id", e)),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar::<_, i64>(
                "SELECT id FROM user_info_field WHERE shortname = $1 ORDER BY id LIMIT 1",
            )
            .bind(shortname)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_err("lookup_field_id", e)),
        }
    }

    async fn load_registration_rows(
        &self,
        start_field: Option<FieldId>,
        end_field: Option<FieldId>,
    ) -> RegPeriodResult<Vec<RegistrationRow>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, RegistrationRow>(SQLITE_LOAD_REGISTRATIONS)
                .bind(start_field)
                .bind(end_field)
                .fetch_all(pool)
                .await
                .map_err(|e| db_err("load_registration_rows", e)),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query_as::<_, RegistrationRow>(POSTGRES_LOAD_REGISTRATIONS)
                    .bind(start_field)
                    .bind(end_field)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| db_err("load_registration_rows", e))
            }
        }
    }

    async fn set_suspended(&self, user_id: UserId, suspended: bool) -> RegPeriodResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query("UPDATE users SET suspended = ? WHERE id = ?")
                .bind(suspended)
                .bind(user_id)
                .execute(pool)
                .await
                .map_err(|e| db_err("set_suspended", e))?
                .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("UPDATE users SET suspended = $1 WHERE id = $2")
                .bind(suspended)
                .bind(user_id)
                .execute(pool)
                .await
                .map_err(|e| db_err("set_suspended", e))?
                .rows_affected(),
        };

        Ok(rows_affected > 0)
    }

    async fn get_suspended_and_deleted(
        &self,
        user_id: UserId,
    ) -> RegPeriodResult<Option<(bool, bool)>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query_as::<_, (bool, bool)>("SELECT suspended, deleted FROM users WHERE id = ?")
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| db_err("get_suspended_and_deleted", e))
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query_as::<_, (bool, bool)>("SELECT suspended, deleted FROM users WHERE id = $1")
                    .bind(user_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| db_err("get_suspended_and_deleted", e))
            }
        }
    }

    async fn get_registration_info(
        &self,
        user_id: UserId,
        start_field: Option<FieldId>,
        end_field: Option<FieldId>,
    ) -> RegPeriodResult<RegistrationInfo> {
        let (start, end) = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query_as::<_, (Option<i64>, Option<i64>)>(SQLITE_REGISTRATION_INFO)
                    .bind(user_id)
                    .bind(start_field)
                    .bind(user_id)
                    .bind(end_field)
                    .fetch_one(pool)
                    .await
                    .map_err(|e| db_err("get_registration_info", e))?
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query_as::<_, (Option<i64>, Option<i64>)>(POSTGRES_REGISTRATION_INFO)
                    .bind(user_id)
                    .bind(start_field)
                    .bind(end_field)
                    .fetch_one(pool)
                    .await
                    .map_err(|e| db_err("get_registration_info", e))?
            }
        };

        Ok(RegistrationInfo { start, end })
    }
}
