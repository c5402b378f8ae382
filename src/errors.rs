//! Error types shared by the registration period job.

/// Errors raised while loading configuration, talking to the store, or scheduling.
#[derive(Debug, thiserror::Error)]
pub enum RegPeriodError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The store could not be reached at all (I/O, TLS, pool exhausted or closed).
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A single statement was rejected by the store.
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Scheduler error: {0}")]
    SchedulerError(String),
}

impl RegPeriodError {
    /// Whether this error must abort the current run instead of being recorded per user.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RegPeriodError::DatabaseError(_))
    }

    /// Classify a sqlx error raised by operation `op`.
    pub fn from_sqlx(op: &str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => {
                RegPeriodError::ConnectionError(format!("{op}: {err}"))
            }
            other => RegPeriodError::DatabaseError(format!("{op}: {other}")),
        }
    }
}

pub type RegPeriodResult<T> = Result<T, RegPeriodError>;
