//! Configuration system for regperiod.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `regperiod.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `REGPERIOD_DATABASE_TYPE` - `sqlite` or `postgres`
//! - `REGPERIOD_DATABASE_URL` - Database connection URL (routed by scheme)
//! - `REGPERIOD_MAX_CONNECTIONS` - Connection pool size
//! - `REGPERIOD_START_FIELD` - Shortname of the registration start field
//! - `REGPERIOD_END_FIELD` - Shortname of the registration end field
//! - `REGPERIOD_JOB_CRON` - Cron expression for the scheduled check
//! - `REGPERIOD_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::{Config, ConfigBuilder};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::sync::OnceLock;

use crate::errors::{RegPeriodError, RegPeriodResult};

/// Global configuration singleton.
static CONFIG: OnceLock<RegPeriodConfig> = OnceLock::new();

/// Default shortname of the custom field holding the registration start.
pub const DEFAULT_START_SHORTNAME: &str = "startreg";
/// Default shortname of the custom field holding the registration end.
pub const DEFAULT_END_SHORTNAME: &str = "endreg";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegPeriodConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Custom field shortnames
    pub fields: FieldsConfig,
    /// Scheduled job configuration
    pub job: JobConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://regperiod.db".to_string(),
            postgres_url: "postgres://localhost/regperiod".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// The connection URL matching `db_type`.
    pub fn url(&self) -> &str {
        match self.db_type.as_str() {
            "postgres" => &self.postgres_url,
            _ => &self.sqlite_url,
        }
    }
}

/// Shortnames identifying the two registration boundary fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    pub start_shortname: String,
    pub end_shortname: String,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            start_shortname: DEFAULT_START_SHORTNAME.to_string(),
            end_shortname: DEFAULT_END_SHORTNAME.to_string(),
        }
    }
}

/// Scheduled job configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Cron expression for the registration check (default: every 15 minutes)
    pub cron: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            cron: "0 */15 * * * *".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn config_err(e: config::ConfigError) -> RegPeriodError {
    RegPeriodError::ConfigError(e.to_string())
}

impl RegPeriodConfig {
    fn defaults() -> RegPeriodResult<ConfigBuilder<config::builder::DefaultState>> {
        let defaults = Self::default();
        Config::builder()
            .set_default("database.db_type", defaults.database.db_type)
            .map_err(config_err)?
            .set_default("database.sqlite_url", defaults.database.sqlite_url)
            .map_err(config_err)?
            .set_default("database.postgres_url", defaults.database.postgres_url)
            .map_err(config_err)?
            .set_default(
                "database.max_connections",
                i64::from(defaults.database.max_connections),
            )
            .map_err(config_err)?
            .set_default("fields.start_shortname", defaults.fields.start_shortname)
            .map_err(config_err)?
            .set_default("fields.end_shortname", defaults.fields.end_shortname)
            .map_err(config_err)?
            .set_default("job.cron", defaults.job.cron)
            .map_err(config_err)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_err)
    }

    fn with_env_overrides(
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> RegPeriodResult<ConfigBuilder<config::builder::DefaultState>> {
        builder
            .set_override_option("database.db_type", env::var("REGPERIOD_DATABASE_TYPE").ok())
            .map_err(config_err)?
            .set_override_option(
                "database.sqlite_url",
                env::var("REGPERIOD_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.postgres_url",
                env::var("REGPERIOD_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.max_connections",
                env::var("REGPERIOD_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("fields.start_shortname", env::var("REGPERIOD_START_FIELD").ok())
            .map_err(config_err)?
            .set_override_option("fields.end_shortname", env::var("REGPERIOD_END_FIELD").ok())
            .map_err(config_err)?
            .set_override_option("job.cron", env::var("REGPERIOD_JOB_CRON").ok())
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("REGPERIOD_LOG_LEVEL").ok())
            .map_err(config_err)
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> RegPeriodResult<Self> {
        let settings = Self::with_env_overrides(builder)?
            .build()
            .map_err(|e| RegPeriodError::ConfigError(format!("failed to build config: {e}")))?;

        let config: Self = settings.try_deserialize().map_err(|e| {
            RegPeriodError::ConfigError(format!("failed to deserialize config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `regperiod.toml` (optional) and the environment.
    pub fn load() -> RegPeriodResult<Self> {
        let builder = Self::defaults()?
            .add_source(config::File::with_name("regperiod").required(false));
        Self::build(builder)
    }

    /// Load configuration from an explicit file, still honouring environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> RegPeriodResult<Self> {
        let builder = Self::defaults()?.add_source(config::File::from(path.as_ref()));
        Self::build(builder)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> RegPeriodResult<()> {
        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(RegPeriodError::ConfigError(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }

        if self.database.max_connections == 0 {
            return Err(RegPeriodError::ConfigError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        let start = self.fields.start_shortname.trim();
        let end = self.fields.end_shortname.trim();
        if start.is_empty() || end.is_empty() {
            return Err(RegPeriodError::ConfigError(
                "fields.start_shortname and fields.end_shortname cannot be empty".to_string(),
            ));
        }
        if start == end {
            return Err(RegPeriodError::ConfigError(format!(
                "fields.start_shortname and fields.end_shortname must differ, both are '{start}'"
            )));
        }

        if self.job.cron.trim().is_empty() {
            return Err(RegPeriodError::ConfigError(
                "job.cron cannot be empty".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(RegPeriodError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
pub fn get_config() -> RegPeriodResult<&'static RegPeriodConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = RegPeriodConfig::load()?;

    // Another thread may have won the race; either value is valid.
    let _ = CONFIG.set(config);

    CONFIG
        .get()
        .ok_or_else(|| RegPeriodError::ConfigError("configuration not initialised".to_string()))
}
