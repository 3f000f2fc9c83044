//! Service configuration from environment variables
//!
//! | Variable | Default |
//! |---|---|
//! | `DATABASE_URL` | required |
//! | `GATE_SCHEMA` | database default |
//! | `GATE_QUERY_TIMEOUT_SECS` | 60 |
//! | `GATE_METADATA_TIMEOUT_SECS` | 10 |
//! | `GATE_MAX_ROWS` | unlimited |
//! | `GATE_MAX_CONNECTIONS` | 5 |
//! | `GATE_MIN_CONNECTIONS` | 1 |
//! | `GATE_ACQUIRE_TIMEOUT_SECS` | 30 |

use crate::dsn::validate_dsn;
use crate::error::GateError;
use crate::types::DatabaseType;
use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;
use std::time::Duration;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const GATE_SCHEMA: &str = "GATE_SCHEMA";
pub const GATE_QUERY_TIMEOUT_SECS: &str = "GATE_QUERY_TIMEOUT_SECS";
pub const GATE_METADATA_TIMEOUT_SECS: &str = "GATE_METADATA_TIMEOUT_SECS";
pub const GATE_MAX_ROWS: &str = "GATE_MAX_ROWS";
pub const GATE_MAX_CONNECTIONS: &str = "GATE_MAX_CONNECTIONS";
pub const GATE_MIN_CONNECTIONS: &str = "GATE_MIN_CONNECTIONS";
pub const GATE_ACQUIRE_TIMEOUT_SECS: &str = "GATE_ACQUIRE_TIMEOUT_SECS";

#[derive(Debug)]
pub struct GateConfig {
    /// Connection string (credentials inside, never logged)
    pub database_url: SecretString,
    pub db_type: DatabaseType,
    /// Schema for introspection; `None` uses the database default
    pub schema: Option<String>,
    pub query_timeout: Duration,
    pub metadata_timeout: Duration,
    pub max_rows: Option<usize>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl GateConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    /// `GateError::Configuration` when `DATABASE_URL` is missing or invalid, or a
    /// numeric variable does not parse
    pub fn from_env() -> Result<Self, GateError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get(DATABASE_URL).ok_or_else(|| {
            GateError::Configuration(format!("{} environment variable is required", DATABASE_URL))
        })?;
        let db_type = validate_dsn(&database_url)?;

        let max_connections = parse_var(&get, GATE_MAX_CONNECTIONS)?.unwrap_or(5u32);
        let min_connections = parse_var(&get, GATE_MIN_CONNECTIONS)?.unwrap_or(1u32);
        if max_connections == 0 {
            return Err(GateError::Configuration(format!(
                "{} must be at least 1",
                GATE_MAX_CONNECTIONS
            )));
        }
        if min_connections > max_connections {
            return Err(GateError::Configuration(format!(
                "{} ({}) cannot exceed {} ({})",
                GATE_MIN_CONNECTIONS, min_connections, GATE_MAX_CONNECTIONS, max_connections
            )));
        }

        let max_rows = parse_var::<usize>(&get, GATE_MAX_ROWS)?;
        if max_rows == Some(0) {
            return Err(GateError::Configuration(format!(
                "{} must be at least 1",
                GATE_MAX_ROWS
            )));
        }

        Ok(Self {
            database_url: SecretString::from(database_url),
            db_type,
            schema: get(GATE_SCHEMA),
            query_timeout: seconds(&get, GATE_QUERY_TIMEOUT_SECS, 60)?,
            metadata_timeout: seconds(&get, GATE_METADATA_TIMEOUT_SECS, 10)?,
            max_rows,
            max_connections,
            min_connections,
            acquire_timeout: seconds(&get, GATE_ACQUIRE_TIMEOUT_SECS, 30)?,
        })
    }

    /// Connection string with the password masked
    pub fn safe_database_url(&self) -> String {
        crate::dsn::redact(self.database_url.expose_secret())
    }
}

fn parse_var<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, GateError> {
    get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                GateError::Configuration(format!("{} must be a non-negative integer, got '{}'", key, raw))
            })
        })
        .transpose()
}

fn seconds(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, GateError> {
    let secs = parse_var::<u64>(get, key)?.unwrap_or(default);
    if secs == 0 {
        return Err(GateError::Configuration(format!("{} must be at least 1", key)));
    }
    Ok(Duration::from_secs(secs))
}
