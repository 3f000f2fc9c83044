//! Error types for gate operations

use crate::gate::Rejection;
use std::time::Duration;
use thiserror::Error;

/// Gate operation errors
#[derive(Error, Debug)]
pub enum GateError {
    /// Missing or invalid startup configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Statement rejected by the validation gate
    #[error("Security violation: {0}")]
    Security(#[from] Rejection),

    /// Engine-level failure after acceptance
    #[error("Execution error: {0}")]
    Execution(String),

    /// Database table not found
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Operation exceeded its time budget
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: String,
        after: Duration,
    },

    /// Caller cancelled the request while it was executing
    #[error("Request cancelled")]
    Cancelled,

    /// Failed to connect to database
    #[error("Connection error: {0}")]
    Connection(String),

    /// sqlx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl GateError {
    pub fn is_security_violation(&self) -> bool {
        matches!(self, Self::Security(_))
    }

    /// Text returned to the calling agent.
    ///
    /// Rejections carry only their caller-safe detail; engine failures carry the
    /// engine's message.
    pub fn caller_message(&self) -> String {
        match self {
            Self::Security(rejection) => format!(
                "Security violation ({}): {}",
                rejection.kind(),
                rejection.detail()
            ),
            Self::Sqlx(sqlx::Error::Database(db_err)) => {
                format!("Query failed: {}", db_err.message())
            }
            Self::Sqlx(err) => format!("Query failed: {}", err),
            Self::Execution(msg) => format!("Query failed: {}", msg),
            other => other.to_string(),
        }
    }
}
