//! Validation decisions and the capability token they carry

use serde::Serialize;
use thiserror::Error;

/// Closed taxonomy of rejection reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    /// Text could not be parsed, or contained no statement at all
    SyntaxError,
    /// Top-level statement is not a single read query
    DisallowedStatementType,
    /// FOR UPDATE / FOR SHARE and friends
    LockingClausePresent,
    /// Read-shaped statement that creates or mutates persistent state
    WriteThroughConstruct,
    /// More than one statement in one input
    MultiStatementInput,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyntaxError => "SyntaxError",
            Self::DisallowedStatementType => "DisallowedStatementType",
            Self::LockingClausePresent => "LockingClausePresent",
            Self::WriteThroughConstruct => "WriteThroughConstruct",
            Self::MultiStatementInput => "MultiStatementInput",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected statement: the violation kind plus a caller-safe detail.
///
/// `diagnostic` holds internal text (parser messages) destined for the audit log only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct Rejection {
    kind: ViolationKind,
    detail: String,
    diagnostic: Option<String>,
}

impl Rejection {
    pub fn new(kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    pub fn kind(&self) -> ViolationKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }
}

/// Proof that a piece of SQL text passed the gate.
///
/// Only the gate can construct one, and the execution engine only accepts SQL in
/// this form. [`crate::engine::QueryEngine::fetch_readonly`] takes it by value and
/// it is not `Clone`, so each acceptance authorizes one execution.
///
/// ```compile_fail
/// # use readonly_sql_gate::{DatabaseType, validate};
/// let approved = validate("SELECT 1", DatabaseType::Postgres).into_result().unwrap();
/// let again = approved.clone();
/// ```
///
/// ```compile_fail
/// # use readonly_sql_gate::ApprovedQuery;
/// let forged = ApprovedQuery::new("DELETE FROM users");
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct ApprovedQuery {
    sql: String,
}

impl ApprovedQuery {
    pub(in crate::gate) fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    /// The exact text that was validated
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Outcome of [`crate::gate::validate`].
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationDecision {
    Accepted(ApprovedQuery),
    Rejected(Rejection),
}

impl ValidationDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    pub fn into_result(self) -> Result<ApprovedQuery, Rejection> {
        match self {
            Self::Accepted(approved) => Ok(approved),
            Self::Rejected(rejection) => Err(rejection),
        }
    }
}
