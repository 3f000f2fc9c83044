//! Audit trail for gate decisions and executions
//!
//! The enforcer reports through an [`AuditSink`] handed to it at construction.
//! [`LogAuditSink`] writes to the `log` facade under a dedicated target so the audit
//! stream can be filtered separately (`RUST_LOG=readonly_sql_gate::audit=info`).

use crate::error::GateError;
use crate::gate::{ApprovedQuery, Rejection};

/// Log target used by [`LogAuditSink`]
pub const AUDIT_TARGET: &str = "readonly_sql_gate::audit";

/// Receiver of security-relevant events
pub trait AuditSink: Send + Sync {
    /// A statement was rejected by the gate and never executed
    fn rejected(&self, sql: &str, rejection: &Rejection);

    /// A statement was accepted and is about to execute
    fn accepted(&self, query: &ApprovedQuery);

    /// An accepted statement failed in the engine
    fn execution_failed(&self, sql: &str, error: &GateError);

    /// The caller cancelled an accepted statement while it was running
    fn cancelled(&self, sql: &str);
}

/// Audit sink backed by the `log` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn rejected(&self, sql: &str, rejection: &Rejection) {
        log::warn!(
            target: AUDIT_TARGET,
            "Blocked unsafe query attempt: kind={} detail=\"{}\" diagnostic=\"{}\" query={:?}",
            rejection.kind(),
            rejection.detail(),
            rejection.diagnostic().unwrap_or("-"),
            sql
        );
    }

    fn accepted(&self, query: &ApprovedQuery) {
        log::info!(target: AUDIT_TARGET, "Executing safe query: {:?}", query.sql());
    }

    fn execution_failed(&self, sql: &str, error: &GateError) {
        log::warn!(
            target: AUDIT_TARGET,
            "Query execution failed: {} query={:?}",
            error,
            sql
        );
    }

    fn cancelled(&self, sql: &str) {
        log::warn!(target: AUDIT_TARGET, "Query cancelled by caller: {:?}", sql);
    }
}
