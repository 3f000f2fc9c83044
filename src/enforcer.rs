//! Execution enforcer: the validate-then-execute path
//!
//! [`ExecutionEnforcer::execute_safely`] is the only place caller-supplied SQL reaches an
//! engine. The engine accepts SQL only as an [`crate::gate::ApprovedQuery`], and only the
//! gate can produce one, so skipping validation does not type-check.

use crate::audit::AuditSink;
use crate::engine::QueryEngine;
use crate::error::GateError;
use crate::gate::{QueryGate, ValidationDecision};
use crate::normalize::normalize;
use crate::types::QueryResult;
use std::future::Future;
use std::sync::Arc;

pub struct ExecutionEnforcer {
    gate: QueryGate,
    engine: Arc<dyn QueryEngine>,
    audit: Arc<dyn AuditSink>,
    max_rows: Option<usize>,
}

impl ExecutionEnforcer {
    /// Build an enforcer whose gate uses the engine's SQL dialect
    pub fn new(engine: Arc<dyn QueryEngine>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            gate: QueryGate::new(engine.database_type()),
            engine,
            audit,
            max_rows: None,
        }
    }

    /// Cap the number of returned rows; capped results are flagged as truncated
    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn gate(&self) -> &QueryGate {
        &self.gate
    }

    /// Validate `sql` and, only if accepted, execute it read-only.
    ///
    /// # Errors
    /// * `GateError::Security` when the gate rejects the statement; the engine is not called
    /// * the engine's error when execution fails
    pub async fn execute_safely(&self, sql: &str) -> Result<QueryResult, GateError> {
        self.execute_safely_until(sql, std::future::pending()).await
    }

    /// [`Self::execute_safely`], abandoned when `cancelled` resolves first.
    ///
    /// On cancellation the in-flight engine future is dropped, which releases its
    /// connection, and `GateError::Cancelled` is returned.
    pub async fn execute_safely_until<C>(&self, sql: &str, cancelled: C) -> Result<QueryResult, GateError>
    where
        C: Future<Output = ()>,
    {
        let approved = match self.gate.validate(sql) {
            ValidationDecision::Accepted(approved) => approved,
            ValidationDecision::Rejected(rejection) => {
                self.audit.rejected(sql, &rejection);
                return Err(GateError::Security(rejection));
            }
        };

        self.audit.accepted(&approved);

        // The approval moves into the engine call; keep the text for the audit trail
        let sql = approved.sql().to_string();
        let outcome = tokio::select! {
            biased;
            _ = cancelled => None,
            result = self.engine.fetch_readonly(approved) => Some(result),
        };

        match outcome {
            None => {
                self.audit.cancelled(&sql);
                Err(GateError::Cancelled)
            }
            Some(Ok(raw)) => {
                let result = normalize(raw, self.max_rows);
                log::debug!(
                    "Query returned {} rows (truncated: {})",
                    result.row_count(),
                    result.is_truncated()
                );
                Ok(result)
            }
            Some(Err(e)) => {
                self.audit.execution_failed(&sql, &e);
                Err(e)
            }
        }
    }
}
