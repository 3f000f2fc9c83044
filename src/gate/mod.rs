//! Validation gate: the single accept/reject decision for caller-supplied SQL
//!
//! Parsing, classification and deep inspection are composed into [`validate`], a pure
//! function of the SQL text and the dialect. An accepted decision carries an
//! [`ApprovedQuery`], the only form in which SQL text can reach the execution engine.

pub mod classifier;
pub mod decision;
pub mod inspector;

pub use decision::{ApprovedQuery, Rejection, ValidationDecision, ViolationKind};
pub use inspector::is_allowed_routine;

use crate::sql_parser::{TokenScan, parse_statements, scan_tokens};
use crate::types::DatabaseType;

/// Validate raw SQL text against the read-only policy.
///
/// On acceptance the original text is returned unchanged inside the token, so the
/// engine executes exactly what was checked.
///
/// # Examples
/// ```
/// # use readonly_sql_gate::gate::{validate, ViolationKind};
/// # use readonly_sql_gate::types::DatabaseType;
/// let decision = validate("SELECT id FROM users", DatabaseType::Postgres);
/// assert!(decision.is_accepted());
///
/// let decision = validate("SELECT * FROM accounts FOR UPDATE", DatabaseType::Postgres);
/// assert_eq!(
///     decision.rejection().map(|r| r.kind()),
///     Some(ViolationKind::LockingClausePresent)
/// );
/// ```
pub fn validate(sql: &str, db_type: DatabaseType) -> ValidationDecision {
    match check(sql, db_type) {
        Ok(()) => ValidationDecision::Accepted(ApprovedQuery::new(sql)),
        Err(rejection) => ValidationDecision::Rejected(rejection),
    }
}

fn check(sql: &str, db_type: DatabaseType) -> Result<(), Rejection> {
    let parsed = parse_statements(sql, db_type);
    let scan = scan_tokens(sql, db_type);

    let statements = match parsed {
        Ok(statements) => statements,
        Err(e) => {
            // Lock modes the grammar does not know still report as locking
            if let Ok(TokenScan {
                locking_clause: Some(clause),
                ..
            }) = &scan
            {
                return Err(Rejection::new(
                    ViolationKind::LockingClausePresent,
                    format!("row-locking clause {} is not allowed", clause),
                )
                .with_diagnostic(e.to_string()));
            }
            return Err(Rejection::new(
                ViolationKind::SyntaxError,
                "statement could not be parsed as valid SQL",
            )
            .with_diagnostic(e.to_string()));
        }
    };

    let scan = scan.map_err(|e| {
        Rejection::new(ViolationKind::SyntaxError, "statement could not be tokenized")
            .with_diagnostic(e.to_string())
    })?;

    let read = classifier::classify(statements, &scan)?;

    if let Some(comment) = &scan.executable_comment {
        return Err(Rejection::new(
            ViolationKind::WriteThroughConstruct,
            format!("{} executable comments and optimizer hints are not allowed", db_type),
        )
        .with_diagnostic(comment.clone()));
    }

    inspector::inspect(&read, db_type)
}

/// Validation gate bound to one database dialect
#[derive(Debug, Clone, Copy)]
pub struct QueryGate {
    db_type: DatabaseType,
}

impl QueryGate {
    pub fn new(db_type: DatabaseType) -> Self {
        Self { db_type }
    }

    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// See [`validate`]
    pub fn validate(&self, sql: &str) -> ValidationDecision {
        validate(sql, self.db_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_original_text() {
        let sql = "  SELECT id, name FROM users WHERE id = 1 -- lookup\n";
        let approved = validate(sql, DatabaseType::Postgres).into_result().unwrap();
        assert_eq!(approved.sql(), sql);
    }

    #[test]
    fn test_syntax_error_keeps_parser_message_internal() {
        let rejection = validate("SELEC * FORM users", DatabaseType::Postgres)
            .into_result()
            .unwrap_err();
        assert_eq!(rejection.kind(), ViolationKind::SyntaxError);
        assert!(rejection.diagnostic().is_some());
        assert!(!rejection.to_string().contains("Expected"));
    }

    #[test]
    fn test_gate_uses_its_dialect() {
        let gate = QueryGate::new(DatabaseType::MySQL);
        assert!(gate.validate("SELECT `id` FROM `users`").is_accepted());
        assert!(!gate.validate("SELECT SLEEP(1)").is_accepted());
    }

    #[test]
    fn test_unparsed_lock_modes_report_as_locking() {
        for (sql, db) in [
            ("SELECT * FROM accounts FOR NO KEY UPDATE", DatabaseType::Postgres),
            ("SELECT * FROM accounts FOR KEY SHARE", DatabaseType::Postgres),
            ("SELECT * FROM accounts LOCK IN SHARE MODE", DatabaseType::MySQL),
        ] {
            let rejection = validate(sql, db).into_result().unwrap_err();
            assert_eq!(rejection.kind(), ViolationKind::LockingClausePresent, "{sql}");
        }
    }

    #[test]
    fn test_executable_comment_is_never_approved() {
        let rejection = validate("SELECT * FROM users /*! INTO OUTFILE '/tmp/x' */", DatabaseType::MySQL)
            .into_result()
            .unwrap_err();
        assert_eq!(rejection.kind(), ViolationKind::WriteThroughConstruct);
        assert_eq!(rejection.diagnostic(), Some("/*! INTO OUTFILE '/tmp/x' */"));
    }
}
