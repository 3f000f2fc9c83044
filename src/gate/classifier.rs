//! Statement classification: a single top-level read query, or rejection

use super::decision::{Rejection, ViolationKind};
use crate::sql_parser::TokenScan;
use sqlparser::ast::{Query, SetExpr, Statement};

/// A statement that classified as a single read query
#[derive(Debug)]
pub struct ReadStatement {
    query: Box<Query>,
}

impl ReadStatement {
    pub fn query(&self) -> &Query {
        &self.query
    }
}

/// Classify parsed statements against the read-only allow-list.
///
/// `scan` comes from the raw text the statements were parsed from; its boundary
/// check catches a second statement even if the parser dropped it.
///
/// # Errors
/// - `SyntaxError` when there is no statement
/// - `MultiStatementInput` when more than one statement is present
/// - `DisallowedStatementType` for anything but a read query
pub fn classify(mut statements: Vec<Statement>, scan: &TokenScan) -> Result<ReadStatement, Rejection> {
    if statements.len() > 1 {
        return Err(multi_statement(statements.len()));
    }

    let statement = statements.pop().ok_or_else(|| {
        Rejection::new(ViolationKind::SyntaxError, "no SQL statement found in input")
    })?;

    if scan.trailing_statement {
        return Err(multi_statement(2));
    }

    match statement {
        Statement::Query(query) => {
            // WITH ... INSERT/UPDATE/DELETE parses as a query wrapping a write body
            if !is_read_body(&query.body) {
                return Err(disallowed(&query.body.to_string()));
            }
            Ok(ReadStatement { query })
        }
        other => Err(disallowed(&other.to_string())),
    }
}

fn is_read_body(body: &SetExpr) -> bool {
    matches!(
        body,
        SetExpr::Select(_)
            | SetExpr::Query(_)
            | SetExpr::SetOperation { .. }
            | SetExpr::Values(_)
            | SetExpr::Table(_)
    )
}

fn multi_statement(count: usize) -> Rejection {
    Rejection::new(
        ViolationKind::MultiStatementInput,
        format!("found {} statements; exactly one SELECT statement is accepted", count),
    )
}

fn disallowed(rendered: &str) -> Rejection {
    let keyword = rendered
        .split_whitespace()
        .next()
        .unwrap_or("UNKNOWN")
        .to_uppercase();
    Rejection::new(
        ViolationKind::DisallowedStatementType,
        format!("{} statements are not allowed; only SELECT queries are accepted", keyword),
    )
}
