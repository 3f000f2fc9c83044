//! Result normalization
//!
//! Converts engine values into the closed [`SqlValue`] set. Column and row order are
//! kept exactly as the engine returned them. Binary values become text (lossy for
//! non-UTF-8 bytes). Duplicate column names get a numeric suffix so names stay
//! unique within a row. The only truncation is the optional row cap, and it is
//! always flagged on the result.

use crate::engine::{EngineValue, RawResultSet};
use crate::types::{QueryResult, ResultRow, SqlValue};
use std::collections::HashSet;
use std::sync::Arc;

/// Normalize an engine result set
///
/// # Arguments
/// * `raw` - rows as returned by the engine
/// * `max_rows` - optional row cap; hitting it sets `truncated` on the result
pub fn normalize(raw: RawResultSet, max_rows: Option<usize>) -> QueryResult {
    let columns = unique_column_names(raw.columns);
    let shared: Arc<[String]> = columns.clone().into();

    let total = raw.rows.len();
    let keep = max_rows.map_or(total, |cap| cap.min(total));

    let rows = raw
        .rows
        .into_iter()
        .take(keep)
        .map(|values| ResultRow::new(shared.clone(), values.into_iter().map(to_sql_value).collect()))
        .collect();

    QueryResult::new(columns, rows, keep < total)
}

/// Convert one engine value to its transport-stable form
pub fn to_sql_value(value: EngineValue) -> SqlValue {
    match value {
        EngineValue::Null => SqlValue::Null,
        EngineValue::Bool(b) => SqlValue::Bool(b),
        EngineValue::Int(i) => SqlValue::Int(i),
        // JSON has no NaN or infinity
        EngineValue::Float(f) if !f.is_finite() => SqlValue::Text(f.to_string()),
        EngineValue::Float(f) => SqlValue::Float(f),
        EngineValue::Text(s) => SqlValue::Text(s),
        EngineValue::Bytes(bytes) => SqlValue::Binary(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn unique_column_names(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(columns.len());
    let mut unique = Vec::with_capacity(columns.len());

    for name in columns {
        let mut candidate = name.clone();
        let mut suffix = 2;
        while seen.contains(&candidate) {
            candidate = format!("{}_{}", name, suffix);
            suffix += 1;
        }
        seen.insert(candidate.clone());
        unique.push(candidate);
    }

    unique
}
