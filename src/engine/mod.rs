//! Execution engine seam
//!
//! [`QueryEngine`] is the only abstraction that runs SQL against the database. Its one
//! free-text entry point, [`QueryEngine::fetch_readonly`], takes an [`ApprovedQuery`],
//! which only the validation gate can construct. Catalog operations take names, never
//! SQL fragments.

pub mod row_converter;
pub mod sqlx_engine;
pub mod timeout;

pub use sqlx_engine::SqlxEngine;

use crate::error::GateError;
use crate::gate::ApprovedQuery;
use crate::types::{ColumnDescription, DatabaseType};
use async_trait::async_trait;

/// Engine-native column value, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum EngineValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// Rows as returned by the engine, column names in engine order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<EngineValue>>,
}

#[async_trait]
pub trait QueryEngine: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    /// Execute an approved statement in read-only mode and return all of its rows.
    ///
    /// Consumes the approval. Dropping the returned future must release the
    /// underlying connection.
    async fn fetch_readonly(&self, query: ApprovedQuery) -> Result<RawResultSet, GateError>;

    /// Base table names, sorted by the catalog
    async fn list_tables(&self) -> Result<Vec<String>, GateError>;

    /// Columns of `table` in physical order; empty when the table is not visible
    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescription>, GateError>;
}
