//! Schema introspection: table listing and table description
//!
//! These operations run fixed catalog queries with names passed as bound parameters.
//! They never carry caller SQL, so they do not go through the validation gate.

use crate::engine::QueryEngine;
use crate::error::GateError;
use crate::types::SchemaDescription;
use std::sync::Arc;

pub struct Introspector {
    engine: Arc<dyn QueryEngine>,
}

impl Introspector {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self { engine }
    }

    /// Base table names in catalog order
    pub async fn list_tables(&self) -> Result<Vec<String>, GateError> {
        let tables = self.engine.list_tables().await?;
        log::debug!("Listed {} tables", tables.len());
        Ok(tables)
    }

    /// Describe `table` with columns in physical order
    ///
    /// # Errors
    /// `GateError::TableNotFound` when the catalog has no visible columns for `table`
    pub async fn describe_schema(&self, table: &str) -> Result<SchemaDescription, GateError> {
        let columns = self.engine.describe_table(table).await?;
        if columns.is_empty() {
            return Err(GateError::TableNotFound(table.to_string()));
        }
        Ok(SchemaDescription {
            table: table.to_string(),
            columns,
        })
    }
}
