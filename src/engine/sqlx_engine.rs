//! sqlx-backed execution engine
//!
//! Every statement, caller-approved or catalog, runs the same way:
//! 1. acquire a pooled connection
//! 2. switch the session to read-only
//! 3. open a transaction, fetch all rows
//! 4. roll the transaction back
//!
//! Nothing is ever committed. If the future is dropped midway (timeout, caller
//! cancellation) the transaction guard rolls back and the connection returns to the pool.

use super::row_converter::{column_names, row_to_values};
use super::timeout::execute_with_timeout;
use super::{QueryEngine, RawResultSet};
use crate::error::GateError;
use crate::gate::ApprovedQuery;
use crate::schema_queries::{CatalogQuery, columns_query, tables_query};
use crate::types::{ColumnDescription, DatabaseType};
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::{AnyPool, Connection, Executor, Row};
use std::sync::Arc;
use std::time::Duration;

/// Default time budget for caller queries
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time budget for catalog queries
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Execution engine over a shared sqlx `Any` pool
#[derive(Clone)]
pub struct SqlxEngine {
    pool: Arc<AnyPool>,
    db_type: DatabaseType,
    schema: Option<String>,
    query_timeout: Duration,
    metadata_timeout: Duration,
}

impl SqlxEngine {
    pub fn new(pool: Arc<AnyPool>, db_type: DatabaseType) -> Self {
        Self {
            pool,
            db_type,
            schema: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
        }
    }

    /// Schema used by catalog queries (database default when `None`)
    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_timeouts(mut self, query: Duration, metadata: Duration) -> Self {
        self.query_timeout = query;
        self.metadata_timeout = metadata;
        self
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    fn read_only_session_sql(&self) -> &'static str {
        match self.db_type {
            DatabaseType::Postgres => "SET SESSION CHARACTERISTICS AS TRANSACTION READ ONLY",
            DatabaseType::MySQL | DatabaseType::MariaDB => "SET SESSION TRANSACTION READ ONLY",
            DatabaseType::SQLite => "PRAGMA query_only = ON",
        }
    }

    async fn run_readonly(&self, sql: &str, params: &[String]) -> Result<Vec<AnyRow>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(sqlx::raw_sql(self.read_only_session_sql()))
            .await?;

        let mut tx = conn.begin().await?;

        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.clone());
        }
        let rows = query.fetch_all(&mut *tx).await;

        // Always rolled back, even after a successful read
        tx.rollback().await?;

        rows
    }

    async fn run_catalog(
        &self,
        catalog: CatalogQuery,
        operation: &str,
    ) -> Result<Vec<AnyRow>, GateError> {
        execute_with_timeout(
            self.metadata_timeout,
            operation,
            self.run_readonly(catalog.sql, &catalog.params),
        )
        .await
    }
}

#[async_trait]
impl QueryEngine for SqlxEngine {
    fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    async fn fetch_readonly(&self, query: ApprovedQuery) -> Result<RawResultSet, GateError> {
        let rows = execute_with_timeout(
            self.query_timeout,
            "Query execution",
            self.run_readonly(query.sql(), &[]),
        )
        .await?;

        let columns = rows.first().map(column_names).unwrap_or_default();
        let rows = rows
            .iter()
            .map(row_to_values)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RawResultSet { columns, rows })
    }

    async fn list_tables(&self) -> Result<Vec<String>, GateError> {
        let catalog = tables_query(self.db_type, self.schema.as_deref());
        let rows = self.run_catalog(catalog, "Listing tables").await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(GateError::from))
            .collect()
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescription>, GateError> {
        let catalog = columns_query(self.db_type, self.schema.as_deref(), table);
        let rows = self.run_catalog(catalog, "Describing table").await?;

        rows.iter()
            .map(|row| -> Result<ColumnDescription, sqlx::Error> {
                let is_nullable: String = row.try_get(2)?;
                Ok(ColumnDescription {
                    name: row.try_get(0)?,
                    data_type: row.try_get(1)?,
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(GateError::from)
    }
}
