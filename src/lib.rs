//! Read-only SQL gate for tool-calling agents
//!
//! Exposes a relational database (PostgreSQL, MySQL, MariaDB, SQLite) over MCP
//! through three tools: `safe_query`, `list_tables` and `get_schema`. Caller SQL
//! is parsed and checked by [`gate`] before it can reach the database; only an
//! [`ApprovedQuery`] is ever handed to a [`QueryEngine`].

pub mod error;
pub mod types;

// Policy
pub mod gate;
pub mod sql_parser;

// Execution
pub mod audit;
pub mod enforcer;
pub mod engine;
pub mod introspection;
pub mod normalize;
pub mod schema_queries;

// Startup
pub mod config;
pub mod connection;
pub mod dsn;

// MCP surface
pub mod tools;

// Re-export secrecy types for consumers
pub use secrecy::{ExposeSecret, SecretString};

// Re-exports
pub use audit::{AuditSink, LogAuditSink};
pub use config::GateConfig;
pub use connection::{setup_database_pool, warmup_pool};
pub use dsn::{DSNInfo, parse_dsn, redact, validate_dsn};
pub use enforcer::ExecutionEnforcer;
pub use engine::{EngineValue, QueryEngine, RawResultSet, SqlxEngine};
pub use error::GateError;
pub use gate::{
    ApprovedQuery, QueryGate, Rejection, ValidationDecision, ViolationKind,
    is_allowed_routine, validate,
};
pub use introspection::Introspector;
pub use normalize::normalize;
pub use tools::GateServer;
pub use types::{
    ColumnDescription, DatabaseType, QueryResult, ResultRow, SchemaDescription, SqlValue,
};

use anyhow::Context;
use rmcp::ServiceExt;
use std::sync::Arc;

/// Connect to the configured database and serve the MCP tools over stdio
///
/// Runs until the client closes the transport or the process receives
/// Ctrl-C / SIGTERM, then closes the pool.
///
/// # Errors
/// Returns error if the database is unreachable or the transport fails to start
pub async fn serve_stdio(config: GateConfig) -> anyhow::Result<()> {
    let pool = setup_database_pool(&config).await?;

    let engine: Arc<dyn QueryEngine> = Arc::new(
        SqlxEngine::new(pool.clone(), config.db_type)
            .with_schema(config.schema.clone())
            .with_timeouts(config.query_timeout, config.metadata_timeout),
    );
    let audit: Arc<dyn AuditSink> = Arc::new(LogAuditSink);

    let enforcer = ExecutionEnforcer::new(engine.clone(), audit).with_max_rows(config.max_rows);
    let introspector = Introspector::new(engine);
    let server = GateServer::new(Arc::new(enforcer), Arc::new(introspector));

    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP stdio transport")?;
    log::info!("✓ Serving safe_query, list_tables, get_schema over stdio");

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(reason) => log::info!("MCP session ended: {:?}", reason),
                Err(e) => log::warn!("MCP session ended with error: {}", e),
            }
        }
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received");
        }
    }

    pool.close().await;
    log::info!("Database pool closed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
