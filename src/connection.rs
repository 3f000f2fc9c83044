//! Database connection setup and pooling utilities
//!
//! Builds the shared sqlx `Any` pool from [`GateConfig`] and warms it up, so an
//! unreachable database fails startup instead of the first tool call.

use crate::config::GateConfig;
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use sqlx::{Any, AnyPool};
use sqlx::pool::PoolOptions;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Warm up connection pool by pre-establishing min_connections
///
/// Concurrently acquires min_connections to force pool establishment.
///
/// # Errors
/// Returns error if all warmup connections fail
pub async fn warmup_pool(pool: &AnyPool, min_connections: u32) -> Result<()> {
    let start = Instant::now();

    let mut handles = Vec::new();
    for i in 0..min_connections {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            sqlx::query("SELECT 1")
                .fetch_one(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Warmup connection {} failed: {}", i + 1, e))
        }));
    }

    let mut success_count = 0;
    for (i, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(_)) => success_count += 1,
            Ok(Err(e)) => log::warn!("Connection {} warmup failed: {}", i + 1, e),
            Err(e) => log::warn!("Connection {} warmup task panicked: {}", i + 1, e),
        }
    }

    let elapsed = start.elapsed();

    if success_count == 0 && min_connections > 0 {
        anyhow::bail!(
            "Pool warmup failed: 0/{} connections established",
            min_connections
        );
    }

    log::info!(
        "✓ Connection pool warmed up: {}/{} connections ready ({:?})",
        success_count,
        min_connections,
        elapsed
    );
    if elapsed > Duration::from_secs(2) {
        log::warn!(
            "Pool warmup was slow ({:?}), queries may experience high latency",
            elapsed
        );
    }

    Ok(())
}

/// Build and warm up the connection pool
///
/// # Errors
/// Returns error if the database cannot be reached or warmup fails
pub async fn setup_database_pool(config: &GateConfig) -> Result<Arc<AnyPool>> {
    // Registers the compiled-in drivers; required before creating an AnyPool
    sqlx::any::install_default_drivers();

    let pool = PoolOptions::<Any>::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(Some(Duration::from_secs(600)))
        .max_lifetime(Some(Duration::from_secs(1800)))
        .test_before_acquire(true)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("SELECT 1").fetch_one(conn).await?;
                Ok(())
            })
        })
        .connect(config.database_url.expose_secret())
        .await
        .with_context(|| format!("Failed to connect to database {}", config.safe_database_url()))?;

    warmup_pool(&pool, config.min_connections).await?;

    log::info!(
        "✓ Database connected ({}, {})",
        config.db_type,
        config.safe_database_url()
    );

    Ok(Arc::new(pool))
}
