// Read-only SQL gate: MCP server over stdio
//
// REQUIRED: DATABASE_URL environment variable must be set.
// OPTIONAL: GATE_* variables tune schema, timeouts, row cap and pool size.
//
// stdout carries the MCP protocol; all logging goes to stderr.

use anyhow::Result;
use readonly_sql_gate::GateConfig;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match GateConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    log::info!(
        "Starting read-only SQL gate ({}, {})",
        config.db_type,
        config.safe_database_url()
    );

    if let Err(e) = readonly_sql_gate::serve_stdio(config).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
