//! safe_query tool: validated, read-only execution of caller SQL

use crate::enforcer::ExecutionEnforcer;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::Deserialize;
use std::future::Future;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SafeQueryArgs {
    /// A single read-only SELECT statement
    pub query: String,
}

/// Run the query through the enforcer and shape the tool result
///
/// Rejections and engine failures become tool-level errors carrying caller-safe text.
pub async fn run(
    enforcer: &ExecutionEnforcer,
    query: &str,
    cancelled: impl Future<Output = ()>,
) -> CallToolResult {
    match enforcer.execute_safely_until(query, cancelled).await {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => CallToolResult::success(vec![
                Content::text(result.summary()),
                Content::text(json),
            ]),
            Err(e) => CallToolResult::error(vec![Content::text(format!(
                "Failed to serialize query result: {}",
                e
            ))]),
        },
        Err(e) => CallToolResult::error(vec![Content::text(e.caller_message())]),
    }
}
