//! list_tables tool for database table exploration

use crate::introspection::Introspector;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ListTablesOutput {
    pub tables: Vec<String>,
    pub count: usize,
}

pub async fn run(introspector: &Introspector) -> CallToolResult {
    let tables = match introspector.list_tables().await {
        Ok(tables) => tables,
        Err(e) => return CallToolResult::error(vec![Content::text(e.caller_message())]),
    };

    let output = ListTablesOutput {
        count: tables.len(),
        tables,
    };
    let display = format!("Found {} tables.", output.count);

    match serde_json::to_string_pretty(&output) {
        Ok(json) => CallToolResult::success(vec![Content::text(display), Content::text(json)]),
        Err(e) => CallToolResult::error(vec![Content::text(format!(
            "Failed to serialize table list: {}",
            e
        ))]),
    }
}
