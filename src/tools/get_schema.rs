//! get_schema tool: column listing for one table

use crate::introspection::Introspector;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetSchemaArgs {
    /// Table name, exactly as listed by list_tables
    pub table_name: String,
}

pub async fn run(introspector: &Introspector, table_name: &str) -> CallToolResult {
    match introspector.describe_schema(table_name).await {
        Ok(schema) => CallToolResult::success(vec![Content::text(schema.to_string())]),
        Err(e) => CallToolResult::error(vec![Content::text(e.caller_message())]),
    }
}
