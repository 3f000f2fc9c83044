//! MCP tool surface: `safe_query`, `list_tables`, `get_schema`
//!
//! The protocol layer is untrusted input. Tool handlers only unpack arguments and
//! forward them; every policy decision lives in the enforcer and the gate.

pub mod get_schema;
pub mod list_tables;
pub mod safe_query;

pub use get_schema::GetSchemaArgs;
pub use safe_query::SafeQueryArgs;

use crate::enforcer::ExecutionEnforcer;
use crate::introspection::Introspector;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, tool, tool_handler, tool_router};
use std::sync::Arc;

#[derive(Clone)]
pub struct GateServer {
    enforcer: Arc<ExecutionEnforcer>,
    introspector: Arc<Introspector>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GateServer {
    pub fn new(enforcer: Arc<ExecutionEnforcer>, introspector: Arc<Introspector>) -> Self {
        Self {
            enforcer,
            introspector,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Execute a single read-only SQL SELECT statement. Writes, DDL, locking clauses (FOR UPDATE/FOR SHARE), SELECT INTO, side-effecting functions and multiple statements are rejected before reaching the database. Returns the rows as JSON objects keyed by column name, plus the row count."
    )]
    async fn safe_query(
        &self,
        Parameters(args): Parameters<SafeQueryArgs>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(safe_query::run(&self.enforcer, &args.query, ctx.ct.cancelled()).await)
    }

    #[tool(
        description = "List all base tables in the configured schema (public for PostgreSQL, current database for MySQL, main for SQLite). Returns a JSON array of table names in alphabetical order."
    )]
    async fn list_tables(&self) -> Result<CallToolResult, McpError> {
        Ok(list_tables::run(&self.introspector).await)
    }

    #[tool(
        description = "Describe a table: column names, declared types and nullability, in the table's physical column order."
    )]
    async fn get_schema(
        &self,
        Parameters(args): Parameters<GetSchemaArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(get_schema::run(&self.introspector, &args.table_name).await)
    }
}

#[tool_handler]
impl ServerHandler for GateServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(format!(
                "Read-only access to a {} database. Use list_tables and get_schema to explore, \
                 then safe_query to run a single SELECT statement.",
                self.enforcer.gate().database_type()
            )),
            ..Default::default()
        }
    }
}
