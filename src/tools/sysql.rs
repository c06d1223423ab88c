//! SysQL tools
//!
//! Generate a SysQL query from a question, or run a caller-supplied query
//! against the remote graph API.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::tool::{RequiredPermissions, Tool, ToolResult};
use crate::auth::CallContext;
use crate::remote::RemoteClient;

/// Executes SysQL queries
pub struct RunSysqlTool {
    client: Arc<RemoteClient>,
}

/// Input for the run_sysql tool
#[derive(Debug, Deserialize)]
struct RunSysqlInput {
    /// The query to execute
    #[serde(default)]
    sysql_query: String,
}

impl RunSysqlTool {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }
}

/// Trim the query and make sure it ends with a semicolon
fn normalize_query(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{};", trimmed)
    }
}

#[async_trait]
impl Tool for RunSysqlTool {
    fn name(&self) -> &str {
        "run_sysql"
    }

    fn description(&self) -> &str {
        "Execute a SysQL query directly against the remote API. Try generating a valid SysQL query first."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sysql_query": {
                    "type": "string",
                    "description": "A valid SysQL query string to execute directly.",
                    "examples": [
                        "MATCH Vulnerability WHERE Vulnerability.severity = 'Critical' RETURN Vulnerability LIMIT 10",
                        "MATCH CloudResource WHERE CloudResource.type =~ '(?i).*S3 Bucket.*' RETURN DISTINCT CloudResource"
                    ]
                }
            },
            "required": ["sysql_query"]
        })
    }

    fn required_permissions(&self) -> RequiredPermissions {
        RequiredPermissions::of(["sage.exec", "risks.read"])
    }

    async fn execute(&self, ctx: &CallContext, input: &Value) -> Result<ToolResult> {
        let input: RunSysqlInput = serde_json::from_value(input.clone())?;
        if input.sysql_query.trim().is_empty() {
            return Ok(ToolResult::error("sysql_query is required"));
        }

        let query = normalize_query(&input.sysql_query);
        tracing::info!("[run_sysql] Executing query for request {}", ctx.request_id());

        match self.client.query_sysql(ctx, &query).await {
            Ok(result) => Ok(ToolResult::json(result)),
            Err(e) => Ok(ToolResult::error(format!(
                "error retrieving SysQL results: {}",
                e
            ))),
        }
    }
}

/// Turns a natural language question into a SysQL query
pub struct GenerateSysqlTool {
    client: Arc<RemoteClient>,
}

#[derive(Debug, Deserialize)]
struct GenerateSysqlInput {
    #[serde(default)]
    question: String,
}

impl GenerateSysqlTool {
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GenerateSysqlTool {
    fn name(&self) -> &str {
        "generate_sysql"
    }

    fn description(&self) -> &str {
        "Generates a SysQL query from a natural language question. Run the result with run_sysql."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "Your question in natural language, e.g. 'List all critical vulnerabilities'."
                }
            },
            "required": ["question"]
        })
    }

    fn required_permissions(&self) -> RequiredPermissions {
        RequiredPermissions::of(["sage.exec"])
    }

    async fn execute(&self, ctx: &CallContext, input: &Value) -> Result<ToolResult> {
        let input: GenerateSysqlInput = serde_json::from_value(input.clone())?;
        let question = input.question.trim();
        if question.is_empty() {
            return Ok(ToolResult::error("question is required"));
        }

        match self.client.generate_sysql(ctx, question).await {
            Ok(result) => Ok(ToolResult::json(result)),
            Err(e) => Ok(ToolResult::error(format!(
                "error generating SysQL query: {}",
                e
            ))),
        }
    }
}
