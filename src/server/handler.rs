//! MCP request handler
//!
//! Bridges rmcp's [`ServerHandler`] to the tool registry, gating discovery
//! through the capability filter and, for a single identity, gating
//! invocation through the cached permission oracle.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::auth::{context_from_headers, CallContext};
use crate::permissions::{PermissionOracle, ToolCapabilityFilter};
use crate::tools::{ToolRegistry, ToolResult};

/// Who the gateway acts for
#[derive(Clone)]
pub enum AccessMode {
    /// One configured identity; invocations are checked against its cached grants
    SingleIdentity(Arc<PermissionOracle>),
    /// Every request carries its own identity; only discovery is filtered
    MultiTenant,
}

/// rmcp handler serving the registered tools
#[derive(Clone)]
pub struct GatewayHandler {
    registry: Arc<ToolRegistry>,
    filter: ToolCapabilityFilter,
    mode: AccessMode,
}

impl GatewayHandler {
    pub fn new(registry: Arc<ToolRegistry>, filter: ToolCapabilityFilter, mode: AccessMode) -> Self {
        Self {
            registry,
            filter,
            mode,
        }
    }

    /// Tools the caller behind `ctx` may see, in registration order
    pub async fn visible_tools(&self, ctx: &CallContext) -> Vec<rmcp::model::Tool> {
        let visible = self
            .filter
            .filter_visible_tools(ctx, &self.registry.descriptors())
            .await;

        visible
            .iter()
            .filter_map(|descriptor| self.registry.get(descriptor.name()))
            .map(|(tool, _)| {
                let schema = match tool.input_schema() {
                    Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                rmcp::model::Tool::new(
                    tool.name().to_string(),
                    tool.description().to_string(),
                    Arc::new(schema),
                )
            })
            .collect()
    }

    /// Run the named tool for the caller behind `ctx`
    pub async fn invoke(
        &self,
        ctx: &CallContext,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, ErrorData> {
        let (tool, descriptor) = self.registry.get(name).ok_or_else(|| {
            ErrorData::invalid_params(format!("unknown tool: {}", name), None)
        })?;

        if let AccessMode::SingleIdentity(oracle) = &self.mode {
            if !oracle
                .has_all(descriptor.required_permissions(), ctx.cancellation())
                .await
            {
                tracing::warn!(
                    "[Gateway] Denied '{}' for request {}: missing permissions",
                    name,
                    ctx.request_id()
                );
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "permission denied: tool '{}' requires permissions the configured identity does not hold",
                    name
                ))]));
            }
        }

        tracing::info!("[Gateway] Calling '{}' for request {}", name, ctx.request_id());
        let result = match tool.execute(ctx, &arguments).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("[Gateway] Tool '{}' failed: {:#}", name, e);
                ToolResult::error(format!("{:#}", e))
            }
        };

        Ok(into_call_result(result))
    }
}

fn into_call_result(result: ToolResult) -> CallToolResult {
    let content = vec![Content::text(result.to_text())];
    if result.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

/// Build the call context from the HTTP request parts, when there are any
fn call_context(context: &RequestContext<RoleServer>) -> CallContext {
    let cancel: CancellationToken = context.ct.clone();
    match context.extensions.get::<http::request::Parts>() {
        Some(parts) => context_from_headers(&parts.headers, cancel),
        None => CallContext::with_cancellation(cancel),
    }
}

impl ServerHandler for GatewayHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Security analytics tools. The tools listed are the ones the calling identity is permitted to use."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let ctx = call_context(&context);
        let tools = self.visible_tools(&ctx).await;
        tracing::debug!(
            "[Gateway] Listing {} of {} tools for request {}",
            tools.len(),
            self.registry.len(),
            ctx.request_id()
        );
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let ctx = call_context(&context);
        let arguments = request.arguments.map_or(Value::Null, Value::Object);
        self.invoke(&ctx, request.name.as_ref(), arguments).await
    }
}
