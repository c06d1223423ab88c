//! Tool system for the gateway
//!
//! This module provides the Tool trait, the ToolRegistry that fixes each
//! tool's permission descriptor, and the remote-API-backed tools.

mod events;
mod kubernetes;
mod registry;
mod sysql;
mod tool;

use std::sync::Arc;

use anyhow::Result;

use crate::remote::RemoteClient;

pub use events::{GetEventInfoTool, GetEventProcessTreeTool, ListRuntimeEventsTool};
pub use kubernetes::PromQlTool;
pub use registry::ToolRegistry;
pub use sysql::{GenerateSysqlTool, RunSysqlTool};
pub use tool::{RequiredPermissions, Tool, ToolDescriptor, ToolResult, ToolResultData};

/// Register every built-in tool against `client`
pub fn register_builtin_tools(registry: &mut ToolRegistry, client: Arc<RemoteClient>) -> Result<()> {
    registry.register(ListRuntimeEventsTool::new(client.clone()))?;
    registry.register(GetEventInfoTool::new(client.clone()))?;
    registry.register(GetEventProcessTreeTool::new(client.clone()))?;
    registry.register(RunSysqlTool::new(client.clone()))?;
    registry.register(GenerateSysqlTool::new(client.clone()))?;
    for tool in PromQlTool::all(client) {
        registry.register(tool)?;
    }
    Ok(())
}
