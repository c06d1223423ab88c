//! Tool registry
//!
//! Holds the registered tools in registration order together with the
//! descriptor built for each one when it was added.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};

use super::tool::{RequiredPermissions, Tool, ToolDescriptor};

struct Registered {
    tool: Arc<dyn Tool>,
    descriptor: ToolDescriptor,
}

/// Registered tools and their immutable descriptors
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Registered>,
    overrides: HashMap<String, RequiredPermissions>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the declared requirements of named tools at registration time
    ///
    /// Only affects tools registered after this call.
    pub fn with_overrides(mut self, overrides: HashMap<String, RequiredPermissions>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Register a tool, fixing its descriptor
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.get(&name).is_some() {
            bail!("Tool '{}' is already registered", name);
        }

        let required = match self.overrides.get(&name) {
            Some(overridden) => {
                tracing::info!(
                    "[ToolRegistry] Using configured permissions for '{}': {:?}",
                    name,
                    overridden
                );
                overridden.clone()
            }
            None => tool.required_permissions(),
        };
        if let RequiredPermissions::Malformed(reason) = &required {
            tracing::error!(
                "[ToolRegistry] Tool '{}' has malformed permission metadata and will stay hidden: {}",
                name,
                reason
            );
        }

        tracing::debug!("[ToolRegistry] Registered tool '{}'", name);
        self.entries.push(Registered {
            tool,
            descriptor: ToolDescriptor::new(name, required),
        });
        Ok(())
    }

    /// Look up a tool and its descriptor by name
    pub fn get(&self, name: &str) -> Option<(&Arc<dyn Tool>, &ToolDescriptor)> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.name() == name)
            .map(|entry| (&entry.tool, &entry.descriptor))
    }

    /// Descriptors of every tool, in registration order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.entries
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
