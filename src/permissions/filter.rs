//! Per-request tool capability filter
//!
//! Used for tool discovery on transports that serve many callers. Each call
//! fetches the caller's permissions afresh; nothing is remembered between
//! calls, so one caller's grants can never leak into another's view.

use std::sync::Arc;

use super::{fetch_cancellable, PermissionSource};
use crate::auth::CallContext;
use crate::tools::{RequiredPermissions, ToolDescriptor};

/// Decides which registered tools a caller may see
#[derive(Clone)]
pub struct ToolCapabilityFilter {
    source: Arc<dyn PermissionSource>,
}

impl ToolCapabilityFilter {
    pub fn new(source: Arc<dyn PermissionSource>) -> Self {
        Self { source }
    }

    /// Return the descriptors whose requirements the caller meets
    ///
    /// Registry order is preserved. A failed or cancelled permission fetch
    /// yields an empty list.
    pub async fn filter_visible_tools(
        &self,
        ctx: &CallContext,
        registry: &[ToolDescriptor],
    ) -> Vec<ToolDescriptor> {
        tracing::debug!(
            "[ToolFilter] Filtering {} tools for request {}",
            registry.len(),
            ctx.request_id()
        );

        let permissions =
            match fetch_cancellable(self.source.as_ref(), ctx, ctx.cancellation()).await {
                Ok(permissions) => permissions,
                Err(e) => {
                    tracing::error!(
                        "[ToolFilter] Unable to retrieve permissions for request {}, hiding all tools: {}",
                        ctx.request_id(),
                        e
                    );
                    return Vec::new();
                }
            };

        registry
            .iter()
            .filter(|descriptor| match descriptor.required_permissions() {
                RequiredPermissions::Malformed(reason) => {
                    tracing::error!(
                        "[ToolFilter] Tool '{}' has unreadable permission metadata, hiding it: {}",
                        descriptor.name(),
                        reason
                    );
                    false
                }
                required => {
                    let visible = required.is_satisfied_by(&permissions);
                    if !visible {
                        tracing::debug!(
                            "[ToolFilter] Tool '{}' requires {:?}, skipping it",
                            descriptor.name(),
                            required
                        );
                    }
                    visible
                }
            })
            .cloned()
            .collect()
    }
}
