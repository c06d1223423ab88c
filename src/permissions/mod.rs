//! Permission lookups gating tool access
//!
//! Two separate mechanisms live here and must not be merged:
//!
//! - [`PermissionOracle`] fetches the permissions of one fixed identity once
//!   and answers from that snapshot for the life of the process. It suits the
//!   stdio transport, where a single credential serves the whole session.
//! - [`ToolCapabilityFilter`] fetches the caller's permissions on every tool
//!   discovery request. It suits the shared HTTP listener, where each request
//!   may carry a different credential.
//!
//! Both fail closed: any fetch error denies.

mod filter;
mod oracle;
mod set;
#[cfg(test)]
pub(crate) mod test_support;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::auth::CallContext;
use crate::error::RemoteError;

pub use filter::ToolCapabilityFilter;
pub use oracle::{OracleState, PermissionOracle};
pub use set::PermissionSet;

/// Something that can fetch the permissions of the identity behind a context
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Fetch the full permission set; partial results are never returned
    async fn fetch_permissions(&self, ctx: &CallContext) -> Result<PermissionSet, RemoteError>;
}

/// Fetch permissions, treating cancellation as a failure
pub(crate) async fn fetch_cancellable(
    source: &dyn PermissionSource,
    ctx: &CallContext,
    cancel: &CancellationToken,
) -> Result<PermissionSet, RemoteError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(RemoteError::Cancelled),
        result = source.fetch_permissions(ctx) => result,
    }
}
