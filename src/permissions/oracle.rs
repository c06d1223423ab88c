//! Cached permission oracle for single-identity deployments
//!
//! The oracle is bound to one identity at construction. The first lookup
//! fetches that identity's permissions; every later lookup, concurrent or
//! not, is answered from the same outcome. A failed fetch is final.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{fetch_cancellable, PermissionSet, PermissionSource};
use crate::auth::CallContext;
use crate::tools::RequiredPermissions;

/// Lifecycle of an oracle's snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleState {
    /// No fetch has happened yet
    Uninitialized,
    /// The fetch succeeded; this is the authoritative snapshot
    Loaded(Arc<PermissionSet>),
    /// The fetch failed; every lookup denies
    Failed,
}

/// Process-local permission cache for one fixed identity
pub struct PermissionOracle {
    source: Arc<dyn PermissionSource>,
    identity: CallContext,
    state: Mutex<OracleState>,
}

impl PermissionOracle {
    /// Bind an oracle to the identity behind an empty context, which the
    /// resolver chain maps to the fixed credentials
    pub fn new(source: Arc<dyn PermissionSource>) -> Self {
        Self::for_identity(source, CallContext::new())
    }

    /// Bind an oracle to the identity carried by `identity`
    pub fn for_identity(source: Arc<dyn PermissionSource>, identity: CallContext) -> Self {
        Self {
            source,
            identity,
            state: Mutex::new(OracleState::Uninitialized),
        }
    }

    /// Whether the bound identity holds `permission`
    ///
    /// The first call fetches; callers arriving meanwhile wait for that fetch.
    /// Cancelling `cancel` during the fetch fails the oracle for good.
    pub async fn has_permission(&self, permission: &str, cancel: &CancellationToken) -> bool {
        match self.ensure_loaded(cancel).await {
            Some(permissions) => permissions.contains(permission),
            None => false,
        }
    }

    /// Whether the bound identity satisfies every permission in `required`
    pub async fn has_all(&self, required: &RequiredPermissions, cancel: &CancellationToken) -> bool {
        match self.ensure_loaded(cancel).await {
            Some(permissions) => required.is_satisfied_by(&permissions),
            None => false,
        }
    }

    /// Current state, without triggering a fetch
    pub async fn state(&self) -> OracleState {
        self.state.lock().await.clone()
    }

    async fn ensure_loaded(&self, cancel: &CancellationToken) -> Option<Arc<PermissionSet>> {
        let mut state = self.state.lock().await;

        if *state == OracleState::Uninitialized {
            // Stays Failed if this future is dropped before the fetch ends.
            *state = OracleState::Failed;

            match fetch_cancellable(self.source.as_ref(), &self.identity, cancel).await {
                Ok(permissions) => {
                    tracing::info!(
                        "[PermissionOracle] Loaded {} permissions",
                        permissions.len()
                    );
                    *state = OracleState::Loaded(Arc::new(permissions));
                }
                Err(e) => {
                    tracing::error!(
                        "[PermissionOracle] Unable to load permissions, denying all: {}",
                        e
                    );
                }
            }
        }

        match &*state {
            OracleState::Loaded(permissions) => Some(permissions.clone()),
            OracleState::Uninitialized | OracleState::Failed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::test_support::FakeSource;
    use std::time::Duration;

    fn oracle(source: &Arc<FakeSource>) -> PermissionOracle {
        PermissionOracle::new(source.clone())
    }

    #[tokio::test]
    async fn test_granted_and_missing_permissions() {
        let source = Arc::new(FakeSource::granting(&["policy-events.read", "other.read"]));
        let oracle = oracle(&source);
        let cancel = CancellationToken::new();

        assert!(oracle.has_permission("policy-events.read", &cancel).await);
        assert!(oracle.has_permission("other.read", &cancel).await);
        assert!(!oracle.has_permission("missing.read", &cancel).await);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_state_is_uninitialized_until_first_lookup() {
        let source = Arc::new(FakeSource::granting(&["a"]));
        let oracle = oracle(&source);
        assert_eq!(oracle.state().await, OracleState::Uninitialized);
        assert_eq!(source.calls(), 0);

        oracle.has_permission("a", &CancellationToken::new()).await;
        assert!(matches!(oracle.state().await, OracleState::Loaded(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lookups_fetch_once() {
        let source = Arc::new(
            FakeSource::granting(&["p1"]).with_delay(Duration::from_millis(50)),
        );
        let oracle = Arc::new(oracle(&source));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let oracle = oracle.clone();
                tokio::spawn(async move {
                    oracle.has_permission("p1", &CancellationToken::new()).await
                })
            })
            .collect();

        for granted in futures::future::join_all(handles).await {
            assert!(granted.unwrap());
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_permanent() {
        let source = Arc::new(FakeSource::failing());
        let oracle = oracle(&source);
        let cancel = CancellationToken::new();

        assert!(!oracle.has_permission("p1", &cancel).await);
        assert!(!oracle.has_permission("p2", &cancel).await);
        assert!(!oracle.has_all(&RequiredPermissions::none(), &cancel).await);
        assert_eq!(oracle.state().await, OracleState::Failed);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_fails_closed() {
        let source = Arc::new(
            FakeSource::granting(&["p1"]).with_delay(Duration::from_secs(30)),
        );
        let oracle = oracle(&source);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(!oracle.has_permission("p1", &cancel).await);
        assert_eq!(oracle.state().await, OracleState::Failed);

        // No second attempt with a live token
        assert!(!oracle.has_permission("p1", &CancellationToken::new()).await);
        assert!(source.calls() <= 1);
    }

    #[tokio::test]
    async fn test_dropped_fetch_fails_closed() {
        let source = Arc::new(
            FakeSource::granting(&["p1"]).with_delay(Duration::from_secs(30)),
        );
        let oracle = oracle(&source);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            oracle.has_permission("p1", &CancellationToken::new()),
        )
        .await;
        assert!(abandoned.is_err());

        assert_eq!(oracle.state().await, OracleState::Failed);
        assert!(!oracle.has_permission("p1", &CancellationToken::new()).await);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_has_all_checks_every_requirement() {
        let source = Arc::new(FakeSource::granting(&["a", "b"]));
        let oracle = oracle(&source);
        let cancel = CancellationToken::new();

        assert!(oracle.has_all(&RequiredPermissions::of(["a", "b"]), &cancel).await);
        assert!(!oracle.has_all(&RequiredPermissions::of(["a", "c"]), &cancel).await);
        assert!(oracle.has_all(&RequiredPermissions::none(), &cancel).await);
    }

    #[tokio::test]
    async fn test_fetches_with_bound_identity() {
        let source = Arc::new(FakeSource::granting(&["a"]));
        let oracle = PermissionOracle::for_identity(
            source.clone(),
            CallContext::new().with_token("bound"),
        );

        oracle.has_permission("a", &CancellationToken::new()).await;
        assert_eq!(source.seen_tokens(), vec![Some("bound".to_string())]);
    }
}
