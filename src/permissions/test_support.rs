//! Fake permission source for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{PermissionSet, PermissionSource};
use crate::auth::CallContext;
use crate::error::RemoteError;

/// Returns a canned outcome, counting calls and recording the tokens it saw
pub(crate) struct FakeSource {
    permissions: Option<Vec<&'static str>>,
    delay: Duration,
    calls: AtomicUsize,
    seen_tokens: Mutex<Vec<Option<String>>>,
}

impl FakeSource {
    pub(crate) fn granting(permissions: &[&'static str]) -> Self {
        Self {
            permissions: Some(permissions.to_vec()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen_tokens: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            permissions: None,
            ..Self::granting(&[])
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen_tokens(&self) -> Vec<Option<String>> {
        self.seen_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl PermissionSource for FakeSource {
    async fn fetch_permissions(&self, ctx: &CallContext) -> Result<PermissionSet, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_tokens
            .lock()
            .unwrap()
            .push(ctx.token().map(str::to_string));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.permissions {
            Some(permissions) => Ok(permissions.iter().copied().collect()),
            None => Err(RemoteError::Decode("induced failure".to_string())),
        }
    }
}
