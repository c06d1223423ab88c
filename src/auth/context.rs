//! Request-scoped credential carrier
//!
//! A `CallContext` travels with one inbound call. Transport code fills it
//! from request headers, and the `ContextAuthenticator` reads it back when an
//! outgoing request has to be authenticated.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Host and token optionally supplied by the caller
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    /// Remote API host override
    pub host: Option<String>,
    /// Bearer token
    pub token: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Per-call context carrying caller credentials and cancellation
#[derive(Debug, Clone)]
pub struct CallContext {
    request_id: String,
    credential: Credential,
    cancel: CancellationToken,
}

impl CallContext {
    /// Create an empty context with its own cancellation token
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Create an empty context bound to an existing cancellation token
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            credential: Credential::default(),
            cancel,
        }
    }

    /// Attach a host override. Empty values are ignored.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        if !host.is_empty() {
            self.credential.host = Some(host);
        }
        self
    }

    /// Attach a bearer token. Empty values are ignored.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        if !token.is_empty() {
            self.credential.token = Some(token);
        }
        self
    }

    /// Host stashed by inbound middleware, if any
    pub fn host(&self) -> Option<&str> {
        self.credential.host.as_deref()
    }

    /// Token stashed by inbound middleware, if any
    pub fn token(&self) -> Option<&str> {
        self.credential.token.as_deref()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Correlation id used in log records for this call
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}
