//! Credential resolution chain
//!
//! An outgoing request is authenticated by trying each configured
//! [`Authenticator`] in order. The first one that resolves a credential wins
//! and is applied to the request; the rest are never consulted. Strategies
//! only resolve, they never touch the request, so a failed strategy leaves
//! no trace on it.

use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Url;

use super::context::CallContext;
use crate::error::AuthError;

/// A host and bearer token ready to be written into a request
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    base: Url,
    authorization: HeaderValue,
}

impl ResolvedCredential {
    /// Parse `host` and build the Authorization value for `token`
    pub fn new(host: &str, token: &str) -> Result<Self, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let base = parse_host(host)?;
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| AuthError::Apply(format!("token is not a valid header value: {}", e)))?;
        authorization.set_sensitive(true);
        Ok(Self {
            base,
            authorization,
        })
    }

    /// Scheme, host and port the request will be sent to
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Overwrite scheme, host, port and Authorization; path and query are kept
    pub fn apply(&self, request: &mut reqwest::Request) -> Result<(), AuthError> {
        let url = request.url_mut();
        url.set_scheme(self.base.scheme())
            .map_err(|_| AuthError::Apply(format!("cannot use scheme '{}'", self.base.scheme())))?;
        url.set_host(self.base.host_str())
            .map_err(|e| AuthError::Apply(e.to_string()))?;
        url.set_port(self.base.port())
            .map_err(|_| AuthError::Apply("cannot set port".to_string()))?;

        request
            .headers_mut()
            .insert(AUTHORIZATION, self.authorization.clone());
        Ok(())
    }
}

/// Parse a configured host into a base URL
///
/// Bare hosts such as `example.com` or `localhost:8080` get an `https://`
/// prefix. Only http and https are accepted. A base path such as
/// `https://gw.example.com/sysdig` is rejected because requests keep their
/// own absolute paths.
pub fn parse_host(host: &str) -> Result<Url, AuthError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(AuthError::MissingHost);
    }

    parse_base(host)
        .or_else(|_| parse_base(&format!("https://{}", host)))
        .map_err(|reason| AuthError::InvalidHost {
            host: host.to_string(),
            reason,
        })
}

fn parse_base(candidate: &str) -> Result<Url, String> {
    let url = Url::parse(candidate).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    if !matches!(url.path(), "" | "/") {
        return Err(format!("base path '{}' is not supported", url.path()));
    }
    Ok(url)
}

/// A strategy that may produce a credential for the current call
pub trait Authenticator: Send + Sync {
    /// Short name used in logs and error reports
    fn name(&self) -> &str;

    /// Resolve a credential without side effects
    fn resolve(&self, ctx: &CallContext) -> Result<ResolvedCredential, AuthError>;
}

/// Uses the host and token stashed in the call context by inbound middleware
#[derive(Debug, Clone, Default)]
pub struct ContextAuthenticator {
    default_host: Option<String>,
}

impl ContextAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host used when the caller supplied a token but no host
    pub fn with_default_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.default_host = (!host.is_empty()).then_some(host);
        self
    }
}

impl Authenticator for ContextAuthenticator {
    fn name(&self) -> &str {
        "context"
    }

    fn resolve(&self, ctx: &CallContext) -> Result<ResolvedCredential, AuthError> {
        let token = ctx.token().ok_or(AuthError::MissingToken)?;
        let host = ctx
            .host()
            .or(self.default_host.as_deref())
            .ok_or(AuthError::MissingHost)?;
        ResolvedCredential::new(host, token)
    }
}

/// Statically configured host and token
#[derive(Clone)]
pub struct FixedAuthenticator {
    host: String,
    token: String,
}

impl FixedAuthenticator {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for FixedAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedAuthenticator")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Authenticator for FixedAuthenticator {
    fn name(&self) -> &str {
        "fixed"
    }

    fn resolve(&self, _ctx: &CallContext) -> Result<ResolvedCredential, AuthError> {
        if self.host.is_empty() {
            return Err(AuthError::MissingHost);
        }
        if self.token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        ResolvedCredential::new(&self.host, &self.token)
    }
}

/// Ordered fallback chain of authenticators
#[derive(Clone, Default)]
pub struct CredentialResolver {
    authenticators: Vec<Arc<dyn Authenticator>>,
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy; strategies are tried in insertion order
    pub fn with<A: Authenticator + 'static>(mut self, authenticator: A) -> Self {
        self.authenticators.push(Arc::new(authenticator));
        self
    }

    /// Append an already shared strategy
    pub fn with_shared(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticators.push(authenticator);
        self
    }

    /// Context credentials first, then the fixed host and token
    pub fn context_then_fixed(host: Option<String>, token: Option<String>) -> Self {
        let mut context = ContextAuthenticator::new();
        if let Some(host) = host.as_deref() {
            context = context.with_default_host(host);
        }
        Self::new().with(context).with(FixedAuthenticator::new(
            host.unwrap_or_default(),
            token.unwrap_or_default(),
        ))
    }

    pub fn len(&self) -> usize {
        self.authenticators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }

    /// Resolve a credential from the first strategy that succeeds
    pub fn resolve(&self, ctx: &CallContext) -> Result<ResolvedCredential, AuthError> {
        let mut failures = Vec::new();

        for authenticator in &self.authenticators {
            match authenticator.resolve(ctx) {
                Ok(credential) => {
                    tracing::debug!(
                        "[Auth] Request {} authenticated via '{}' against {}",
                        ctx.request_id(),
                        authenticator.name(),
                        credential.base()
                    );
                    return Ok(credential);
                }
                Err(e) => {
                    tracing::debug!(
                        "[Auth] Authenticator '{}' did not apply: {}",
                        authenticator.name(),
                        e
                    );
                    failures.push((authenticator.name().to_string(), e));
                }
            }
        }

        tracing::warn!(
            "[Auth] Request {} could not be authenticated ({} strategies tried)",
            ctx.request_id(),
            failures.len()
        );
        Err(AuthError::NoMethodSucceeded(failures))
    }

    /// Resolve and apply the winning credential to `request`
    pub fn authenticate(
        &self,
        ctx: &CallContext,
        request: &mut reqwest::Request,
    ) -> Result<(), AuthError> {
        self.resolve(ctx)?.apply(request)
    }
}
