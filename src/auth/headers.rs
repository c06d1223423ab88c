//! Inbound header extraction
//!
//! Turns the headers of an HTTP request into a `CallContext`. When no token
//! is present the context is left without one, so the resolver chain falls
//! through to the fixed credentials.

use http::HeaderMap;
use tokio_util::sync::CancellationToken;

use super::context::CallContext;

/// Header overriding the remote API host for one request
pub const HOST_HEADER: &str = "x-api-host";
/// Plain token header, used when no bearer Authorization is given
pub const TOKEN_HEADER: &str = "x-api-token";

/// Build a call context from inbound request headers
pub fn context_from_headers(headers: &HeaderMap, cancel: CancellationToken) -> CallContext {
    let mut ctx = CallContext::with_cancellation(cancel);

    if let Some(host) = header_str(headers, HOST_HEADER) {
        ctx = ctx.with_host(host);
    }

    let token = bearer_token(headers).or_else(|| header_str(headers, TOKEN_HEADER));
    match token {
        Some(token) => {
            tracing::debug!(
                "[Auth] Request {} carries a caller token",
                ctx.request_id()
            );
            ctx.with_token(token)
        }
        None => ctx,
    }
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = header_str(headers, http::header::AUTHORIZATION.as_str())?;
    let mut parts = value.split(' ');
    let (scheme, token) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}
