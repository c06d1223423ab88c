//! Error types
//!
//! Each concern gets its own enum so callers can match on what went wrong
//! without string inspection.

use thiserror::Error;

/// Failure of one authentication strategy, or of the whole chain
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token was available to the strategy
    #[error("authorization token not present")]
    MissingToken,

    /// No host was available to the strategy
    #[error("api host not present")]
    MissingHost,

    /// The host could not be parsed, even with an `https://` prefix
    #[error("invalid api host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    /// The resolved credential could not be written into the request
    #[error("unable to apply credential to request: {0}")]
    Apply(String),

    /// Every strategy in the chain failed
    #[error("no authentication method succeeded: {}", format_failures(.0))]
    NoMethodSucceeded(Vec<(String, AuthError)>),
}

fn format_failures(failures: &[(String, AuthError)]) -> String {
    if failures.is_empty() {
        return "no authenticators configured".to_string();
    }
    failures
        .iter()
        .map(|(name, err)| format!("{}: {}", name, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors talking to the remote analytics API
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Credential resolution failed; the request was never sent
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Connection, TLS or protocol failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("unexpected status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// A request URL could not be built
    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    /// The response body did not match the expected shape
    #[error("unable to decode response: {0}")]
    Decode(String),

    /// The caller's context was cancelled while the request was in flight
    #[error("request cancelled")]
    Cancelled,
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required configuration missing: {0}")]
    Missing(&'static str),

    #[error("unknown transport: {0}")]
    UnknownTransport(String),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
