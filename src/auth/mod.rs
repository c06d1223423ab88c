//! Credential selection for outgoing remote calls
//!
//! This module decides which host and bearer token authenticate a call to the
//! remote API. Caller credentials arrive through a [`CallContext`], filled
//! from inbound headers, and a [`CredentialResolver`] walks an ordered chain
//! of strategies to pick one.

mod context;
pub mod headers;
mod resolver;

pub use context::{CallContext, Credential};
pub use headers::context_from_headers;
pub use resolver::{
    parse_host, Authenticator, ContextAuthenticator, CredentialResolver, FixedAuthenticator,
    ResolvedCredential,
};
