//! Permission-aware MCP gateway for a remote security analytics API
//!
//! Callers only see and use the tools their identity is granted. Outbound
//! requests authenticate through an ordered fallback chain of credential
//! strategies.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod permissions;
pub mod remote;
pub mod server;
pub mod tools;

pub use config::{Config, Transport};
pub use error::{AuthError, ConfigError, RemoteError};
