//! Wiring from configuration to a running gateway

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::auth::CredentialResolver;
use crate::config::{Config, Transport};
use crate::permissions::{PermissionOracle, PermissionSource, ToolCapabilityFilter};
use crate::remote::{ClientOptions, RemoteClient};
use crate::server::{self, AccessMode, GatewayHandler};
use crate::tools::{register_builtin_tools, ToolRegistry};

/// Build the handler for `config` without starting a transport
pub fn build_handler(config: &Config) -> Result<GatewayHandler> {
    let resolver =
        CredentialResolver::context_then_fixed(config.api_host.clone(), config.api_token.clone());
    let client = Arc::new(
        RemoteClient::with_options(
            resolver,
            ClientOptions {
                skip_tls_verification: config.skip_tls_verification,
                ..Default::default()
            },
        )
        .context("failed to build remote API client")?,
    );

    let mut registry = ToolRegistry::new().with_overrides(config.tool_permissions.clone());
    register_builtin_tools(&mut registry, client.clone())?;
    tracing::info!("[App] Registered {} tools", registry.len());

    let source: Arc<dyn PermissionSource> = client;
    let mode = match config.transport {
        Transport::Stdio => AccessMode::SingleIdentity(Arc::new(PermissionOracle::new(source.clone()))),
        Transport::StreamableHttp => AccessMode::MultiTenant,
    };

    Ok(GatewayHandler::new(
        Arc::new(registry),
        ToolCapabilityFilter::new(source),
        mode,
    ))
}

/// Serve the gateway over the configured transport until it stops
pub async fn run(config: Config) -> Result<()> {
    let handler = build_handler(&config)?;

    match config.transport {
        Transport::Stdio => server::serve_stdio(handler).await,
        Transport::StreamableHttp => {
            server::serve_streamable_http(handler, &config.listen_addr(), &config.mount_path).await
        }
    }
}
