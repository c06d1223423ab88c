//! Transports the gateway can be served over

use anyhow::{Context, Result};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, tower::StreamableHttpService,
};
use rmcp::transport::StreamableHttpServerConfig;
use rmcp::ServiceExt;

use super::handler::GatewayHandler;

/// Serve a single client over stdin/stdout until it disconnects
pub async fn serve_stdio(handler: GatewayHandler) -> Result<()> {
    tracing::info!("[Transport] Serving MCP over stdio");
    let service = handler
        .serve(rmcp::transport::stdio())
        .await
        .context("failed to start stdio transport")?;
    service.waiting().await?;
    tracing::info!("[Transport] stdio client disconnected");
    Ok(())
}

/// Router serving the MCP streamable HTTP endpoint at `mount_path`
///
/// `mount_path` must start with `/` and must not be `/` itself.
pub fn streamable_http_router(handler: GatewayHandler, mount_path: &str) -> axum::Router {
    let service = StreamableHttpService::new(
        move || Ok(handler.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    axum::Router::new().nest_service(mount_path, service)
}

/// Serve many clients over streamable HTTP at `mount_path` until ctrl-c
pub async fn serve_streamable_http(
    handler: GatewayHandler,
    addr: &str,
    mount_path: &str,
) -> Result<()> {
    let router = streamable_http_router(handler, mount_path);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(
        "[Transport] Serving MCP over streamable HTTP at http://{}{}",
        addr,
        mount_path
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    tracing::info!("[Transport] HTTP server stopped");
    Ok(())
}
