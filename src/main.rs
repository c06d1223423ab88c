use anyhow::{Context, Result};

use permgate::{app, logging, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    logging::init_logging(&config.logging)?;

    tracing::info!(
        "[Main] Starting {} {} ({:?} transport)",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.transport
    );
    tracing::debug!("[Main] Configuration: {:?}", config);

    app::run(config).await
}
