use anyhow::Context;
use session_guard::shared::logging::LoggingUtils;
use session_guard::{AppConfig, HttpServer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    LoggingUtils::initialize(&config.logging.level, &config.logging.format)
        .context("failed to initialize logging")?;

    info!("Starting session guard...");

    let server = HttpServer::new(config).context("failed to initialize server")?;
    info!("Server starting on {}", server.config().server_address());

    server.run().await.context("server error")?;
    Ok(())
}
