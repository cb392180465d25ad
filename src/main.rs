use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use solar_advisor::build_orchestrator;
use solar_advisor::config::Config;
use solar_advisor::routes::create_router;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();

    let orchestrator = match build_orchestrator(&config).await {
        Ok(orchestrator) => Arc::new(orchestrator),
        Err(e) => {
            tracing::error!("main: Service initialization failed: {}", e);
            return Err(e.into());
        }
    };

    let bind: SocketAddr = config
        .server
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server.bind '{}': {e}", config.server.bind))?;

    let router = create_router(orchestrator, &config.server.cors_origins);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        %bind,
        model = %config.generation.model,
        backend = %config.session.backend,
        "Starting solar advisor chat server"
    );

    axum::serve(listener, router).await?;
    tracing::info!("main: Server shut down");
    Ok(())
}
