//! Snake server binary

use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Snake Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration, from the path given as the first argument if any
    let config = match std::env::args().nth(1) {
        Some(path) => server::Config::load_from(Path::new(&path))?,
        None => server::Config::load()?,
    };
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  World: {} ({} walls)", config.world.size, config.walls.len());
    info!("  Mode: {:?}", config.world.mode);
    info!("  Frame: {}ms", config.server.tick_interval_ms);

    server::run(config).await?;

    Ok(())
}
