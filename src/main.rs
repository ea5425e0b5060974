use std::sync::Arc;

use satellite_siege::config::HostConfig;
use satellite_siege::host::{load_map, MatchHost};
use satellite_siege::metrics::{self, Metrics};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Satellite Siege host v{}", env!("CARGO_PKG_VERSION"));

    let config = HostConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {} Hz, seed {}, speed {}, strategy {:?}",
        config.tick_rate, config.seed, config.game_speed, config.strategy
    );

    let metrics = Arc::new(Metrics::new());
    let metrics_clone = metrics.clone();
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_clone, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    let map = load_map(config.map_path.as_deref())?;
    let host = MatchHost::new(config, map, metrics)?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        last = host.run() => {
            if let Some(snapshot) = last {
                info!("Final snapshot: {}", serde_json::to_string(&snapshot)?);
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    info!("Host stopped");
    Ok(())
}
