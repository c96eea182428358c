//! rsiwatch Dashboard
//!
//! Serves the latest RSI table as an HTML page and JSON, and runs checks on
//! demand over the configured or an uploaded ticker list.

use dotenvy::dotenv;
use rsiwatch::config::Config;
use rsiwatch::core::bootstrap::build_runner;
use rsiwatch::core::http::{start_server, AppState};
use rsiwatch::logging;
use rsiwatch::metrics::Metrics;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    logging::init_logging();

    let config = Config::from_env()?;
    let port = config.port;

    info!("Starting rsiwatch dashboard");
    info!(environment = %config.environment, "Environment");
    info!(tickers = %config.tickers.describe(), "Ticker source");

    let metrics = Arc::new(Metrics::new()?);
    let runner = Arc::new(build_runner(&config, Some(metrics.clone()))?);
    let state = AppState::new(metrics, runner, config.tickers.clone());

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(state, port).await {
            error!(error = %e, "HTTP server error");
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down dashboard...");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
