//! rsiwatch one-shot run
//!
//! Loads the ticker list, checks each ticker's RSI, emails on threshold
//! transitions and prints a table. Meant to be invoked from cron.

use dotenvy::dotenv;
use rsiwatch::config::Config;
use rsiwatch::core::bootstrap::build_runner;
use rsiwatch::core::presentation::render_console_table;
use rsiwatch::error::AlertError;
use rsiwatch::logging;
use rsiwatch::services::tickers::{load_tickers, TickerSource};
use std::env;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let mut config = Config::from_env()?;

    // An optional first argument overrides TICKERS_SOURCE.
    if let Some(arg) = env::args().nth(1) {
        config.tickers = TickerSource::parse(&arg);
    }

    info!(
        environment = %config.environment,
        tickers = %config.tickers.describe(),
        period = config.rsi.period,
        smoothing = %config.rsi.smoothing,
        "Starting rsiwatch run"
    );

    let client = reqwest::Client::new();
    let tickers = match load_tickers(&config.tickers, &client).await {
        Ok(tickers) => tickers,
        Err(AlertError::TickerListUnavailable(reason)) => {
            warn!(reason = %reason, "ticker list unavailable");
            println!("Ticker file not found.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if tickers.is_empty() {
        warn!(source = %config.tickers.describe(), "ticker list is empty");
        return Ok(());
    }

    let runner = build_runner(&config, None)?;
    let report = runner.run(&tickers).await;

    print!("{}", render_console_table(&report));

    for row in report.reports.iter().filter(|r| !r.is_ok()) {
        error!(ticker = %row.ticker, status = %row.status(), "Error processing {}", row.ticker);
    }

    Ok(())
}
