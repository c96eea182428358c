//! Wiring from [`Config`] to a ready [`Runner`].

use crate::alerts::state_store::FileStateStore;
use crate::config::{Config, SourceKind};
use crate::core::runner::Runner;
use crate::error::AlertError;
use crate::metrics::Metrics;
use crate::services::alpha_vantage::AlphaVantageSource;
use crate::services::market_data::{DataSource, SourceChain};
use crate::services::notifier::{LogNotifier, Notifier, SmtpNotifier};
use crate::services::yahoo::{range_for_period, YahooSource};
use std::sync::Arc;
use tracing::{info, warn};

pub fn build_chain(config: &Config) -> SourceChain {
    let mut sources: Vec<Arc<dyn DataSource>> = Vec::new();

    for kind in &config.sources {
        match kind {
            SourceKind::Yahoo => {
                let source = YahooSource::new(config.yahoo_base_url.clone())
                    .with_range(range_for_period(config.rsi.period));
                sources.push(Arc::new(source));
            }
            SourceKind::AlphaVantage => match config.alpha_vantage {
                Some(ref av) => {
                    // compact output holds 100 daily bars
                    let source = AlphaVantageSource::new(av)
                        .with_full_history(config.rsi.period >= 100)
                        .with_min_interval(config.request_delay);
                    sources.push(Arc::new(source));
                }
                None => warn!("alphavantage listed in DATA_SOURCES without an API key; skipping"),
            },
        }
    }

    SourceChain::new(sources)
}

pub fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>, AlertError> {
    match config.email {
        Some(ref email) => {
            info!(to = %email.to, host = %email.smtp_host, "email alerts enabled");
            Ok(Arc::new(SmtpNotifier::new(email)?))
        }
        None => {
            warn!("EMAIL_FROM/EMAIL_TO/EMAIL_PASS not set; alerts will only be logged");
            Ok(Arc::new(LogNotifier::new()))
        }
    }
}

pub fn build_runner(config: &Config, metrics: Option<Arc<Metrics>>) -> Result<Runner, AlertError> {
    let chain = Arc::new(build_chain(config));
    let store = Arc::new(FileStateStore::from_config(&config.state));
    let notifier = build_notifier(config)?;

    let mut runner = Runner::new(chain, store, notifier, config.rsi)
        .with_origin(config.rsi_origin)
        .with_request_delay(config.request_delay);
    if let Some(metrics) = metrics {
        runner = runner.with_metrics(metrics);
    }
    Ok(runner)
}
