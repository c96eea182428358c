//! Sequential run over a ticker list.
//!
//! Tickers are processed one at a time with a fixed delay between them, which
//! keeps a single API key under Alpha Vantage's per-minute quota. Every
//! failure is confined to its ticker's row.

use crate::alerts::evaluator::{AlertEvaluator, Thresholds};
use crate::alerts::state_store::AlertStateStore;
use crate::error::AlertError;
use crate::indicators::momentum::rsi::{latest_rsi, RsiParams};
use crate::metrics::Metrics;
use crate::models::alert::AlertState;
use crate::models::report::{RunReport, TickerReport};
use crate::services::market_data::{
    ChainFailure, RsiLookup, RsiOrigin, SourceChain, SourceFailure,
};
use crate::services::notifier::Notifier;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// RSI and price for one ticker, before alert evaluation.
#[derive(Debug, Clone)]
struct Reading {
    rsi: f64,
    price: Option<f64>,
    provider: String,
    failures: Vec<SourceFailure>,
}

pub struct Runner {
    chain: Arc<SourceChain>,
    store: Arc<dyn AlertStateStore>,
    notifier: Arc<dyn Notifier>,
    evaluator: AlertEvaluator,
    params: RsiParams,
    origin: RsiOrigin,
    request_delay: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl Runner {
    pub fn new(
        chain: Arc<SourceChain>,
        store: Arc<dyn AlertStateStore>,
        notifier: Arc<dyn Notifier>,
        params: RsiParams,
    ) -> Self {
        Self {
            chain,
            store,
            notifier,
            evaluator: AlertEvaluator::default(),
            params,
            origin: RsiOrigin::Local,
            request_delay: Duration::ZERO,
            metrics: None,
        }
    }

    pub fn with_origin(mut self, origin: RsiOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.evaluator = AlertEvaluator::new(thresholds);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn params(&self) -> RsiParams {
        self.params
    }

    pub async fn run(&self, tickers: &[String]) -> RunReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        self.chain.reset();

        info!(
            tickers = tickers.len(),
            period = self.params.period,
            smoothing = %self.params.smoothing,
            origin = %self.origin,
            providers = ?self.chain.names(),
            "starting RSI run over {} tickers",
            tickers.len()
        );

        let mut reports = Vec::with_capacity(tickers.len());
        for (i, ticker) in tickers.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
            reports.push(self.process_ticker(ticker).await);
        }

        let rate_limited = self.chain.is_rate_limited();
        if rate_limited {
            warn!(
                providers = ?self.chain.names(),
                "market data quota exceeded during this run; affected tickers were skipped or served by a fallback provider"
            );
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            params: self.params,
            reports,
            rate_limited,
        };

        if let Some(ref metrics) = self.metrics {
            metrics.run_duration_seconds.observe(clock.elapsed().as_secs_f64());
            if rate_limited {
                metrics.rate_limited_runs_total.inc();
            }
        }

        info!(
            tickers = report.reports.len(),
            alerts = report.alerts_sent(),
            failed = report.failed(),
            "RSI run finished"
        );
        report
    }

    /// Fetch, compute, evaluate and notify for one ticker.
    pub async fn process_ticker(&self, ticker: &str) -> TickerReport {
        let report = match self.read(ticker).await {
            Ok(reading) => self.evaluate(ticker, reading).await,
            Err(failure) => {
                let state = self.store.get(ticker).unwrap_or_default();
                warn!(
                    ticker = %ticker,
                    error = %failure.error,
                    "failed to process {}: {}",
                    ticker,
                    failure.error
                );
                TickerReport::failed(ticker, state, failure.error, failure.failures)
            }
        };

        self.record_metrics(&report);
        report
    }

    async fn read(&self, ticker: &str) -> Result<Reading, ChainFailure> {
        let mut failures = Vec::new();

        if self.origin == RsiOrigin::Provider {
            match self.chain.provider_rsi(ticker, self.params.period).await? {
                RsiLookup::Found(sourced) => {
                    let price = self.chain.latest_price(ticker).await;
                    return Ok(Reading {
                        rsi: sourced.value,
                        price,
                        provider: sourced.provider,
                        failures: sourced.failures,
                    });
                }
                RsiLookup::Unavailable(lookup_failures) => {
                    debug!(ticker = %ticker, "no provider RSI available; computing locally");
                    failures.extend(lookup_failures);
                }
            }
        }

        let sourced = match self.chain.daily_closes(ticker).await {
            Ok(sourced) => sourced,
            Err(mut failure) => {
                failures.append(&mut failure.failures);
                failure.failures = failures;
                return Err(failure);
            }
        };
        failures.extend(sourced.failures);

        let closes = sourced.value.closes();
        let rsi = latest_rsi(&closes, self.params).map_err(|e| ChainFailure {
            error: AlertError::from(e),
            failures: failures.clone(),
        })?;

        debug!(
            ticker = %ticker,
            provider = %sourced.provider,
            closes = closes.len(),
            rsi = rsi.value,
            "computed RSI"
        );

        Ok(Reading {
            rsi: rsi.value,
            price: sourced.value.last_close(),
            provider: sourced.provider,
            failures,
        })
    }

    async fn evaluate(&self, ticker: &str, reading: Reading) -> TickerReport {
        let mut report = TickerReport {
            ticker: ticker.to_string(),
            rsi: Some(reading.rsi),
            price: reading.price,
            state: AlertState::None,
            event: None,
            source: Some(reading.provider),
            error: None,
            failures: reading.failures,
        };

        let last = match self.store.get(ticker) {
            Ok(state) => state,
            Err(error) => {
                warn!(ticker = %ticker, error = %error, "failed to read alert state");
                report.error = Some(error);
                return report;
            }
        };
        report.state = last;

        match self
            .evaluator
            .apply(ticker, reading.rsi, last, self.store.as_ref(), self.notifier.as_ref())
            .await
        {
            Ok(outcome) => {
                report.state = outcome.state;
                report.event = outcome.event.map(|e| e.kind);
            }
            Err(error) => {
                warn!(ticker = %ticker, error = %error, "alert handling failed for {}", ticker);
                report.error = Some(error);
            }
        }

        report
    }

    fn record_metrics(&self, report: &TickerReport) {
        let Some(ref metrics) = self.metrics else {
            return;
        };

        metrics.tickers_processed_total.inc();
        if let Some(ref error) = report.error {
            metrics.ticker_errors_total.with_label_values(&[error.kind()]).inc();
        }
        if let Some(kind) = report.event {
            metrics.alerts_sent_total.with_label_values(&[kind.as_str()]).inc();
        }
        if let Some(rsi) = report.rsi {
            metrics.latest_rsi.with_label_values(&[report.ticker.as_str()]).set(rsi);
        }
    }
}
