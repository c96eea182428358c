//! Prometheus metrics for runs and the dashboard HTTP surface.

use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,
    pub tickers_processed_total: IntCounter,
    pub ticker_errors_total: IntCounterVec,
    pub alerts_sent_total: IntCounterVec,
    pub rate_limited_runs_total: IntCounter,
    pub run_duration_seconds: Histogram,
    pub latest_rsi: GaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total HTTP requests served")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "HTTP requests currently being served")?;
        let tickers_processed_total =
            IntCounter::new("rsi_tickers_processed_total", "Tickers processed across all runs")?;
        let ticker_errors_total = IntCounterVec::new(
            Opts::new("rsi_ticker_errors_total", "Per-ticker failures by kind"),
            &["kind"],
        )?;
        let alerts_sent_total = IntCounterVec::new(
            Opts::new("rsi_alerts_sent_total", "Alert notifications sent by kind"),
            &["kind"],
        )?;
        let rate_limited_runs_total = IntCounter::new(
            "rsi_rate_limited_runs_total",
            "Runs during which a provider reported its quota",
        )?;
        let run_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("rsi_run_duration_seconds", "Duration of a full run in seconds")
                .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        )?;
        let latest_rsi = GaugeVec::new(
            Opts::new("rsi_latest_value", "Latest RSI value per ticker"),
            &["ticker"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(tickers_processed_total.clone()))?;
        registry.register(Box::new(ticker_errors_total.clone()))?;
        registry.register(Box::new(alerts_sent_total.clone()))?;
        registry.register(Box::new(rate_limited_runs_total.clone()))?;
        registry.register(Box::new(run_duration_seconds.clone()))?;
        registry.register(Box::new(latest_rsi.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            tickers_processed_total,
            ticker_errors_total,
            alerts_sent_total,
            rate_limited_runs_total,
            run_duration_seconds,
            latest_rsi,
        })
    }

    /// Text exposition format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
