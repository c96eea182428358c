//! Alpha Vantage HTTP API data source.
//!
//! Failures are signalled in the JSON body rather than the HTTP status:
//! `"Note"` / `"Information"` mean the quota was hit, `"Error Message"` means
//! the symbol was rejected.
//!
//! Requests are spaced at least `min_interval` apart across every endpoint,
//! since one ticker may need several calls (RSI, quote, daily series).

use crate::config::{AlphaVantageConfig, ALPHAVANTAGE_MIN_DELAY_SECONDS};
use crate::error::AlertError;
use crate::models::series::{PricePoint, PriceSeries};
use crate::services::market_data::DataSource;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub const PROVIDER_NAME: &str = "alphavantage";

const DAILY_KEY: &str = "Time Series (Daily)";
const QUOTE_KEY: &str = "Global Quote";
const RSI_KEY: &str = "Technical Analysis: RSI";

pub struct AlphaVantageSource {
    base_url: String,
    api_key: String,
    output_size: &'static str,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
    client: reqwest::Client,
}

impl AlphaVantageSource {
    pub fn new(config: &AlphaVantageConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &AlphaVantageConfig, client: reqwest::Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            output_size: "compact",
            min_interval: Duration::from_secs(ALPHAVANTAGE_MIN_DELAY_SECONDS),
            last_request: Mutex::new(None),
            client,
        }
    }

    /// Minimum gap between two requests to the API.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    // Holding the lock while sleeping serializes callers.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let wait = (previous + self.min_interval).saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                debug!(wait_ms = wait.as_millis() as u64, "throttling alphavantage request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Request the full daily history instead of the latest 100 points.
    pub fn with_full_history(mut self, full: bool) -> Self {
        self.output_size = if full { "full" } else { "compact" };
        self
    }

    async fn query(&self, symbol: &str, params: &[(&str, &str)]) -> Result<Value, AlertError> {
        let url = format!("{}/query", self.base_url);
        self.throttle().await;
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("symbol", symbol), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AlertError::data_unavailable(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            AlertError::data_unavailable(
                PROVIDER_NAME,
                format!("unexpected response (HTTP {}): {}", status.as_u16(), e),
            )
        })?;

        check_body(symbol, &body)?;
        Ok(body)
    }
}

/// Detect the provider's in-body failure signals.
pub fn check_body(symbol: &str, body: &Value) -> Result<(), AlertError> {
    if body.get("Note").is_some() || body.get("Information").is_some() {
        return Err(AlertError::RateLimited {
            provider: PROVIDER_NAME.to_string(),
        });
    }
    if body.get("Error Message").is_some() {
        return Err(AlertError::InvalidSymbol {
            symbol: symbol.to_string(),
        });
    }
    Ok(())
}

fn section<'a>(body: &'a Value, key: &str) -> Result<&'a Map<String, Value>, AlertError> {
    body.get(key)
        .and_then(Value::as_object)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AlertError::data_unavailable(PROVIDER_NAME, format!("missing '{}'", key)))
}

// Alpha Vantage encodes numbers as strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Parse a `TIME_SERIES_DAILY` body into a price series.
pub fn parse_daily_series(symbol: &str, body: &Value) -> Result<PriceSeries, AlertError> {
    let series = section(body, DAILY_KEY)?;
    let points: Vec<PricePoint> = series
        .iter()
        .filter_map(|(date, bar)| {
            let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
            let close = number(bar.get("4. close")?)?;
            Some(PricePoint::new(day.and_hms_opt(0, 0, 0)?.and_utc(), close))
        })
        .collect();

    if points.is_empty() {
        return Err(AlertError::data_unavailable(PROVIDER_NAME, "no closing prices"));
    }
    Ok(PriceSeries::from_points(symbol, points))
}

/// Parse a `GLOBAL_QUOTE` body into the spot price.
pub fn parse_global_quote(body: &Value) -> Result<f64, AlertError> {
    section(body, QUOTE_KEY)?
        .get("05. price")
        .and_then(number)
        .ok_or_else(|| AlertError::data_unavailable(PROVIDER_NAME, "missing '05. price'"))
}

/// Parse an `RSI` indicator body; returns the value for the most recent date.
pub fn parse_latest_rsi(body: &Value) -> Result<f64, AlertError> {
    section(body, RSI_KEY)?
        .iter()
        .filter_map(|(date, entry)| {
            let day = NaiveDate::parse_from_str(date.get(..10).unwrap_or(date.as_str()), "%Y-%m-%d").ok()?;
            Some((day, number(entry.get("RSI")?)?))
        })
        .max_by_key(|(day, _)| *day)
        .map(|(_, rsi)| rsi)
        .ok_or_else(|| AlertError::data_unavailable(PROVIDER_NAME, "no RSI values"))
}

#[async_trait]
impl DataSource for AlphaVantageSource {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn daily_closes(&self, symbol: &str) -> Result<PriceSeries, AlertError> {
        let body = self
            .query(
                symbol,
                &[("function", "TIME_SERIES_DAILY"), ("outputsize", self.output_size)],
            )
            .await?;
        let series = parse_daily_series(symbol, &body)?;
        debug!(symbol = %symbol, points = series.len(), "alphavantage daily series");
        Ok(series)
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, AlertError> {
        let body = self.query(symbol, &[("function", "GLOBAL_QUOTE")]).await?;
        parse_global_quote(&body)
    }

    async fn provider_rsi(&self, symbol: &str, period: usize) -> Result<Option<f64>, AlertError> {
        let period = period.to_string();
        let body = self
            .query(
                symbol,
                &[
                    ("function", "RSI"),
                    ("interval", "daily"),
                    ("time_period", period.as_str()),
                    ("series_type", "close"),
                ],
            )
            .await?;
        parse_latest_rsi(&body).map(Some)
    }
}
