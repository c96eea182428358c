//! Yahoo Finance chart API data source.
//!
//! `GET {base}/v8/finance/chart/{symbol}?range=3mo&interval=1d`

use crate::error::AlertError;
use crate::models::series::{PricePoint, PriceSeries};
use crate::services::market_data::DataSource;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

pub const PROVIDER_NAME: &str = "yahoo";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; rsiwatch/0.1)";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Smallest Yahoo range that covers `period + 1` trading days.
pub fn range_for_period(period: usize) -> &'static str {
    match period {
        0..=40 => "3mo",
        41..=100 => "6mo",
        101..=220 => "1y",
        221..=450 => "2y",
        _ => "5y",
    }
}

pub struct YahooSource {
    base_url: String,
    range: String,
    client: reqwest::Client,
}

impl YahooSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            range: "3mo".to_string(),
            client,
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    /// `{base}/v8/finance/chart/{symbol}` with the symbol encoded as a single
    /// path segment (`BRK/B` becomes `BRK%2FB`).
    pub fn chart_url(&self, symbol: &str) -> Result<Url, AlertError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            AlertError::data_unavailable(PROVIDER_NAME, format!("invalid base url: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| AlertError::data_unavailable(PROVIDER_NAME, "base url cannot take a path"))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    async fn fetch_chart(&self, symbol: &str) -> Result<ChartResult, AlertError> {
        let url = self.chart_url(symbol)?;
        let response = self
            .client
            .get(url)
            .query(&[("range", self.range.as_str()), ("interval", "1d")])
            .send()
            .await
            .map_err(|e| AlertError::data_unavailable(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AlertError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AlertError::data_unavailable(PROVIDER_NAME, e.to_string()))?;
        let envelope: ChartEnvelope = serde_json::from_str(&body).map_err(|e| {
            AlertError::data_unavailable(
                PROVIDER_NAME,
                format!("unexpected response (HTTP {}): {}", status.as_u16(), e),
            )
        })?;

        if let Some(err) = envelope.chart.error {
            debug!(symbol = %symbol, code = %err.code, description = %err.description, "yahoo chart error");
            return Err(if err.code.eq_ignore_ascii_case("Not Found") {
                AlertError::InvalidSymbol {
                    symbol: symbol.to_string(),
                }
            } else {
                AlertError::data_unavailable(PROVIDER_NAME, format!("{}: {}", err.code, err.description))
            });
        }

        envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| AlertError::data_unavailable(PROVIDER_NAME, "empty chart result"))
    }
}

#[async_trait]
impl DataSource for YahooSource {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn daily_closes(&self, symbol: &str) -> Result<PriceSeries, AlertError> {
        let chart = self.fetch_chart(symbol).await?;
        let closes = chart
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        let points: Vec<PricePoint> = chart
            .timestamp
            .iter()
            .zip(closes)
            .filter_map(|(&ts, close)| {
                let close = close?;
                let timestamp = Utc.timestamp_opt(ts, 0).single()?;
                Some(PricePoint::new(timestamp, close))
            })
            .collect();

        if points.is_empty() {
            return Err(AlertError::data_unavailable(PROVIDER_NAME, "no closing prices"));
        }

        Ok(PriceSeries::from_points(symbol, points))
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, AlertError> {
        let chart = self.fetch_chart(symbol).await?;
        if let Some(price) = chart.meta.regular_market_price {
            return Ok(price);
        }
        chart
            .indicators
            .quote
            .into_iter()
            .next()
            .and_then(|q| q.close.into_iter().rev().flatten().next())
            .ok_or_else(|| AlertError::data_unavailable(PROVIDER_NAME, "no price in chart"))
    }
}
