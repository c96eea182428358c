//! Market data provider interface and the ordered fallback chain.

use crate::error::AlertError;
use crate::models::series::PriceSeries;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Provider name used in logs and reports.
    fn name(&self) -> &str;

    /// Daily closing prices, oldest first.
    async fn daily_closes(&self, symbol: &str) -> Result<PriceSeries, AlertError>;

    /// Latest traded price for a symbol.
    async fn latest_price(&self, symbol: &str) -> Result<f64, AlertError> {
        let series = self.daily_closes(symbol).await?;
        series
            .last_close()
            .ok_or_else(|| AlertError::data_unavailable(self.name(), "empty price series"))
    }

    /// Provider-computed RSI, if this provider offers one.
    async fn provider_rsi(&self, _symbol: &str, _period: usize) -> Result<Option<f64>, AlertError> {
        Ok(None)
    }
}

/// Where the RSI value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiOrigin {
    /// Computed locally from daily closes.
    #[default]
    Local,
    /// Taken from the provider's indicator endpoint when available.
    Provider,
}

impl fmt::Display for RsiOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsiOrigin::Local => write!(f, "local"),
            RsiOrigin::Provider => write!(f, "provider"),
        }
    }
}

impl FromStr for RsiOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "computed" => Ok(RsiOrigin::Local),
            "provider" | "remote" => Ok(RsiOrigin::Provider),
            other => Err(format!("unknown RSI origin '{}' (expected local or provider)", other)),
        }
    }
}

/// A provider that was tried and failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub provider: String,
    pub error: AlertError,
}

/// Result of asking the chain for something: the value, which provider
/// answered, and every failure along the way.
#[derive(Debug, Clone)]
pub struct Sourced<T> {
    pub value: T,
    pub provider: String,
    pub failures: Vec<SourceFailure>,
}

/// Outcome of asking the chain for a provider-computed RSI.
#[derive(Debug, Clone)]
pub enum RsiLookup {
    Found(Sourced<f64>),
    /// No provider answered; carries the failures seen on the way.
    Unavailable(Vec<SourceFailure>),
}

/// Chain exhausted without a success.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainFailure {
    pub error: AlertError,
    pub failures: Vec<SourceFailure>,
}

/// Ordered list of data sources; the first success wins.
///
/// A provider that reports its quota is skipped for the remainder of the
/// chain's lifetime, which is one run.
pub struct SourceChain {
    sources: Vec<Arc<dyn DataSource>>,
    exhausted: Mutex<HashSet<String>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Arc<dyn DataSource>>) -> Self {
        Self {
            sources,
            exhausted: Mutex::new(HashSet::new()),
        }
    }

    pub fn single(source: Arc<dyn DataSource>) -> Self {
        Self::new(vec![source])
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Whether any provider hit its quota so far.
    pub fn is_rate_limited(&self) -> bool {
        self.exhausted.lock().map(|set| !set.is_empty()).unwrap_or(false)
    }

    /// Forget quota signals, e.g. before a new run.
    pub fn reset(&self) {
        if let Ok(mut set) = self.exhausted.lock() {
            set.clear();
        }
    }

    fn is_exhausted(&self, name: &str) -> bool {
        self.exhausted
            .lock()
            .map(|set| set.contains(name))
            .unwrap_or(false)
    }

    fn mark_exhausted(&self, name: &str) {
        if let Ok(mut set) = self.exhausted.lock() {
            set.insert(name.to_string());
        }
    }

    pub async fn daily_closes(&self, symbol: &str) -> Result<Sourced<PriceSeries>, ChainFailure> {
        let mut failures = Vec::new();

        for source in &self.sources {
            let name = source.name().to_string();
            if self.is_exhausted(&name) {
                failures.push(SourceFailure {
                    provider: name.clone(),
                    error: AlertError::RateLimited { provider: name },
                });
                continue;
            }

            match source.daily_closes(symbol).await {
                Ok(series) if !series.is_empty() => {
                    debug!(symbol = %symbol, provider = %name, points = series.len(), "fetched daily closes");
                    return Ok(Sourced {
                        value: series,
                        provider: name,
                        failures,
                    });
                }
                Ok(_) => {
                    let error = AlertError::data_unavailable(&name, "empty price series");
                    self.record_failure(symbol, &name, &error);
                    failures.push(SourceFailure { provider: name, error });
                }
                Err(error) => {
                    self.record_failure(symbol, &name, &error);
                    failures.push(SourceFailure { provider: name, error });
                }
            }
        }

        Err(Self::exhausted_failure(failures))
    }

    /// Ask providers for a computed RSI; providers that don't offer one are
    /// skipped without counting as failures.
    pub async fn provider_rsi(
        &self,
        symbol: &str,
        period: usize,
    ) -> Result<RsiLookup, ChainFailure> {
        let mut failures = Vec::new();

        for source in &self.sources {
            let name = source.name().to_string();
            if self.is_exhausted(&name) {
                continue;
            }

            match source.provider_rsi(symbol, period).await {
                Ok(Some(value)) => {
                    return Ok(RsiLookup::Found(Sourced {
                        value,
                        provider: name,
                        failures,
                    }))
                }
                Ok(None) => {}
                Err(error) => {
                    self.record_failure(symbol, &name, &error);
                    failures.push(SourceFailure { provider: name, error });
                }
            }
        }

        // An invalid symbol will not improve with local computation.
        if let Some(invalid) = failures
            .iter()
            .find(|f| matches!(f.error, AlertError::InvalidSymbol { .. }))
        {
            return Err(ChainFailure {
                error: invalid.error.clone(),
                failures,
            });
        }
        Ok(RsiLookup::Unavailable(failures))
    }

    pub async fn latest_price(&self, symbol: &str) -> Option<f64> {
        for source in &self.sources {
            if self.is_exhausted(source.name()) {
                continue;
            }
            match source.latest_price(symbol).await {
                Ok(price) => return Some(price),
                Err(error) => self.record_failure(symbol, source.name(), &error),
            }
        }
        None
    }

    fn record_failure(&self, symbol: &str, provider: &str, error: &AlertError) {
        if error.is_rate_limited() {
            self.mark_exhausted(provider);
        }
        warn!(
            symbol = %symbol,
            provider = %provider,
            error = %error,
            "data source failed for {}",
            symbol
        );
    }

    // The most specific error wins: an invalid symbol beats a quota signal,
    // which beats a generic outage.
    fn exhausted_failure(failures: Vec<SourceFailure>) -> ChainFailure {
        let rank = |e: &AlertError| match e {
            AlertError::InvalidSymbol { .. } => 0,
            AlertError::InsufficientData { .. } => 1,
            AlertError::RateLimited { .. } => 2,
            _ => 3,
        };
        let error = failures
            .iter()
            .map(|f| &f.error)
            .min_by_key(|e| rank(e))
            .cloned()
            .unwrap_or_else(|| AlertError::data_unavailable("none", "no data sources configured"));
        ChainFailure { error, failures }
    }
}
