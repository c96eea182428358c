//! Per-ticker and per-run results.

use crate::error::AlertError;
use crate::indicators::momentum::rsi::RsiParams;
use crate::models::alert::{AlertKind, AlertState};
use crate::services::market_data::SourceFailure;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of a run: either a reading or the error that stopped the ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerReport {
    pub ticker: String,
    pub rsi: Option<f64>,
    pub price: Option<f64>,
    /// Alert state after this run.
    pub state: AlertState,
    pub event: Option<AlertKind>,
    /// Provider that supplied the data, if any did.
    pub source: Option<String>,
    pub error: Option<AlertError>,
    /// Providers that were tried and failed before `source` answered.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SourceFailure>,
}

impl TickerReport {
    pub fn failed(
        ticker: impl Into<String>,
        state: AlertState,
        error: AlertError,
        failures: Vec<SourceFailure>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            rsi: None,
            price: None,
            state,
            event: None,
            source: None,
            error: Some(error),
            failures,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Status string shown alongside the row.
    pub fn status(&self) -> String {
        match (&self.error, self.event) {
            (Some(err), _) => format!("Error: {}", err),
            (None, Some(kind)) => format!("Alert sent: {}", kind),
            (None, None) => "OK".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub params: RsiParams,
    pub reports: Vec<TickerReport>,
    /// Set when any provider signalled its quota during the run.
    pub rate_limited: bool,
}

impl RunReport {
    pub fn alerts_sent(&self) -> usize {
        self.reports.iter().filter(|r| r.event.is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_ok()).count()
    }

    pub fn get(&self, ticker: &str) -> Option<&TickerReport> {
        self.reports.iter().find(|r| r.ticker == ticker)
    }
}
