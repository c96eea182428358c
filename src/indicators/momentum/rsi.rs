//! RSI (Relative Strength Index) indicator
//!
//! RSI = 100 - (100 / (1 + RS))
//! RS = Average Gain / Average Loss
//!
//! Both averages are smoothed with an explicit [`Smoothing`] policy. The output
//! is aligned index-for-index with the input closes; the first `period` valid
//! closes have no RSI.

use crate::indicators::error::IndicatorError;
use crate::models::indicators::RsiIndicator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// RSI reported when there was neither a gain nor a loss in the window.
pub const FLAT_RSI: f64 = 50.0;

/// How average gain and average loss are smoothed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Smoothing {
    /// Trailing simple mean over the last `period` changes.
    #[serde(rename = "simple")]
    SimpleMean,
    /// Wilder's moving average: seeded with the simple mean of the first
    /// `period` changes, then `avg += (x - avg) / period`.
    #[default]
    #[serde(rename = "wilder")]
    Wilder,
}

impl fmt::Display for Smoothing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Smoothing::SimpleMean => write!(f, "simple"),
            Smoothing::Wilder => write!(f, "wilder"),
        }
    }
}

impl FromStr for Smoothing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" | "sma" | "mean" => Ok(Smoothing::SimpleMean),
            "wilder" | "ema" | "rma" => Ok(Smoothing::Wilder),
            other => Err(format!("unknown smoothing '{}' (expected simple or wilder)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsiParams {
    pub period: usize,
    pub smoothing: Smoothing,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: DEFAULT_RSI_PERIOD,
            smoothing: Smoothing::default(),
        }
    }
}

impl RsiParams {
    pub fn new(period: usize, smoothing: Smoothing) -> Self {
        Self { period, smoothing }
    }
}

/// Computed RSI values, one slot per input close.
#[derive(Debug, Clone, PartialEq)]
pub struct RsiSeries {
    values: Vec<Option<f64>>,
    params: RsiParams,
}

impl RsiSeries {
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn params(&self) -> RsiParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Most recent defined RSI value.
    pub fn latest(&self) -> Option<f64> {
        self.values.iter().rev().find_map(|v| *v)
    }

    /// Defined values only, in order.
    pub fn defined(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|v| *v)
    }
}

/// Calculate the RSI series for `closes`.
///
/// Non-finite closes count as missing: they get `None` and are skipped when
/// computing price changes.
pub fn calculate_rsi(closes: &[f64], params: RsiParams) -> Result<RsiSeries, IndicatorError> {
    let period = params.period;
    let required = match period.checked_add(1) {
        Some(required) if period > 0 => required,
        _ => return Err(IndicatorError::InvalidPeriod { period }),
    };

    let positions: Vec<usize> = closes
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_finite())
        .map(|(i, _)| i)
        .collect();

    if positions.len() < required {
        return Err(IndicatorError::InsufficientData {
            required,
            available: positions.len(),
        });
    }

    let valid: Vec<f64> = positions.iter().map(|&i| closes[i]).collect();
    let (gains, losses) = split_changes(&valid);

    let compact = match params.smoothing {
        Smoothing::SimpleMean => simple_mean_rsi(&gains, &losses, period),
        Smoothing::Wilder => wilder_rsi(&gains, &losses, period),
    };

    let mut values = vec![None; closes.len()];
    for (value, &pos) in compact.into_iter().zip(positions.iter()) {
        values[pos] = value;
    }

    Ok(RsiSeries { values, params })
}

/// Calculate only the latest RSI value.
pub fn latest_rsi(closes: &[f64], params: RsiParams) -> Result<RsiIndicator, IndicatorError> {
    let series = calculate_rsi(closes, params)?;
    let available = closes.iter().filter(|c| c.is_finite()).count();
    let value = series.latest().ok_or(IndicatorError::InsufficientData {
        required: params.period.saturating_add(1),
        available,
    })?;

    Ok(RsiIndicator {
        value,
        period: params.period,
        smoothing: params.smoothing,
    })
}

/// RSI from already-smoothed averages, including the zero-loss cases.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { FLAT_RSI } else { 100.0 };
    }

    let rs = avg_gain / avg_loss;
    (100.0 - (100.0 / (1.0 + rs))).clamp(0.0, 100.0)
}

fn split_changes(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip()
}

// `gains[i]` is the change from close `i` to close `i + 1`, so the RSI for
// close `i` uses changes up to `gains[i - 1]`.
fn simple_mean_rsi(gains: &[f64], losses: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; gains.len() + 1];
    let p = period as f64;

    for i in period..=gains.len() {
        let avg_gain = gains[i - period..i].iter().sum::<f64>() / p;
        let avg_loss = losses[i - period..i].iter().sum::<f64>() / p;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    out
}

fn wilder_rsi(gains: &[f64], losses: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; gains.len() + 1];
    let p = period as f64;

    let mut avg_gain = gains[..period].iter().sum::<f64>() / p;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / p;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain += (gains[i] - avg_gain) / p;
        avg_loss += (losses[i] - avg_loss) / p;
        out[i + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    out
}
