//! Per-ticker error taxonomy.
//!
//! Every variant is non-fatal for a run: the runner records it on the ticker's
//! row and moves on to the next ticker.

use crate::indicators::IndicatorError;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AlertError {
    #[error("insufficient data: need {required} closes, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("data unavailable from {provider}: {reason}")]
    DataUnavailable { provider: String, reason: String },

    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("invalid symbol '{symbol}'")]
    InvalidSymbol { symbol: String },

    #[error("notification failed: {0}")]
    NotificationFailure(String),

    #[error("state store error: {0}")]
    StateStore(String),

    #[error("ticker list unavailable: {0}")]
    TickerListUnavailable(String),

    #[error("invalid indicator parameters: {0}")]
    InvalidParameters(String),
}

impl AlertError {
    pub fn data_unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Short tag used in status columns and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::DataUnavailable { .. } => "data_unavailable",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidSymbol { .. } => "invalid_symbol",
            Self::NotificationFailure(_) => "notification_failure",
            Self::StateStore(_) => "state_store",
            Self::TickerListUnavailable(_) => "ticker_list_unavailable",
            Self::InvalidParameters(_) => "invalid_parameters",
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl From<IndicatorError> for AlertError {
    fn from(err: IndicatorError) -> Self {
        match err {
            IndicatorError::InsufficientData {
                required,
                available,
            } => Self::InsufficientData {
                required,
                available,
            },
            other => Self::InvalidParameters(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AlertError {
    fn from(err: std::io::Error) -> Self {
        Self::StateStore(err.to_string())
    }
}

impl Serialize for AlertError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AlertError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
