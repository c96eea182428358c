use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Last alert zone persisted per ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    #[default]
    None,
    Low,
    High,
    Neutral,
}

impl AlertState {
    /// Token stored in the state slot.
    pub fn as_token(&self) -> &'static str {
        match self {
            AlertState::None => "none",
            AlertState::Low => "low",
            AlertState::High => "high",
            AlertState::Neutral => "neutral",
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for AlertState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" | "" => Ok(AlertState::None),
            "low" => Ok(AlertState::Low),
            "high" => Ok(AlertState::High),
            "neutral" => Ok(AlertState::Neutral),
            other => Err(format!("unknown alert state '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Oversold,
    Overbought,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Oversold => "oversold",
            AlertKind::Overbought => "overbought",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlertKind::Oversold => "Oversold",
            AlertKind::Overbought => "Overbought",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A threshold crossing, handed straight to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub ticker: String,
    pub kind: AlertKind,
    pub rsi: f64,
    /// Threshold that was crossed.
    pub threshold: f64,
}

impl AlertEvent {
    pub fn subject(&self) -> String {
        format!("RSI Alert for {}: {}", self.ticker, self.kind.label())
    }

    pub fn body(&self) -> String {
        match self.kind {
            AlertKind::Oversold => format!(
                "RSI dropped below {}. Current RSI: {:.2}",
                self.threshold, self.rsi
            ),
            AlertKind::Overbought => format!(
                "RSI rose above {}. Current RSI: {:.2}",
                self.threshold, self.rsi
            ),
        }
    }
}
