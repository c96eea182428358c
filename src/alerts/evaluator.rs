//! Threshold crossing detection with duplicate suppression.
//!
//! Rules, first match wins:
//! - `rsi < oversold` and last state != low  -> low, emit Oversold
//! - `rsi > overbought` and last state != high -> high, emit Overbought
//! - in between and last state != neutral -> neutral, no event
//! - otherwise nothing changes

use crate::alerts::state_store::AlertStateStore;
use crate::error::AlertError;
use crate::models::alert::{AlertEvent, AlertKind, AlertState};
use crate::services::notifier::{Email, Notifier};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const OVERSOLD: f64 = 30.0;
pub const OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            oversold: OVERSOLD,
            overbought: OVERBOUGHT,
        }
    }
}

/// RSI zone, independent of any previous state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Low,
    Neutral,
    High,
}

impl Zone {
    pub fn classify(rsi: f64, thresholds: &Thresholds) -> Option<Zone> {
        if !rsi.is_finite() {
            return None;
        }
        if rsi < thresholds.oversold {
            Some(Zone::Low)
        } else if rsi > thresholds.overbought {
            Some(Zone::High)
        } else {
            Some(Zone::Neutral)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// New state to persist, `None` when unchanged.
    pub next: Option<AlertState>,
    pub event: Option<AlertKind>,
}

impl Evaluation {
    const UNCHANGED: Evaluation = Evaluation {
        next: None,
        event: None,
    };

    pub fn state_after(&self, last: AlertState) -> AlertState {
        self.next.unwrap_or(last)
    }
}

pub fn evaluate(rsi: f64, last: AlertState, thresholds: &Thresholds) -> Evaluation {
    match Zone::classify(rsi, thresholds) {
        Some(Zone::Low) if last != AlertState::Low => Evaluation {
            next: Some(AlertState::Low),
            event: Some(AlertKind::Oversold),
        },
        Some(Zone::High) if last != AlertState::High => Evaluation {
            next: Some(AlertState::High),
            event: Some(AlertKind::Overbought),
        },
        Some(Zone::Neutral) if last != AlertState::Neutral => Evaluation {
            next: Some(AlertState::Neutral),
            event: None,
        },
        _ => Evaluation::UNCHANGED,
    }
}

/// What processing one ticker's reading produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertOutcome {
    pub state: AlertState,
    pub event: Option<AlertEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    thresholds: Thresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Read the stored state, then [`apply`](Self::apply) the reading.
    pub async fn process(
        &self,
        ticker: &str,
        rsi: f64,
        store: &dyn AlertStateStore,
        notifier: &dyn Notifier,
    ) -> Result<AlertOutcome, AlertError> {
        let last = store.get(ticker)?;
        self.apply(ticker, rsi, last, store, notifier).await
    }

    /// Evaluate `rsi` against `last`, notify on a transition and persist the
    /// new state.
    ///
    /// The state is written only after the notification succeeded, so a failed
    /// send is retried on the next run.
    pub async fn apply(
        &self,
        ticker: &str,
        rsi: f64,
        last: AlertState,
        store: &dyn AlertStateStore,
        notifier: &dyn Notifier,
    ) -> Result<AlertOutcome, AlertError> {
        let evaluation = evaluate(rsi, last, &self.thresholds);

        let event = evaluation.event.map(|kind| AlertEvent {
            ticker: ticker.to_string(),
            kind,
            rsi,
            threshold: match kind {
                AlertKind::Oversold => self.thresholds.oversold,
                AlertKind::Overbought => self.thresholds.overbought,
            },
        });

        if let Some(ref event) = event {
            info!(
                ticker = %ticker,
                rsi = rsi,
                kind = %event.kind,
                "RSI crossed threshold for {}: {}",
                ticker,
                event.kind
            );
            notifier.send(&Email::from(event)).await?;
        }

        match evaluation.next {
            Some(next) => {
                store.set(ticker, next)?;
                debug!(ticker = %ticker, from = %last, to = %next, "alert state updated");
            }
            None => {
                debug!(ticker = %ticker, state = %last, rsi = rsi, "alert state unchanged");
            }
        }

        Ok(AlertOutcome {
            state: evaluation.state_after(last),
            event,
        })
    }
}
