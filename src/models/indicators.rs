use crate::indicators::momentum::rsi::Smoothing;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiIndicator {
    pub value: f64,
    pub period: usize,
    pub smoothing: Smoothing,
}
