pub mod error;
pub mod momentum;

pub use error::IndicatorError;
pub use momentum::rsi::{calculate_rsi, latest_rsi, RsiParams, RsiSeries, Smoothing};
