//! Shared data models spanning the engine layers.

pub mod alert;
pub mod indicators;
pub mod report;
pub mod series;

pub use alert::{AlertEvent, AlertKind, AlertState};
pub use indicators::RsiIndicator;
pub use report::{RunReport, TickerReport};
pub use series::{PricePoint, PriceSeries};
