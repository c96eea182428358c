use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndicatorError {
    #[error("invalid RSI period {period}")]
    InvalidPeriod { period: usize },

    #[error("not enough data: need at least {required} valid closes, found {available}")]
    InsufficientData { required: usize, available: usize },
}
