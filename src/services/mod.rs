//! External collaborators: market data, ticker lists, notifications.

pub mod alpha_vantage;
pub mod market_data;
pub mod notifier;
pub mod tickers;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageSource;
pub use market_data::{DataSource, RsiLookup, RsiOrigin, SourceChain, SourceFailure};
pub use notifier::{Email, LogNotifier, Notifier, SmtpNotifier};
pub use tickers::{load_tickers, parse_ticker_list, TickerSource};
pub use yahoo::YahooSource;
