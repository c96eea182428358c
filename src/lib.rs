//! rsiwatch: daily RSI threshold alerts for a list of tickers.
//!
//! Prices come from Yahoo Finance and/or Alpha Vantage, the RSI is computed
//! locally (or taken from the provider), and a transition into the oversold or
//! overbought zone triggers one email per transition.

pub mod alerts;
pub mod config;
pub mod core;
pub mod error;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;

pub use error::AlertError;
