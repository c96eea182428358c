//! Runtime configuration loaded from the environment (and `.env` via dotenvy).
//!
//! Nothing outside this module reads environment variables for credentials or
//! provider settings; the resulting [`Config`] is handed to the data sources and
//! the notifier at construction time.

use crate::indicators::momentum::rsi::{RsiParams, Smoothing, DEFAULT_RSI_PERIOD};
use crate::services::market_data::RsiOrigin;
use crate::services::tickers::TickerSource;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_ALPHAVANTAGE_BASE_URL: &str = "https://www.alphavantage.co";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_STATE_PREFIX: &str = "rsi_last_alert.txt";

/// Longest accepted `RSI_PERIOD`; providers serve a few thousand daily bars at most.
pub const MAX_RSI_PERIOD: usize = 1000;

/// Alpha Vantage's free tier allows 5 calls per minute.
pub const ALPHAVANTAGE_MIN_DELAY_SECONDS: u64 = 12;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("missing required setting {0}")]
    Missing(&'static str),
}

/// Market data providers that can appear in `DATA_SOURCES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Yahoo,
    AlphaVantage,
}

impl SourceKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yahoo" | "yfinance" => Some(Self::Yahoo),
            "alphavantage" | "alpha_vantage" | "alpha-vantage" => Some(Self::AlphaVantage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    pub from: String,
    pub to: String,
    pub password: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateConfig {
    pub dir: PathBuf,
    pub prefix: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: env::temp_dir(),
            prefix: DEFAULT_STATE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub environment: String,
    pub tickers: TickerSource,
    pub rsi: RsiParams,
    pub rsi_origin: RsiOrigin,
    pub sources: Vec<SourceKind>,
    pub yahoo_base_url: String,
    pub alpha_vantage: Option<AlphaVantageConfig>,
    pub request_delay: Duration,
    pub state: StateConfig,
    pub email: Option<EmailConfig>,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            tickers: TickerSource::File(PathBuf::from("tickers.txt")),
            rsi: RsiParams::default(),
            rsi_origin: RsiOrigin::Local,
            sources: vec![SourceKind::Yahoo],
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            alpha_vantage: None,
            request_delay: Duration::from_secs(1),
            state: StateConfig::default(),
            email: None,
            port: 8080,
        }
    }
}

impl Config {
    /// Load from the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a local `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let environment = get("APP_ENV").unwrap_or(defaults.environment);

        let tickers = get("TICKERS_SOURCE")
            .map(|raw| TickerSource::parse(&raw))
            .unwrap_or(defaults.tickers);

        let period = match get("RSI_PERIOD") {
            Some(raw) => parse_number::<usize>("RSI_PERIOD", &raw)?,
            None => DEFAULT_RSI_PERIOD,
        };
        if !(1..=MAX_RSI_PERIOD).contains(&period) {
            return Err(ConfigError::Invalid {
                key: "RSI_PERIOD",
                value: period.to_string(),
                reason: format!("period must be between 1 and {}", MAX_RSI_PERIOD),
            });
        }

        let smoothing = match get("RSI_SMOOTHING") {
            Some(raw) => raw.parse::<Smoothing>().map_err(|reason| ConfigError::Invalid {
                key: "RSI_SMOOTHING",
                value: raw.clone(),
                reason,
            })?,
            None => Smoothing::default(),
        };

        let rsi_origin = match get("RSI_ORIGIN") {
            Some(raw) => raw.parse::<RsiOrigin>().map_err(|reason| ConfigError::Invalid {
                key: "RSI_ORIGIN",
                value: raw.clone(),
                reason,
            })?,
            None => RsiOrigin::Local,
        };

        let sources = match get("DATA_SOURCES") {
            Some(raw) => parse_sources(&raw)?,
            None => defaults.sources,
        };

        let alpha_vantage = match get("ALPHAVANTAGE_API_KEY") {
            Some(api_key) => Some(AlphaVantageConfig {
                api_key,
                base_url: get("ALPHAVANTAGE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_ALPHAVANTAGE_BASE_URL.to_string()),
            }),
            None if sources.contains(&SourceKind::AlphaVantage) => {
                return Err(ConfigError::Missing("ALPHAVANTAGE_API_KEY"));
            }
            None => None,
        };

        let request_delay = match get("REQUEST_DELAY_SECONDS") {
            Some(raw) => {
                let seconds = parse_number::<f64>("REQUEST_DELAY_SECONDS", &raw)?;
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(ConfigError::Invalid {
                        key: "REQUEST_DELAY_SECONDS",
                        value: raw,
                        reason: "delay must be a non-negative number of seconds".to_string(),
                    });
                }
                Duration::from_secs_f64(seconds)
            }
            None if sources.contains(&SourceKind::AlphaVantage) => {
                Duration::from_secs(ALPHAVANTAGE_MIN_DELAY_SECONDS)
            }
            None => defaults.request_delay,
        };

        let state = StateConfig {
            dir: get("STATE_DIR").map(PathBuf::from).unwrap_or(defaults.state.dir),
            prefix: get("STATE_PREFIX").unwrap_or(defaults.state.prefix),
        };

        let email = parse_email(&get)?;

        let port = match get("PORT") {
            Some(raw) => parse_number::<u16>("PORT", &raw)?,
            None => defaults.port,
        };

        Ok(Self {
            environment,
            tickers,
            rsi: RsiParams { period, smoothing },
            rsi_origin,
            sources,
            yahoo_base_url: get("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            alpha_vantage,
            request_delay,
            state,
            email,
            port,
        })
    }

    pub fn is_production(&self) -> bool {
        is_production(&self.environment)
    }
}

/// Get the current environment name (`APP_ENV`, default `development`).
pub fn get_environment() -> String {
    env::var("APP_ENV").unwrap_or_else(|_| "development".to_string())
}

pub fn is_production(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_sources(raw: &str) -> Result<Vec<SourceKind>, ConfigError> {
    let mut sources = Vec::new();
    for name in raw.split(',').filter(|s| !s.trim().is_empty()) {
        let kind = SourceKind::parse(name).ok_or_else(|| ConfigError::Invalid {
            key: "DATA_SOURCES",
            value: raw.to_string(),
            reason: format!("unknown provider '{}'", name.trim()),
        })?;
        if !sources.contains(&kind) {
            sources.push(kind);
        }
    }
    if sources.is_empty() {
        return Err(ConfigError::Missing("DATA_SOURCES"));
    }
    Ok(sources)
}

fn parse_email<G>(get: &G) -> Result<Option<EmailConfig>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let from = get("EMAIL_FROM");
    let to = get("EMAIL_TO");
    let password = get("EMAIL_PASS");

    if from.is_none() && to.is_none() && password.is_none() {
        return Ok(None);
    }

    let smtp_port = match get("SMTP_PORT") {
        Some(raw) => parse_number::<u16>("SMTP_PORT", &raw)?,
        None => DEFAULT_SMTP_PORT,
    };

    Ok(Some(EmailConfig {
        from: from.ok_or(ConfigError::Missing("EMAIL_FROM"))?,
        to: to.ok_or(ConfigError::Missing("EMAIL_TO"))?,
        password: password.ok_or(ConfigError::Missing("EMAIL_PASS"))?,
        smtp_host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
        smtp_port,
    }))
}
