//! Ticker list loading: local file, uploaded text, or a remote text resource.

use crate::error::AlertError;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum TickerSource {
    File(PathBuf),
    Url(String),
    /// Already-read contents, e.g. an uploaded file.
    Inline(String),
}

impl TickerSource {
    /// `http(s)://...` is fetched remotely, anything else is a local path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            TickerSource::Url(raw.to_string())
        } else {
            TickerSource::File(PathBuf::from(raw))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TickerSource::File(path) => path.display().to_string(),
            TickerSource::Url(url) => url.clone(),
            TickerSource::Inline(_) => "uploaded list".to_string(),
        }
    }
}

/// One symbol per line. Blank lines and `#` comments are skipped and repeated
/// symbols keep their first position.
pub fn parse_ticker_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(|line| line.trim().trim_start_matches('\u{feff}'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|ticker| seen.insert(ticker.to_string()))
        .map(str::to_string)
        .collect()
}

pub async fn load_tickers(
    source: &TickerSource,
    client: &reqwest::Client,
) -> Result<Vec<String>, AlertError> {
    let text = match source {
        TickerSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
            AlertError::TickerListUnavailable(format!("{}: {}", path.display(), e))
        })?,
        TickerSource::Url(url) => fetch_remote(url, client).await?,
        TickerSource::Inline(text) => text.clone(),
    };

    let tickers = parse_ticker_list(&text);
    debug!(source = %source.describe(), count = tickers.len(), "loaded ticker list");
    Ok(tickers)
}

async fn fetch_remote(url: &str, client: &reqwest::Client) -> Result<String, AlertError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AlertError::TickerListUnavailable(format!("{}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(AlertError::TickerListUnavailable(format!(
            "{}: HTTP {}",
            url,
            response.status().as_u16()
        )));
    }

    response
        .text()
        .await
        .map_err(|e| AlertError::TickerListUnavailable(format!("{}: {}", url, e)))
}
