//! Console and HTML renderings of a run.

use crate::alerts::evaluator::{Thresholds, Zone};
use crate::models::report::{RunReport, TickerReport};
use std::fmt::Write;

/// Row styling derived from the RSI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Low,
    High,
    Neutral,
    Unknown,
}

impl Highlight {
    pub fn for_rsi(rsi: Option<f64>) -> Self {
        Self::with_thresholds(rsi, &Thresholds::default())
    }

    pub fn with_thresholds(rsi: Option<f64>, thresholds: &Thresholds) -> Self {
        match rsi.and_then(|v| Zone::classify(v, thresholds)) {
            Some(Zone::Low) => Highlight::Low,
            Some(Zone::High) => Highlight::High,
            Some(Zone::Neutral) => Highlight::Neutral,
            None => Highlight::Unknown,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Highlight::Low => "rsi-low",
            Highlight::High => "rsi-high",
            Highlight::Neutral => "rsi-neutral",
            Highlight::Unknown => "rsi-unknown",
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "N/A".to_string())
}

/// Plain-text table for terminal output.
pub fn render_console_table(report: &RunReport) -> String {
    let width = report
        .reports
        .iter()
        .map(|r| r.ticker.len())
        .max()
        .unwrap_or(0)
        .max("Ticker".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>8}  {:>10}  {:<8}  Status",
        "Ticker",
        "RSI",
        "Price",
        "State",
        width = width
    );
    let _ = writeln!(out, "{}", "-".repeat(width + 40));

    for row in &report.reports {
        let _ = writeln!(
            out,
            "{:<width$}  {:>8}  {:>10}  {:<8}  {}",
            row.ticker,
            fmt_opt(row.rsi),
            fmt_opt(row.price),
            row.state,
            row.status(),
            width = width
        );
    }

    if report.rate_limited {
        let _ = writeln!(out, "\nWarning: market data quota exceeded during this run.");
    }
    out
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_row(out: &mut String, row: &TickerReport) {
    let highlight = Highlight::for_rsi(row.rsi);
    let _ = write!(
        out,
        "<tr><td>{}</td><td class=\"{}\">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        escape_html(&row.ticker),
        highlight.css_class(),
        fmt_opt(row.rsi),
        fmt_opt(row.price),
        row.state,
        escape_html(&row.status()),
    );
}

/// `<table>` fragment with one row per ticker.
pub fn render_html_table(report: &RunReport) -> String {
    let mut out = String::from(
        "<table class=\"rsi-table\"><thead><tr><th>Ticker</th><th>RSI</th><th>Price</th><th>State</th><th>Status</th></tr></thead><tbody>",
    );
    for row in &report.reports {
        render_row(&mut out, row);
    }
    out.push_str("</tbody></table>");
    out
}

const STYLE: &str = "body{font-family:sans-serif;margin:2rem}\
table{border-collapse:collapse}td,th{padding:.4rem .8rem;border:1px solid #ddd}\
.rsi-low{background:#c8f7c5}.rsi-high{background:#f7c5c5}\
.rsi-neutral{background:#f0f0f0}.rsi-unknown{background:#fff3b0}\
.warning{color:#a15c00}";

/// Full dashboard page; `report` is `None` before the first run.
pub fn render_dashboard(report: Option<&RunReport>) -> String {
    let mut out = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>RSI Dashboard</title><style>{}</style></head><body><h1>RSI Dashboard</h1>",
        STYLE
    );

    match report {
        Some(report) => {
            let _ = write!(
                out,
                "<p>Last run {} &middot; period {} &middot; {} smoothing &middot; {} alert(s) sent</p>",
                report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
                report.params.period,
                report.params.smoothing,
                report.alerts_sent()
            );
            if report.rate_limited {
                out.push_str("<p class=\"warning\">Market data quota exceeded during this run.</p>");
            }
            out.push_str(&render_html_table(report));
        }
        None => out.push_str("<p>No run yet. POST /api/run or upload a ticker list to /api/upload.</p>"),
    }

    out.push_str("</body></html>");
    out
}
