//! Full runs: fetch, compute, evaluate, notify, persist

use crate::test_utils::*;
use rsiwatch::alerts::state_store::{AlertStateStore, MemoryStateStore};
use rsiwatch::core::runner::Runner;
use rsiwatch::error::AlertError;
use rsiwatch::indicators::momentum::rsi::RsiParams;
use rsiwatch::metrics::Metrics;
use rsiwatch::models::alert::{AlertKind, AlertState};
use rsiwatch::services::market_data::{RsiOrigin, SourceChain};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn run_alerts_on_threshold_transitions() {
    let server = MockServer::start().await;
    mock_yahoo_chart(&server, "AAPL", &falling_closes()).await;
    mock_yahoo_chart(&server, "MSFT", &choppy_closes()).await;
    mock_yahoo_chart(&server, "TSLA", &rising_closes()).await;

    let app = TestRunner::new(vec![yahoo(&server)]);
    let report = app.runner.run(&tickers(&["AAPL", "MSFT", "TSLA"])).await;

    assert_eq!(report.reports.len(), 3);
    assert_eq!(report.alerts_sent(), 2);
    assert!(!report.rate_limited);

    let aapl = report.get("AAPL").unwrap();
    assert_eq!(aapl.rsi, Some(0.0));
    assert_eq!(aapl.price, Some(71.0));
    assert_eq!(aapl.state, AlertState::Low);
    assert_eq!(aapl.event, Some(AlertKind::Oversold));
    assert_eq!(aapl.source.as_deref(), Some("yahoo"));

    let msft = report.get("MSFT").unwrap();
    assert_eq!(msft.state, AlertState::Neutral);
    assert_eq!(msft.event, None);
    assert_eq!(msft.status(), "OK");

    let tsla = report.get("TSLA").unwrap();
    assert_eq!(tsla.state, AlertState::High);
    assert_eq!(tsla.status(), "Alert sent: Overbought");

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].subject, "RSI Alert for AAPL: Oversold");
    assert_eq!(sent[1].subject, "RSI Alert for TSLA: Overbought");

    assert_eq!(app.store.get("AAPL").unwrap(), AlertState::Low);
    assert_eq!(app.store.get("MSFT").unwrap(), AlertState::Neutral);
}

#[tokio::test]
async fn repeated_runs_do_not_repeat_alerts() {
    let server = MockServer::start().await;
    mock_yahoo_chart(&server, "AAPL", &falling_closes()).await;

    let app = TestRunner::new(vec![yahoo(&server)]);
    let list = tickers(&["AAPL"]);

    let first = app.runner.run(&list).await;
    let second = app.runner.run(&list).await;

    assert_eq!(first.alerts_sent(), 1);
    assert_eq!(second.alerts_sent(), 0);
    assert_eq!(second.reports[0].state, AlertState::Low);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn persisted_state_suppresses_first_alert() {
    let server = MockServer::start().await;
    mock_yahoo_chart(&server, "TSLA", &rising_closes()).await;

    let app = TestRunner::with_store(
        vec![yahoo(&server)],
        MemoryStateStore::with_states([("TSLA", AlertState::High)]),
    );
    let report = app.runner.run(&tickers(&["TSLA"])).await;

    assert_eq!(report.alerts_sent(), 0);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn failing_ticker_does_not_stop_the_run() {
    let server = MockServer::start().await;
    mock_yahoo_chart(&server, "AAPL", &falling_closes()).await;
    mock_yahoo_not_found(&server, "BOGUS").await;
    mock_yahoo_chart(&server, "SHORT", &[1.0, 2.0, 3.0]).await;
    mock_yahoo_chart(&server, "TSLA", &rising_closes()).await;

    let app = TestRunner::new(vec![yahoo(&server)]);
    let report = app
        .runner
        .run(&tickers(&["AAPL", "BOGUS", "SHORT", "TSLA"]))
        .await;

    assert_eq!(report.reports.len(), 4);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.alerts_sent(), 2);

    let bogus = report.get("BOGUS").unwrap();
    assert!(matches!(bogus.error, Some(AlertError::InvalidSymbol { .. })));
    assert_eq!(bogus.rsi, None);
    assert!(bogus.status().starts_with("Error:"));

    let short = report.get("SHORT").unwrap();
    assert_eq!(
        short.error,
        Some(AlertError::InsufficientData {
            required: 15,
            available: 3
        })
    );
    assert_eq!(app.store.get("SHORT").unwrap(), AlertState::None);
}

#[tokio::test]
async fn failed_notification_is_retried_next_run() {
    let server = MockServer::start().await;
    mock_yahoo_chart(&server, "AAPL", &falling_closes()).await;

    let store = Arc::new(MemoryStateStore::new());
    let chain = Arc::new(SourceChain::new(vec![yahoo(&server)]));
    let failing = Runner::new(
        chain.clone(),
        store.clone(),
        Arc::new(FailingNotifier),
        RsiParams::default(),
    );

    let report = failing.run(&tickers(&["AAPL"])).await;
    let row = &report.reports[0];
    assert!(matches!(row.error, Some(AlertError::NotificationFailure(_))));
    assert_eq!(row.rsi, Some(0.0));
    assert_eq!(store.get("AAPL").unwrap(), AlertState::None);

    let notifier = Arc::new(rsiwatch::services::notifier::LogNotifier::new());
    let working = Runner::new(chain, store.clone(), notifier.clone(), RsiParams::default());
    let report = working.run(&tickers(&["AAPL"])).await;

    assert_eq!(report.alerts_sent(), 1);
    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(store.get("AAPL").unwrap(), AlertState::Low);
}

#[tokio::test]
async fn rate_limit_is_flagged_and_fallback_serves() {
    let av = MockServer::start().await;
    let yh = MockServer::start().await;
    mock_alpha_vantage(&av, "TIME_SERIES_DAILY", "AAPL", json!({ "Note": "quota" })).await;
    mock_yahoo_chart(&yh, "AAPL", &falling_closes()).await;
    mock_yahoo_chart(&yh, "MSFT", &choppy_closes()).await;

    let app = TestRunner::new(vec![alpha_vantage(&av), yahoo(&yh)]);
    let report = app.runner.run(&tickers(&["AAPL", "MSFT"])).await;

    assert!(report.rate_limited);
    assert_eq!(report.failed(), 0);
    assert!(report.reports.iter().all(|r| r.source.as_deref() == Some("yahoo")));
    assert!(report.reports[1].failures[0].error.is_rate_limited());
}

#[tokio::test]
async fn rate_limit_without_fallback_fails_rows() {
    let av = MockServer::start().await;
    mock_alpha_vantage(&av, "TIME_SERIES_DAILY", "AAPL", json!({ "Information": "daily limit" })).await;

    let app = TestRunner::new(vec![alpha_vantage(&av)]);
    let report = app.runner.run(&tickers(&["AAPL", "MSFT"])).await;

    assert!(report.rate_limited);
    assert_eq!(report.failed(), 2);
    assert!(report
        .reports
        .iter()
        .all(|r| matches!(r.error, Some(AlertError::RateLimited { .. }))));
}

#[tokio::test]
async fn provider_origin_uses_remote_rsi_and_quote() {
    let av = MockServer::start().await;
    mock_alpha_vantage(
        &av,
        "RSI",
        "IBM",
        json!({ "Technical Analysis: RSI": { "2024-03-08": { "RSI": "22.5" } } }),
    )
    .await;
    mock_alpha_vantage(
        &av,
        "GLOBAL_QUOTE",
        "IBM",
        json!({ "Global Quote": { "05. price": "185.00" } }),
    )
    .await;

    let app = TestRunner::new(vec![alpha_vantage(&av)]);
    let runner = app.runner.with_origin(RsiOrigin::Provider);
    let report = runner.run(&tickers(&["IBM"])).await;

    let row = &report.reports[0];
    assert_eq!(row.rsi, Some(22.5));
    assert_eq!(row.price, Some(185.0));
    assert_eq!(row.event, Some(AlertKind::Oversold));
}

#[tokio::test]
async fn provider_origin_falls_back_to_local_computation() {
    let yh = MockServer::start().await;
    mock_yahoo_chart(&yh, "AAPL", &rising_closes()).await;

    let app = TestRunner::new(vec![yahoo(&yh)]);
    let runner = app.runner.with_origin(RsiOrigin::Provider);
    let report = runner.run(&tickers(&["AAPL"])).await;

    assert_eq!(report.reports[0].rsi, Some(100.0));
    assert_eq!(report.reports[0].source.as_deref(), Some("yahoo"));
}

#[tokio::test]
async fn request_delay_applies_between_tickers() {
    let server = MockServer::start().await;
    mock_yahoo_chart(&server, "A", &choppy_closes()).await;
    mock_yahoo_chart(&server, "B", &choppy_closes()).await;
    mock_yahoo_chart(&server, "C", &choppy_closes()).await;

    let app = TestRunner::new(vec![yahoo(&server)]);
    let runner = app.runner.with_request_delay(Duration::from_millis(50));

    let clock = Instant::now();
    runner.run(&tickers(&["A", "B", "C"])).await;
    assert!(clock.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn run_records_metrics() {
    let server = MockServer::start().await;
    mock_yahoo_chart(&server, "AAPL", &falling_closes()).await;
    mock_yahoo_not_found(&server, "BOGUS").await;

    let metrics = Arc::new(Metrics::new().unwrap());
    let app = TestRunner::new(vec![yahoo(&server)]);
    let runner = app.runner.with_metrics(metrics.clone());
    runner.run(&tickers(&["AAPL", "BOGUS"])).await;

    assert_eq!(metrics.tickers_processed_total.get(), 2);
    assert_eq!(
        metrics
            .alerts_sent_total
            .with_label_values(&["oversold"])
            .get(),
        1
    );
    assert_eq!(
        metrics
            .ticker_errors_total
            .with_label_values(&["invalid_symbol"])
            .get(),
        1
    );
    assert!(metrics.export().unwrap().contains("rsi_latest_value"));
}

#[tokio::test]
async fn provider_origin_spaces_every_alpha_vantage_call() {
    let av = MockServer::start().await;
    for symbol in ["IBM", "MSFT"] {
        mock_alpha_vantage(
            &av,
            "RSI",
            symbol,
            json!({ "Technical Analysis: RSI": { "2024-03-08": { "RSI": "50.0" } } }),
        )
        .await;
        mock_alpha_vantage(
            &av,
            "GLOBAL_QUOTE",
            symbol,
            json!({ "Global Quote": { "05. price": "100.00" } }),
        )
        .await;
    }

    let interval = Duration::from_millis(100);
    let app = TestRunner::new(vec![throttled_alpha_vantage(&av, interval)]);
    let runner = app.runner.with_origin(RsiOrigin::Provider);

    let clock = Instant::now();
    let report = runner.run(&tickers(&["IBM", "MSFT"])).await;
    let elapsed = clock.elapsed();

    assert_eq!(report.failed(), 0);
    let requests = av.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4);
    // Four calls need three full gaps even with no delay between tickers.
    assert!(elapsed >= interval * 3, "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn provider_lookup_failures_are_kept_on_fallback() {
    let av = MockServer::start().await;
    let yh = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&av)
        .await;
    mock_yahoo_chart(&yh, "AAPL", &rising_closes()).await;

    let app = TestRunner::new(vec![alpha_vantage(&av), yahoo(&yh)]);
    let runner = app.runner.with_origin(RsiOrigin::Provider);
    let report = runner.run(&tickers(&["AAPL"])).await;

    let row = &report.reports[0];
    assert!(row.is_ok());
    assert_eq!(row.source.as_deref(), Some("yahoo"));
    assert_eq!(row.failures.len(), 2);
    assert!(row
        .failures
        .iter()
        .all(|f| f.provider == "alphavantage" && f.error.kind() == "data_unavailable"));
}

#[tokio::test]
async fn provider_lookup_failures_are_kept_when_every_source_fails() {
    let av = MockServer::start().await;
    let yh = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&av)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&yh)
        .await;

    let app = TestRunner::new(vec![alpha_vantage(&av), yahoo(&yh)]);
    let runner = app.runner.with_origin(RsiOrigin::Provider);
    let report = runner.run(&tickers(&["AAPL"])).await;

    let providers: Vec<&str> = report.reports[0]
        .failures
        .iter()
        .map(|f| f.provider.as_str())
        .collect();
    assert_eq!(providers, vec!["alphavantage", "alphavantage", "yahoo"]);
}
