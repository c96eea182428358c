//! Dashboard HTTP server using Axum

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, warn, Level};

use crate::core::presentation::render_dashboard;
use crate::core::runner::Runner;
use crate::error::AlertError;
use crate::metrics::Metrics;
use crate::models::report::RunReport;
use crate::services::tickers::{load_tickers, parse_ticker_list, TickerSource};

#[derive(Clone)]
pub struct AppState {
    pub health: Arc<RwLock<HealthStatus>>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub runner: Arc<Runner>,
    pub tickers: TickerSource,
    pub http_client: reqwest::Client,
    pub latest: Arc<RwLock<Option<RunReport>>>,
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>, runner: Arc<Runner>, tickers: TickerSource) -> Self {
        Self {
            health: Arc::new(RwLock::new(HealthStatus::default())),
            metrics,
            start_time: Arc::new(Instant::now()),
            runner,
            tickers,
            http_client: reqwest::Client::new(),
            latest: Arc::new(RwLock::new(None)),
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

impl HealthStatus {
    /// `degraded` while the latest run hit a provider quota.
    pub fn after_run(report: &RunReport) -> Self {
        let status = if report.rate_limited { "degraded" } else { "healthy" };
        Self {
            status: status.to_string(),
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let health = state.health.read().await;
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Ok(Json(json!({
        "status": health.status,
        "uptime_seconds": uptime_seconds,
        "service": "rsiwatch-dashboard"
    })))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

async fn dashboard(State(state): State<AppState>) -> Html<String> {
    let latest = state.latest.read().await;
    Html(render_dashboard(latest.as_ref()))
}

async fn latest_results(State(state): State<AppState>) -> Result<Json<RunReport>, ApiError> {
    let latest = state.latest.read().await;
    latest
        .clone()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "no run has completed yet"))
}

/// Run over the configured ticker source.
async fn run_configured(State(state): State<AppState>) -> Result<Json<RunReport>, ApiError> {
    let _guard = state
        .run_lock
        .try_lock()
        .map_err(|_| api_error(StatusCode::CONFLICT, "a run is already in progress"))?;

    let tickers = load_tickers(&state.tickers, &state.http_client)
        .await
        .map_err(|e| {
            warn!(source = %state.tickers.describe(), error = %e, "failed to load ticker list");
            match e {
                AlertError::TickerListUnavailable(_) => {
                    api_error(StatusCode::BAD_GATEWAY, e.to_string())
                }
                other => api_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
            }
        })?;

    Ok(Json(execute(&state, tickers).await))
}

/// Run over an uploaded ticker list (request body, one symbol per line).
async fn run_uploaded(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<RunReport>, ApiError> {
    let tickers = parse_ticker_list(&body);
    if tickers.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "uploaded ticker list is empty",
        ));
    }

    let _guard = state
        .run_lock
        .try_lock()
        .map_err(|_| api_error(StatusCode::CONFLICT, "a run is already in progress"))?;

    Ok(Json(execute(&state, tickers).await))
}

async fn execute(state: &AppState, tickers: Vec<String>) -> RunReport {
    info!(tickers = tickers.len(), "dashboard run requested");
    let report = state.runner.run(&tickers).await;
    *state.health.write().await = HealthStatus::after_run(&report);
    *state.latest.write().await = Some(report.clone());
    report
}

async fn not_found() -> impl IntoResponse {
    api_error(StatusCode::NOT_FOUND, "not found")
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/results", get(latest_results))
        .route("/api/run", post(run_configured))
        .route("/api/upload", post(run_uploaded))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    info!("Dashboard available at http://0.0.0.0:{}/", port);
    axum::serve(listener, app).await?;

    Ok(())
}
