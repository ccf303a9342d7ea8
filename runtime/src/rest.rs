// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API.
//!
//! Thin adapter over the [`Orchestrator`]: every endpoint validates its
//! payload, runs one extraction path, and returns the result envelope.

use crate::callback::{CallbackDispatcher, WebhookRequest};
use crate::config::RuntimeConfig;
use crate::error::ExtractError;
use crate::orchestrator::Orchestrator;
use crate::types::{ExtractionRequest, ExtractionResult};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};

/// Shared state behind every handler.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub dispatcher: CallbackDispatcher,
    pub started_at: Instant,
    /// Pause batch callers should leave between requests.
    pub batch_delay: Duration,
    /// Lightweight attempts for requests that leave `max_retries` unset.
    pub default_max_retries: u32,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: &RuntimeConfig) -> Self {
        Self {
            dispatcher: CallbackDispatcher::new(orchestrator.clone()),
            orchestrator,
            started_at: Instant::now(),
            batch_delay: config.batch_delay,
            default_max_retries: config.default_max_retries,
        }
    }
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/parse", post(handle_parse).get(handle_parse_static))
        .route("/api/parse-dynamic", post(handle_parse_dynamic))
        .route("/api/parse-webhook", post(handle_parse_webhook))
        .layer(cors)
        .with_state(state)
}

/// Serve the REST API until the listener fails.
pub async fn start(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("REST API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Errors ──────────────────────────────────────────────────────

/// Request rejected before any extraction ran.
#[derive(Debug)]
pub struct ApiError(ExtractError);

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ExtractError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "success": false,
            "error": self.0.to_string(),
            "code": self.0.code(),
        });
        (status, Json(body)).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let guard = state.orchestrator.render_guard();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
        "render_slots": {
            "in_use": guard.in_flight(),
            "max": guard.limit(),
        },
        "batch_delay_ms": state.batch_delay.as_millis() as u64,
        "default_max_retries": state.default_max_retries,
    }))
}

/// Orchestrated extraction.
async fn handle_parse(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractionRequest>,
) -> Result<Json<ExtractionResult>, ApiError> {
    req.validate()?;
    let req = req.or_max_retries(state.default_max_retries);
    Ok(Json(state.orchestrator.extract(&req).await))
}

/// Query form of a static-only extraction.
#[derive(Debug, Deserialize)]
struct StaticQuery {
    url: String,
    #[serde(default)]
    max_retries: Option<u32>,
    #[serde(default, alias = "skip_ssl_verification")]
    skip_ssl: Option<bool>,
}

async fn handle_parse_static(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StaticQuery>,
) -> Result<Json<ExtractionResult>, ApiError> {
    let req = ExtractionRequest::new(query.url)?
        .with_max_retries(query.max_retries.unwrap_or(state.default_max_retries))
        .with_skip_ssl(query.skip_ssl.unwrap_or(false));
    Ok(Json(state.orchestrator.extract_static(&req).await))
}

async fn handle_parse_dynamic(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractionRequest>,
) -> Result<Json<ExtractionResult>, ApiError> {
    req.validate()?;
    let req = req.or_max_retries(state.default_max_retries);
    Ok(Json(state.orchestrator.extract_dynamic(&req).await))
}

async fn handle_parse_webhook(
    State(state): State<Arc<AppState>>,
    Json(mut job): Json<WebhookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    job.validate()?;
    job.request = job.request.or_max_retries(state.default_max_retries);
    let (ack, _task) = state.dispatcher.spawn(job);
    Ok((StatusCode::ACCEPTED, Json(ack)))
}
