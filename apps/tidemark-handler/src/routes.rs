//! Webhook receiver routes.
//!
//! `POST /events` runs one delivery through the engine and answers with a
//! status the delivering runtime acts on: 2xx for handled deliveries
//! (updated or no-op), 503 when a redelivery may succeed, 500 otherwise.
//! `GET /health` reports liveness.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use tidemark_events::{verify_signing_secret, SIGNING_SECRET_HEADER};
use tidemark_reconcile::{ReconcileEngine, ReconciliationOutcome};

/// Shared state of the receiver.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconcileEngine>,
    pub signing_secret: Option<Arc<str>>,
    pub start_time: Instant,
    pub version: &'static str,
}

impl AppState {
    pub fn new(engine: ReconcileEngine, signing_secret: Option<String>) -> Self {
        Self {
            engine: Arc::new(engine),
            signing_secret: signing_secret.map(Arc::from),
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Error body for rejected deliveries.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub request_id: Uuid,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub policy: String,
    pub uptime_seconds: u64,
}

/// Create the receiver routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", post(events_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Map an outcome to the status the runtime sees.
pub fn status_for(outcome: &ReconciliationOutcome) -> StatusCode {
    match outcome {
        ReconciliationOutcome::NoOp(_) | ReconciliationOutcome::Updated(_) => StatusCode::OK,
        ReconciliationOutcome::Failed(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
        ReconciliationOutcome::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn events_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    handle_delivery(state, headers, body, request_id)
        .instrument(info_span!("delivery", %request_id))
        .await
}

async fn handle_delivery(state: AppState, headers: HeaderMap, body: Bytes, request_id: Uuid) -> Response {
    if let Some(expected) = state.signing_secret.as_deref() {
        let presented = headers
            .get(SIGNING_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if !verify_signing_secret(expected, presented) {
            warn!(present = presented.is_some(), "Rejected delivery with bad signing secret");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "UNAUTHORIZED",
                    message: "Missing or invalid signing secret".to_string(),
                    request_id,
                }),
            )
                .into_response();
        }
    }

    let outcome = state.engine.reconcile_raw(&body).await;
    let status = status_for(&outcome);
    let summary = outcome.summary();
    info!(
        status = status.as_u16(),
        outcome = summary.outcome,
        reason = summary.reason.as_deref().unwrap_or(""),
        bytes = body.len(),
        "Delivery handled"
    );
    (status, Json(summary)).into_response()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: state.version,
        policy: state.engine.policy_name().to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
