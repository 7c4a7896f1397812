//! REST endpoints for the intake service.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::warn;

use crate::audit::{AuditEntry, AuditSink};
use crate::error::IntakeError;
use crate::pipeline::processor::IntakeProcessor;
use crate::pipeline::types::normalize_batch;

/// Shared state for the intake routes.
#[derive(Clone)]
pub struct IntakeState {
    pub processor: Arc<IntakeProcessor>,
    /// Sink for payload-level rejection entries; per-item entries go
    /// through the processor.
    pub audit: Arc<dyn AuditSink>,
}

/// Build the Axum router.
pub fn intake_routes(state: IntakeState) -> Router {
    Router::new()
        .route("/process", post(process))
        .route("/health", get(health))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "interview-intake"
    }))
}

// ── Batch endpoint ──────────────────────────────────────────────────

/// POST /process
///
/// Body: one record object or an array of record objects. Returns 200 with
/// a per-item breakdown for any minimally well-formed batch; an empty,
/// absent, or malformed payload yields 400 and processes nothing.
///
/// The body is read raw and parsed by hand so that every invalid-payload
/// shape gets the same 400 response body. An unreadable body (empty or
/// non-JSON) additionally produces one best-effort rejection audit entry;
/// a readable-but-empty batch produces no side effects at all.
async fn process(State(state): State<IntakeState>, body: Bytes) -> Response {
    if body.is_empty() {
        return reject(&state, "empty payload").await;
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return reject(&state, &format!("payload is not valid JSON: {e}")).await,
    };

    let records = match normalize_batch(payload) {
        Ok(records) => records,
        Err(IntakeError::InvalidInput(reason)) => {
            warn!(reason = %reason, "Rejecting batch");
            return bad_request();
        }
    };

    let results = state.processor.process_batch(records).await;
    Json(serde_json::json!({
        "status": "complete",
        "results": results,
    }))
    .into_response()
}

/// Audit and reject an unreadable payload.
async fn reject(state: &IntakeState, reason: &str) -> Response {
    warn!(reason = %reason, "Rejecting payload");
    if let Err(e) = state
        .audit
        .emit(&AuditEntry::error("", format!("payload rejected: {reason}")))
        .await
    {
        warn!(error = %e, "Audit emission failed for rejected payload");
    }
    bad_request()
}

fn bad_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": "No data provided"})),
    )
        .into_response()
}
