//! Health handlers.
//!
//! - GET /healthz     -> process liveness ("ok"), no I/O
//! - GET /api/health  -> object store connectivity and bucket presence

use crate::services::gallery_service::GalleryService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// `GET /healthz`
///
/// Process liveness only; the object store is not touched.
pub async fn healthz() -> Json<Liveness> {
    Json(Liveness { status: "ok" })
}

/// `GET /api/health`
///
/// Lists buckets to prove the store is reachable, then probes the configured
/// bucket. Never creates the bucket. Returns 500 with `ok: false` when the
/// store cannot be reached.
pub async fn store_health(State(service): State<GalleryService>) -> impl IntoResponse {
    match service.health().await {
        Ok(report) => (StatusCode::OK, Json(json!(report))),
        Err(err) => {
            error!(error = %err, "store health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": err.to_string() })),
            )
        }
    }
}

#[derive(Serialize)]
pub struct Liveness {
    status: &'static str,
}
