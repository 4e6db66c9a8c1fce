use crate::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// Failure of a single gallery request.
#[derive(Debug, Error)]
pub enum GalleryError {
    /// Required configuration is missing; nothing the caller can fix.
    #[error("{0}")]
    Config(String),

    /// Malformed or missing input.
    #[error("{0}")]
    BadRequest(String),

    /// The requested key does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The object store rejected or failed the request.
    #[error(transparent)]
    Store(StoreError),
}

impl GalleryError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GalleryError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GalleryError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
            GalleryError::Store(err) => err
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
        }
    }
}

impl From<StoreError> for GalleryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { key } => GalleryError::NotFound(format!("`{key}` not found")),
            other => GalleryError::Store(other),
        }
    }
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let mut body = json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        if let GalleryError::Store(err) = &self {
            if let Some(code) = err.code() {
                body["code"] = json!(code);
            }
        }

        (status, Json(body)).into_response()
    }
}
