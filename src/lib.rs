//! Self-hosted media gallery over an S3-compatible object store.
//!
//! Items live at their own key in a single bucket; soft-deleted items live
//! under `trash/<key>`. See `services::namespace` for the key rules and
//! `services::gallery_service` for the operations.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use axum::Router;
use services::gallery_service::GalleryService;
use tower_http::trace::TraceLayer;

/// The complete application router with state and request tracing.
pub fn app(service: GalleryService) -> Router {
    routes::routes::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
