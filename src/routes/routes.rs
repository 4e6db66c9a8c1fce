//! Defines routes for the gallery API.
//!
//! ## Structure
//! - **Health**
//!   - `GET    /healthz`            — process liveness
//!   - `GET    /api/health`         — store connectivity, bucket presence
//!
//! - **Live items**
//!   - `GET    /api/list`           — list live items
//!   - `POST   /api/upload`         — multipart upload (`?multi=1` for several files)
//!   - `GET    /api/download`       — stream one object (`?key=&inline=1`)
//!   - `DELETE /api/delete`         — hard delete (`?key=`)
//!   - `POST   /api/download-zip`   — streamed ZIP of several keys
//!
//! - **Trash**
//!   - `GET    /api/trash-list`     — list trashed items
//!   - `POST   /api/trash-move`     — move a live key to the trash
//!   - `POST   /api/trash-restore`  — move a trashed key back
//!   - `DELETE /api/trash-delete`   — purge a trashed key
//!
//! Keys travel in the query string because they may contain `/`.

use crate::{
    handlers::{
        gallery_handlers::{
            delete_file, download, download_zip, list_files, list_trash, move_to_trash, purge,
            restore, upload,
        },
        health_handlers::{healthz, store_health},
    },
    services::gallery_service::GalleryService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Largest accepted upload request.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Build the router. The `GalleryService` state is shared by all handlers.
pub fn routes() -> Router<GalleryService> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/health", get(store_health))
        .route("/api/list", get(list_files))
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/download", get(download))
        .route("/api/delete", delete(delete_file))
        .route("/api/download-zip", post(download_zip))
        .route("/api/trash-list", get(list_trash))
        .route("/api/trash-move", post(move_to_trash))
        .route("/api/trash-restore", post(restore))
        .route("/api/trash-delete", delete(purge))
}
