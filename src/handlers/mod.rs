//! Axum handlers. They parse requests, call `GalleryService` and shape
//! responses; no store logic lives here.

pub mod gallery_handlers;
pub mod health_handlers;
