use anyhow::{Context, Result};
use media_gallery::{
    app,
    config::{AppConfig, StoreKind},
    services::gallery_service::GalleryService,
    store::{MemoryStore, ObjectStore, S3Store},
};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting media-gallery with config: {:?}", cfg);

    // --- Object store handle, shared by every request ---
    let store: Arc<dyn ObjectStore> = match cfg.store {
        StoreKind::S3 => Arc::new(S3Store::new(&cfg.s3_settings())),
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; uploads are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Initialize core service ---
    let gallery = GalleryService::new(
        store,
        cfg.bucket.clone(),
        cfg.endpoint.clone(),
        cfg.region.clone(),
    );
    if gallery.bucket().is_empty() {
        tracing::warn!("AWS_S3_BUCKET is empty; object requests will fail until it is set");
    }

    // --- Build router ---
    let app = app(gallery);

    // --- Start server ---
    let listener = bind_listener(&cfg).await?;
    tracing::info!("Gallery listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Bind the configured address. A wildcard host that the OS refuses is
/// retried on loopback so the gallery still comes up for local use.
async fn bind_listener(cfg: &AppConfig) -> Result<TcpListener> {
    let addr = cfg.addr();
    match TcpListener::bind(&addr).await {
        Ok(listener) => Ok(listener),
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let loopback = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                %addr,
                error = %err,
                %loopback,
                "gallery cannot bind wildcard address; serving on loopback only"
            );
            Ok(TcpListener::bind(&loopback).await?)
        }
        Err(err) => Err(err).with_context(|| format!("binding gallery listener on {addr}")),
    }
}
