//! HTTP handlers for the gallery API.
//! Object bodies and archives are streamed; everything else is JSON.

use crate::{
    errors::GalleryError,
    services::{
        archive::requested_keys,
        gallery_service::{GalleryService, UploadFile, encode_uri_component},
    },
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

/// `?key=` on single-item endpoints.
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub key: Option<String>,
    /// `1` serves the object inline instead of as an attachment.
    pub inline: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// `1` switches to multi-file mode (`files` / `keys` fields).
    pub multi: Option<String>,
}

/// GET `/api/list` — live items.
pub async fn list_files(
    State(service): State<GalleryService>,
) -> Result<impl IntoResponse, GalleryError> {
    let files = service.list_live().await?;
    Ok(Json(json!({ "files": files })))
}

/// GET `/api/trash-list` — trashed items under their original keys.
pub async fn list_trash(
    State(service): State<GalleryService>,
) -> Result<impl IntoResponse, GalleryError> {
    let files = service.list_trash().await?;
    Ok(Json(json!({ "files": files })))
}

/// POST `/api/upload` — multipart upload.
///
/// Single mode reads one `file` part and an optional `key` text part. Multi
/// mode (`?multi=1`) reads every `files` part; `keys` (or `keys[]`) parts
/// name them by position, falling back to `key` when none are sent.
pub async fn upload(
    State(service): State<GalleryService>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, GalleryError> {
    let multi = query.multi.as_deref() == Some("1");
    let file_field = if multi { "files" } else { "file" };

    let mut files = Vec::new();
    let mut key: Option<String> = None;
    let mut keys: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            if !multi && !files.is_empty() {
                debug!("ignoring extra file part in single upload");
                continue;
            }
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let body = field.bytes().await.map_err(multipart_error)?;
            files.push(UploadFile {
                filename,
                content_type,
                body,
                custom_name: None,
            });
        } else if name == "key" {
            key = Some(field.text().await.map_err(multipart_error)?);
        } else if multi && (name == "keys" || name == "keys[]") {
            keys.push(field.text().await.map_err(multipart_error)?);
        } else {
            debug!(field = %name, "ignoring unknown multipart field");
        }
    }

    for (idx, file) in files.iter_mut().enumerate() {
        file.custom_name = if keys.is_empty() {
            key.clone()
        } else {
            keys.get(idx).cloned()
        };
    }

    let keys = service.upload(files).await?;
    Ok(Json(json!({ "message": "Upload successful", "keys": keys })))
}

/// GET `/api/download?key=&inline=1` — stream one object.
pub async fn download(
    State(service): State<GalleryService>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, GalleryError> {
    let key = query.key.unwrap_or_default();
    let inline = query.inline.as_deref() == Some("1");
    let object = service.download(&key).await?;

    let content_type = object.content_type.clone();
    let content_length = object.content_length;
    let mut response = Response::new(Body::from_stream(object.body));
    *response.status_mut() = StatusCode::OK;
    set_download_headers(
        response.headers_mut(),
        &key,
        content_type.as_deref(),
        content_length,
        inline,
    );

    Ok(response)
}

/// POST `/api/trash-move?key=` — soft delete.
pub async fn move_to_trash(
    State(service): State<GalleryService>,
    Query(query): Query<KeyQuery>,
) -> Result<impl IntoResponse, GalleryError> {
    let trash_key = service
        .move_to_trash(query.key.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({ "message": "Moved to trash", "trashKey": trash_key })))
}

/// POST `/api/trash-restore?key=` — undo a soft delete. `key` is the
/// original key, without the trash prefix.
pub async fn restore(
    State(service): State<GalleryService>,
    Query(query): Query<KeyQuery>,
) -> Result<impl IntoResponse, GalleryError> {
    let key = service
        .restore(query.key.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({ "message": "Restored", "key": key })))
}

/// DELETE `/api/trash-delete?key=` — purge a trashed item.
pub async fn purge(
    State(service): State<GalleryService>,
    Query(query): Query<KeyQuery>,
) -> Result<impl IntoResponse, GalleryError> {
    service
        .purge(query.key.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({ "message": "Deleted permanently" })))
}

/// DELETE `/api/delete?key=` — hard delete, bypassing the trash.
pub async fn delete_file(
    State(service): State<GalleryService>,
    Query(query): Query<KeyQuery>,
) -> Result<impl IntoResponse, GalleryError> {
    service
        .delete_live(query.key.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(json!({ "message": "Deleted successfully" })))
}

/// POST `/api/download-zip` — `{"keys": [...], "bin": bool}` to a streamed ZIP.
pub async fn download_zip(
    State(service): State<GalleryService>,
    body: Bytes,
) -> Result<Response, GalleryError> {
    let request: Value = serde_json::from_slice(&body)
        .map_err(|err| GalleryError::bad_request(format!("invalid JSON body: {err}")))?;
    let keys = requested_keys(request.get("keys"))?;
    let from_trash = request.get("bin").and_then(Value::as_bool).unwrap_or(false);

    let export = service.export_archive(keys, from_trash).await?;
    let disposition = format!("attachment; filename=\"{}\"", export.file_name);

    let mut response = Response::new(Body::from_stream(export.body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/zip"),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    *response.status_mut() = StatusCode::OK;
    Ok(response)
}

fn set_download_headers(
    headers: &mut HeaderMap,
    key: &str,
    content_type: Option<&str>,
    content_length: Option<u64>,
    inline: bool,
) {
    headers.insert(
        header::CONTENT_TYPE,
        content_type
            .and_then(|ct| HeaderValue::from_str(ct).ok())
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream")),
    );

    if let Some(length) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    let disposition = format!(
        "{}; filename*=UTF-8''{}",
        if inline { "inline" } else { "attachment" },
        encode_uri_component(key)
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
}

fn multipart_error(err: MultipartError) -> GalleryError {
    GalleryError::bad_request(err.body_text())
}
