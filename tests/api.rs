//! End-to-end tests of the HTTP surface against the in-memory store.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use media_gallery::{
    app,
    services::gallery_service::GalleryService,
    store::{MemoryStore, ObjectStore, StoreOp},
};
use serde_json::{Value, json};
use std::{
    io::{Cursor, Read},
    sync::Arc,
};
use tower::ServiceExt;
use zip::ZipArchive;

const BUCKET: &str = "my-gallery";
const BOUNDARY: &str = "gallery-test-boundary";

fn gallery() -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    let service = GalleryService::new(
        Arc::new(store.clone()),
        BUCKET,
        "http://localhost:9000",
        "us-east-1",
    );
    (app(service), store)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

enum Part<'a> {
    File {
        field: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
    Text {
        field: &'a str,
        value: &'a str,
    },
}

fn multipart(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                field,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn upload_one(app: &Router, filename: &str, data: &[u8]) {
    let response = send(
        app,
        multipart(
            "/api/upload",
            &[Part::File {
                field: "file",
                filename,
                content_type: "image/png",
                data,
            }],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

fn keys_of(listing: &Value) -> Vec<String> {
    listing["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["key"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn listing_an_unprovisioned_bucket_creates_it() {
    let (app, store) = gallery();

    let response = send(&app, request(Method::GET, "/api/list")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "files": [] }));
    assert_eq!(store.list_buckets().await.unwrap(), [BUCKET]);

    let response = send(&app, request(Method::GET, "/api/trash-list")).await;
    assert_eq!(body_json(response).await, json!({ "files": [] }));
    assert_eq!(store.create_bucket_calls(), 1);
}

#[tokio::test]
async fn single_upload_with_custom_name_keeps_extension() {
    let (app, store) = gallery();

    let response = send(
        &app,
        multipart(
            "/api/upload",
            &[
                Part::File {
                    field: "file",
                    filename: "IMG001.jpg",
                    content_type: "image/jpeg",
                    data: b"jpeg-bytes",
                },
                Part::Text {
                    field: "key",
                    value: "vacation",
                },
            ],
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["keys"], json!(["vacation.jpg"]));
    assert!(store.contains(BUCKET, "vacation.jpg").await);
}

#[tokio::test]
async fn multi_upload_names_files_by_position() {
    let (app, _) = gallery();

    let response = send(
        &app,
        multipart(
            "/api/upload?multi=1",
            &[
                Part::File {
                    field: "files",
                    filename: "one.png",
                    content_type: "image/png",
                    data: b"1",
                },
                Part::File {
                    field: "files",
                    filename: "two.jpg",
                    content_type: "image/jpeg",
                    data: b"2",
                },
                Part::Text {
                    field: "keys",
                    value: "first.webp",
                },
                Part::Text {
                    field: "keys",
                    value: "second",
                },
            ],
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["keys"],
        json!(["first.webp", "second.jpg"])
    );
}

#[tokio::test]
async fn upload_without_files_is_rejected() {
    let (app, _) = gallery();
    let response = send(
        &app,
        multipart(
            "/api/upload",
            &[Part::Text {
                field: "key",
                value: "lonely",
            }],
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No file(s) provided");
}

#[tokio::test]
async fn download_streams_body_with_headers() {
    let (app, _) = gallery();
    upload_one(&app, "cat pic.png", b"meow").await;

    let response = send(
        &app,
        request(Method::GET, "/api/download?key=cat%20pic.png&inline=1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "inline; filename*=UTF-8''cat%20pic.png"
    );
    assert_eq!(body_bytes(response).await, b"meow");
}

#[tokio::test]
async fn download_of_missing_key_is_not_found() {
    let (app, _) = gallery();
    let response = send(&app, request(Method::GET, "/api/download?key=ghost.png")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, request(Method::GET, "/api/download")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Missing key");
}

#[tokio::test]
async fn trash_lifecycle_over_http() {
    let (app, _) = gallery();
    upload_one(&app, "a.png", b"aaa").await;

    let response = send(&app, request(Method::POST, "/api/trash-move?key=a.png")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["trashKey"], "trash/a.png");

    let live = body_json(send(&app, request(Method::GET, "/api/list")).await).await;
    assert!(keys_of(&live).is_empty());
    let trash = body_json(send(&app, request(Method::GET, "/api/trash-list")).await).await;
    assert_eq!(keys_of(&trash), ["a.png"]);
    assert_eq!(trash["files"][0]["trashKey"], "trash/a.png");
    assert_eq!(trash["files"][0]["size"], 3);

    let response = send(&app, request(Method::POST, "/api/trash-restore?key=a.png")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["key"], "a.png");

    let live = body_json(send(&app, request(Method::GET, "/api/list")).await).await;
    assert_eq!(keys_of(&live), ["a.png"]);
    assert_eq!(
        live["files"][0]["url"],
        "http://localhost:9000/my-gallery/a.png"
    );
}

#[tokio::test]
async fn purge_is_final() {
    let (app, _) = gallery();
    upload_one(&app, "a.png", b"aaa").await;
    send(&app, request(Method::POST, "/api/trash-move?key=a.png")).await;

    let response = send(&app, request(Method::DELETE, "/api/trash-delete?key=a.png")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let trash = body_json(send(&app, request(Method::GET, "/api/trash-list")).await).await;
    assert!(keys_of(&trash).is_empty());

    let response = send(&app, request(Method::POST, "/api/trash-restore?key=a.png")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hard_delete_bypasses_trash() {
    let (app, store) = gallery();
    upload_one(&app, "a.png", b"aaa").await;

    let response = send(&app, request(Method::DELETE, "/api/delete?key=a.png")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.keys(BUCKET).await.is_empty());
}

#[tokio::test]
async fn interrupted_move_reports_error_and_leaves_duplicate() {
    let (app, store) = gallery();
    upload_one(&app, "a.png", b"aaa").await;
    store.fail(StoreOp::DeleteObject, "a.png").await;

    let response = send(&app, request(Method::POST, "/api/trash-move?key=a.png")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "InternalError");
    assert_eq!(store.keys(BUCKET).await, ["a.png", "trash/a.png"]);
}

#[tokio::test]
async fn wrong_method_is_rejected() {
    let (app, _) = gallery();
    let response = send(&app, request(Method::GET, "/api/trash-move?key=a.png")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

fn zip_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/download-zip")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn zip_export_skips_missing_keys() {
    let (app, _) = gallery();
    upload_one(&app, "a.png", b"aaa").await;
    upload_one(&app, "b.png", b"bbb").await;

    let response = send(
        &app,
        zip_request(json!({ "keys": ["a.png", "missing.png", "b.png"] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"gallery-download-"));
    assert!(disposition.ends_with(".zip\""));

    let mut archive = ZipArchive::new(Cursor::new(body_bytes(response).await)).unwrap();
    let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, ["a.png", "b.png"]);

    let mut contents = Vec::new();
    archive
        .by_name("a.png")
        .unwrap()
        .read_to_end(&mut contents)
        .unwrap();
    assert_eq!(contents, b"aaa");
}

#[tokio::test(flavor = "multi_thread")]
async fn zip_export_from_trash() {
    let (app, _) = gallery();
    upload_one(&app, "a.png", b"aaa").await;
    send(&app, request(Method::POST, "/api/trash-move?key=a.png")).await;

    let response = send(&app, zip_request(json!({ "keys": ["a.png"], "bin": true }))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let archive = ZipArchive::new(Cursor::new(body_bytes(response).await)).unwrap();
    assert_eq!(archive.file_names().collect::<Vec<_>>(), ["a.png"]);
}

#[tokio::test]
async fn zip_export_validates_keys() {
    let (app, _) = gallery();

    for body in [json!({}), json!({ "keys": [] }), json!({ "keys": "a.png" })] {
        let response = send(&app, zip_request(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "keys array required");
    }

    let response = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/download-zip")
            .body(Body::from("not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_store_state_without_provisioning() {
    let (app, store) = gallery();

    let response = send(&app, request(Method::GET, "/api/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["bucket"], BUCKET);
    assert_eq!(body["bucketExists"], false);
    assert_eq!(body["buckets"], json!([]));
    assert_eq!(store.create_bucket_calls(), 0);

    store.fail(StoreOp::ListBuckets, "").await;
    let response = send(&app, request(Method::GET, "/api/health")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["ok"], false);
}

#[tokio::test]
async fn liveness_needs_no_store() {
    let (app, store) = gallery();
    let response = send(&app, request(Method::GET, "/healthz")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    assert_eq!(store.create_bucket_calls(), 0);
}
