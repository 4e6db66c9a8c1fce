//! Object store gateway.
//!
//! A thin capability surface over a bucket-oriented object store. Every
//! method maps onto exactly one store request; nothing here retries, caches
//! or combines calls. Multi-step behavior (move to trash, restore, archive
//! export) lives in `services`.

pub mod memory;
pub mod s3;

use crate::models::object::{ObjectBody, ObjectSummary};
use async_trait::async_trait;
use bytes::Bytes;
use std::{fmt, io};
use thiserror::Error;

pub use memory::MemoryStore;
pub use s3::{S3Settings, S3Store};

/// Names of the store requests, used for logging and fault injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreOp {
    HeadBucket,
    CreateBucket,
    ListBuckets,
    PutObject,
    GetObject,
    ListObjects,
    CopyObject,
    DeleteObject,
}

impl StoreOp {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreOp::HeadBucket => "head_bucket",
            StoreOp::CreateBucket => "create_bucket",
            StoreOp::ListBuckets => "list_buckets",
            StoreOp::PutObject => "put_object",
            StoreOp::GetObject => "get_object",
            StoreOp::ListObjects => "list_objects",
            StoreOp::CopyObject => "copy_object",
            StoreOp::DeleteObject => "delete_object",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed object (or copy source) does not exist.
    #[error("object `{key}` not found")]
    NotFound { key: String },

    /// The store refused a create because the resource already exists.
    #[error("resource already exists ({code})")]
    Conflict { code: String },

    /// Any other store-side or transport failure.
    #[error("{operation} failed: {message}")]
    Service {
        operation: StoreOp,
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// Reading an object body failed part-way.
    #[error("reading object body: {0}")]
    Body(#[from] io::Error),
}

impl StoreError {
    /// HTTP status reported by the store, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::NotFound { .. } => Some(404),
            StoreError::Conflict { .. } => Some(409),
            StoreError::Service { status, .. } => *status,
            StoreError::Body(_) => None,
        }
    }

    /// Store-specific error code (e.g. `NoSuchBucket`), when there was one.
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::NotFound { .. } => Some("NoSuchKey"),
            StoreError::Conflict { code } => Some(code.as_str()),
            StoreError::Service { code, .. } => code.as_deref(),
            StoreError::Body(_) => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The operations the gallery consumes from an object store.
///
/// Implementations must be cheap to share: the process builds one handle and
/// passes it (as `Arc<dyn ObjectStore>`) to every component.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lightweight existence probe. Any failure is reported as an error; the
    /// caller decides what a failed probe means.
    async fn head_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Create a bucket. An existing bucket is `StoreError::Conflict`.
    async fn create_bucket(&self, bucket: &str) -> StoreResult<()>;

    async fn list_buckets(&self) -> StoreResult<Vec<String>>;

    /// Store `body` at `key`, replacing whatever was there.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> StoreResult<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectBody>;

    /// Every object whose key starts with `prefix`, in store order.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> StoreResult<Vec<ObjectSummary>>;

    /// Server-side copy inside one bucket.
    async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str) -> StoreResult<()>;

    /// Delete `key`. Deleting a key that does not exist succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;
}
