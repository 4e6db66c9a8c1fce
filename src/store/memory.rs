//! In-process `ObjectStore` used for local development and tests.
//!
//! Buckets are `BTreeMap`s so listings come back in lexicographic key order,
//! matching what S3-compatible stores return.

use super::{ObjectStore, StoreError, StoreOp, StoreResult};
use crate::models::object::{ObjectBody, ObjectSummary};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use std::{
    collections::{BTreeMap, HashSet},
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

#[derive(Clone, Debug)]
struct StoredObject {
    body: Bytes,
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
}

type Bucket = BTreeMap<String, StoredObject>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<RwLock<BTreeMap<String, Bucket>>>,
    faults: Arc<Mutex<HashSet<(StoreOp, String)>>>,
    broken_bodies: Arc<Mutex<HashSet<String>>>,
    create_bucket_calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `op` addressed at `target` fail with a 500 until healed.
    ///
    /// `target` is the object key for object operations, the source key for
    /// copies, the bucket name for bucket operations, and `""` for
    /// `ListBuckets`.
    pub async fn fail(&self, op: StoreOp, target: impl Into<String>) {
        self.faults.lock().await.insert((op, target.into()));
    }

    pub async fn heal(&self, op: StoreOp, target: &str) {
        self.faults.lock().await.remove(&(op, target.to_string()));
    }

    /// Make the body of `key` deliver its first half and then fail with a
    /// connection reset, as a dropped download would.
    pub async fn break_body(&self, key: impl Into<String>) {
        self.broken_bodies.lock().await.insert(key.into());
    }

    /// How many times `create_bucket` has been invoked, successful or not.
    pub fn create_bucket_calls(&self) -> usize {
        self.create_bucket_calls.load(Ordering::SeqCst)
    }

    /// Whether `key` currently holds an object.
    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .read()
            .await
            .get(bucket)
            .is_some_and(|b| b.contains_key(key))
    }

    /// Every key in `bucket`, in order.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn check_fault(&self, op: StoreOp, target: &str) -> StoreResult<()> {
        if self.faults.lock().await.contains(&(op, target.to_string())) {
            return Err(StoreError::Service {
                operation: op,
                status: Some(500),
                code: Some("InternalError".into()),
                message: format!("injected failure for `{target}`"),
            });
        }
        Ok(())
    }
}

fn no_such_bucket(op: StoreOp, bucket: &str) -> StoreError {
    StoreError::Service {
        operation: op,
        status: Some(404),
        code: Some("NoSuchBucket".into()),
        message: format!("bucket `{bucket}` does not exist"),
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.check_fault(StoreOp::HeadBucket, bucket).await?;
        if self.buckets.read().await.contains_key(bucket) {
            Ok(())
        } else {
            Err(no_such_bucket(StoreOp::HeadBucket, bucket))
        }
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.create_bucket_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fault(StoreOp::CreateBucket, bucket).await?;
        let mut buckets = self.buckets.write().await;
        if buckets.contains_key(bucket) {
            return Err(StoreError::Conflict {
                code: "BucketAlreadyOwnedByYou".into(),
            });
        }
        buckets.insert(bucket.to_string(), Bucket::new());
        debug!(bucket, "created in-memory bucket");
        Ok(())
    }

    async fn list_buckets(&self) -> StoreResult<Vec<String>> {
        self.check_fault(StoreOp::ListBuckets, "").await?;
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> StoreResult<()> {
        self.check_fault(StoreOp::PutObject, key).await?;
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(StoreOp::PutObject, bucket))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.map(str::to_string),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectBody> {
        self.check_fault(StoreOp::GetObject, key).await?;
        let buckets = self.buckets.read().await;
        let object = buckets
            .get(bucket)
            .ok_or_else(|| no_such_bucket(StoreOp::GetObject, bucket))?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })?;

        let content_length = Some(object.body.len() as u64);
        let body = if self.broken_bodies.lock().await.contains(key) {
            let head = object.body.slice(..object.body.len() / 2);
            stream::iter([
                Ok(head),
                Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    format!("connection reset reading `{key}`"),
                )),
            ])
            .boxed()
        } else {
            let body = object.body;
            stream::once(async move { Ok(body) }).boxed()
        };
        Ok(ObjectBody {
            content_type: object.content_type,
            content_length,
            body,
        })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> StoreResult<Vec<ObjectSummary>> {
        self.check_fault(StoreOp::ListObjects, bucket).await?;
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| no_such_bucket(StoreOp::ListObjects, bucket))?;
        let prefix = prefix.unwrap_or("");
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: Some(object.body.len() as u64),
                last_modified: Some(object.last_modified),
            })
            .collect())
    }

    async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str) -> StoreResult<()> {
        self.check_fault(StoreOp::CopyObject, src_key).await?;
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(StoreOp::CopyObject, bucket))?;
        let mut object = objects
            .get(src_key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                key: src_key.to_string(),
            })?;
        object.last_modified = Utc::now();
        objects.insert(dst_key.to_string(), object);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.check_fault(StoreOp::DeleteObject, key).await?;
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket(StoreOp::DeleteObject, bucket))?;
        objects.remove(key);
        Ok(())
    }
}
