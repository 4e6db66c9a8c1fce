//! GalleryService — every gallery operation, expressed as object store calls.
//!
//! Each operation ensures the bucket exists and then issues its store
//! requests one after another. Move and restore are copy-then-delete; if the
//! delete fails after the copy succeeded, the object is left in both
//! namespaces and the error is returned as-is. There is no rollback.

use crate::{
    errors::GalleryError,
    models::{
        file::{LiveFile, TrashedFile, format_timestamp},
        object::ObjectBody,
    },
    services::{
        archive::{self, ArchiveExport},
        bucket::ensure_bucket_exists,
        namespace::{TRASH_PREFIX, is_trashed, original_key, trash_key, upload_key},
    },
    store::ObjectStore,
};
use bytes::Bytes;
use chrono::Utc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// What `encodeURIComponent` escapes.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode `value` the way browsers encode a URI component.
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// One file received for upload.
#[derive(Clone, Debug)]
pub struct UploadFile {
    /// Filename as submitted by the client.
    pub filename: String,
    pub content_type: Option<String>,
    pub body: Bytes,
    /// Optional human-friendly name to store the file under.
    pub custom_name: Option<String>,
}

/// Store connectivity report; never creates anything.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub ok: bool,
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub bucket_exists: bool,
    pub buckets: Vec<String>,
}

#[derive(Clone)]
pub struct GalleryService {
    store: Arc<dyn ObjectStore>,

    /// Target bucket. Empty means "not configured".
    bucket: String,

    /// Store endpoint, used to build direct object URLs and for health.
    endpoint: String,

    region: String,
}

impl GalleryService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        endpoint: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            endpoint: endpoint.into(),
            region: region.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ensure_bucket(&self) -> Result<(), GalleryError> {
        ensure_bucket_exists(self.store.as_ref(), &self.bucket).await
    }

    /// Live items with a direct URL each.
    ///
    /// An object is live exactly when its key is not under `trash/`, so keys
    /// in the trash namespace are left out here and reported by
    /// [`Self::list_trash`] instead.
    pub async fn list_live(&self) -> Result<Vec<LiveFile>, GalleryError> {
        self.ensure_bucket().await?;
        let objects = self.store.list_objects(&self.bucket, None).await?;
        let base = self.endpoint.trim_end_matches('/');

        Ok(objects
            .into_iter()
            .filter(|obj| !is_trashed(&obj.key))
            .map(|obj| LiveFile {
                url: format!("{}/{}/{}", base, self.bucket, encode_uri_component(&obj.key)),
                key: obj.key,
                size: obj.size,
                last_modified: format_timestamp(obj.last_modified),
            })
            .collect())
    }

    /// Trashed items under their original keys. The bare `trash/` folder
    /// placeholder is not an item.
    pub async fn list_trash(&self) -> Result<Vec<TrashedFile>, GalleryError> {
        self.ensure_bucket().await?;
        let objects = self
            .store
            .list_objects(&self.bucket, Some(TRASH_PREFIX))
            .await?;

        Ok(objects
            .into_iter()
            .filter_map(|obj| {
                let key = original_key(&obj.key)?.to_string();
                Some(TrashedFile {
                    key,
                    size: obj.size,
                    last_modified: format_timestamp(obj.last_modified),
                    trash_key: obj.key,
                })
            })
            .collect())
    }

    /// Store each file in order and return the keys used. Existing objects
    /// are overwritten. The first failure stops the batch; files stored
    /// before it stay stored.
    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<String>, GalleryError> {
        if files.is_empty() {
            return Err(GalleryError::bad_request("No file(s) provided"));
        }
        self.ensure_bucket().await?;

        let mut keys = Vec::with_capacity(files.len());
        for file in files {
            let key = upload_key(&file.filename, file.custom_name.as_deref());
            if key.is_empty() {
                return Err(GalleryError::bad_request("file has neither a filename nor a key"));
            }
            self.store
                .put_object(&self.bucket, &key, file.body, file.content_type.as_deref())
                .await?;
            debug!(key = %key, "uploaded object");
            keys.push(key);
        }

        info!(count = keys.len(), "upload complete");
        Ok(keys)
    }

    /// Open an object by its physical key (live or `trash/...`).
    pub async fn download(&self, key: &str) -> Result<ObjectBody, GalleryError> {
        require_key(key)?;
        self.ensure_bucket().await?;
        Ok(self.store.get_object(&self.bucket, key).await?)
    }

    /// LIVE -> TRASHED. Returns the trash key.
    pub async fn move_to_trash(&self, key: &str) -> Result<String, GalleryError> {
        require_key(key)?;
        if is_trashed(key) {
            return Err(GalleryError::bad_request(format!(
                "`{key}` is already in the trash"
            )));
        }
        self.ensure_bucket().await?;

        let dst = trash_key(key);
        self.store.copy_object(&self.bucket, key, &dst).await?;
        self.store.delete_object(&self.bucket, key).await?;
        info!(key, trash_key = %dst, "moved to trash");
        Ok(dst)
    }

    /// TRASHED -> LIVE. Returns the restored key.
    pub async fn restore(&self, key: &str) -> Result<String, GalleryError> {
        require_key(key)?;
        self.ensure_bucket().await?;

        let src = trash_key(key);
        self.store.copy_object(&self.bucket, &src, key).await?;
        self.store.delete_object(&self.bucket, &src).await?;
        info!(key, "restored from trash");
        Ok(key.to_string())
    }

    /// TRASHED -> ABSENT. Irreversible.
    pub async fn purge(&self, key: &str) -> Result<(), GalleryError> {
        require_key(key)?;
        self.ensure_bucket().await?;

        self.store.delete_object(&self.bucket, &trash_key(key)).await?;
        info!(key, "purged from trash");
        Ok(())
    }

    /// Permanently delete a key, bypassing the trash.
    pub async fn delete_live(&self, key: &str) -> Result<(), GalleryError> {
        require_key(key)?;
        self.ensure_bucket().await?;

        self.store.delete_object(&self.bucket, key).await?;
        info!(key, "deleted permanently");
        Ok(())
    }

    /// Start a streamed ZIP export of `keys`.
    pub async fn export_archive(
        &self,
        keys: Vec<String>,
        from_trash: bool,
    ) -> Result<ArchiveExport, GalleryError> {
        if keys.is_empty() {
            return Err(GalleryError::bad_request("keys array required"));
        }
        self.ensure_bucket().await?;

        let file_name = format!("gallery-download-{}.zip", Utc::now().timestamp_millis());
        Ok(archive::export_archive(
            self.store.clone(),
            self.bucket.clone(),
            keys,
            from_trash,
            file_name,
        ))
    }

    /// Probe the store without provisioning anything.
    pub async fn health(&self) -> Result<HealthReport, GalleryError> {
        let buckets = self.store.list_buckets().await?;
        let bucket_exists =
            !self.bucket.is_empty() && self.store.head_bucket(&self.bucket).await.is_ok();

        Ok(HealthReport {
            ok: true,
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            bucket: self.bucket.clone(),
            bucket_exists,
            buckets,
        })
    }
}

fn require_key(key: &str) -> Result<(), GalleryError> {
    if key.is_empty() {
        return Err(GalleryError::bad_request("Missing key"));
    }
    Ok(())
}
