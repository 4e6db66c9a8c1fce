//! Lazy, idempotent bucket provisioning.

use crate::{
    errors::GalleryError,
    store::{ObjectStore, StoreError},
};
use tracing::{debug, info};

/// Make sure `bucket` exists, creating it if the probe fails.
///
/// Safe to call on every request: when the bucket exists this is a single
/// `HeadBucket`. A failed probe is not trusted to mean "missing" (stores
/// disagree on status codes), so creation is attempted; a create that loses
/// a race to another caller reports `Conflict`, which counts as success.
pub async fn ensure_bucket_exists(store: &dyn ObjectStore, bucket: &str) -> Result<(), GalleryError> {
    if bucket.is_empty() {
        return Err(GalleryError::Config("AWS_S3_BUCKET is not set".into()));
    }

    match store.head_bucket(bucket).await {
        Ok(()) => return Ok(()),
        Err(err) => debug!(bucket, error = %err, "bucket probe failed, attempting create"),
    }

    match store.create_bucket(bucket).await {
        Ok(()) => {
            info!(bucket, "created bucket");
            Ok(())
        }
        Err(StoreError::Conflict { code }) => {
            debug!(bucket, code = %code, "bucket already exists");
            Ok(())
        }
        Err(err) => Err(GalleryError::Store(err)),
    }
}
