//! `ObjectStore` backed by any S3-compatible service (AWS S3, MinIO, R2, ...).

use super::{ObjectStore, StoreError, StoreOp, StoreResult};
use crate::models::object::{ObjectBody, ObjectSummary};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Region, http::HttpResponse},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::{ByteStream, DateTime as AwsDateTime},
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::{fmt, io};
use tracing::debug;

/// Characters `encodeURIComponent` leaves alone, plus `/` so nested keys
/// keep their structure inside an `x-amz-copy-source` header.
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'/');

/// Connection settings for an S3-compatible endpoint.
#[derive(Clone)]
pub struct S3Settings {
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    pub force_path_style: bool,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
    region: String,
}

impl S3Store {
    /// Build a client with static credentials. No request is sent here.
    pub fn new(settings: &S3Settings) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            "static",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .endpoint_url(settings.endpoint.clone())
            .credentials_provider(credentials)
            .force_path_style(settings.force_path_style)
            .build();

        Self {
            client: Client::from_conf(config),
            region: settings.region.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head_bucket(&self, bucket: &str) -> StoreResult<()> {
        debug!(bucket, operation = %StoreOp::HeadBucket, "store request");
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| classify(StoreOp::HeadBucket, bucket, err))?;
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        debug!(bucket, operation = %StoreOp::CreateBucket, "store request");
        let mut request = self.client.create_bucket().bucket(bucket);
        // us-east-1 is the implicit location and rejects an explicit constraint.
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|err| classify(StoreOp::CreateBucket, bucket, err))?;
        Ok(())
    }

    async fn list_buckets(&self) -> StoreResult<Vec<String>> {
        debug!(operation = %StoreOp::ListBuckets, "store request");
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|err| classify(StoreOp::ListBuckets, "", err))?;
        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> StoreResult<()> {
        debug!(bucket, key, size = body.len(), operation = %StoreOp::PutObject, "store request");
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|err| classify(StoreOp::PutObject, key, err))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectBody> {
        debug!(bucket, key, operation = %StoreOp::GetObject, "store request");
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify(StoreOp::GetObject, key, err))?;

        let content_type = output.content_type().map(str::to_string);
        let content_length = output.content_length().and_then(|n| u64::try_from(n).ok());

        // Pull chunks until the stream ends or errors; an error ends the stream.
        let body = stream::unfold(Some(output.body), |state| async move {
            let mut body = state?;
            match body.try_next().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(body))),
                Ok(None) => None,
                Err(err) => Some((Err(io::Error::other(err)), None)),
            }
        })
        .boxed();

        Ok(ObjectBody {
            content_type,
            content_length,
            body,
        })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> StoreResult<Vec<ObjectSummary>> {
        let mut summaries = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            debug!(
                bucket,
                prefix = prefix.unwrap_or(""),
                page = continuation.is_some(),
                operation = %StoreOp::ListObjects,
                "store request"
            );
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_prefix(prefix.map(str::to_string))
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|err| classify(StoreOp::ListObjects, bucket, err))?;

            summaries.extend(output.contents().iter().filter_map(|obj| {
                Some(ObjectSummary {
                    key: obj.key()?.to_string(),
                    size: obj.size().and_then(|n| u64::try_from(n).ok()),
                    last_modified: obj.last_modified().and_then(to_chrono),
                })
            }));

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(summaries)
    }

    async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str) -> StoreResult<()> {
        debug!(bucket, src_key, dst_key, operation = %StoreOp::CopyObject, "store request");
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(copy_source(bucket, src_key))
            .key(dst_key)
            .send()
            .await
            .map_err(|err| classify(StoreOp::CopyObject, src_key, err))?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        debug!(bucket, key, operation = %StoreOp::DeleteObject, "store request");
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify(StoreOp::DeleteObject, key, err))?;
        Ok(())
    }
}

/// `bucket/key` with the key percent-encoded, as `CopyObject` expects.
fn copy_source(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, utf8_percent_encode(key, COPY_SOURCE))
}

fn to_chrono(ts: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

/// Translate an SDK failure into the gateway's error vocabulary.
///
/// `target` is the key (or bucket) the request addressed; it is only used to
/// label `NotFound`.
fn classify<E>(operation: StoreOp, target: &str, err: SdkError<E, HttpResponse>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|raw| raw.status().as_u16());
    let code = err
        .as_service_error()
        .and_then(|e| e.code())
        .map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();

    classify_parts(operation, target, status, code, message)
}

fn classify_parts(
    operation: StoreOp,
    target: &str,
    status: Option<u16>,
    code: Option<String>,
    message: String,
) -> StoreError {
    let conflict = status == Some(409)
        || matches!(
            code.as_deref(),
            Some("BucketAlreadyOwnedByYou" | "BucketAlreadyExists")
        );
    if conflict {
        return StoreError::Conflict {
            code: code.unwrap_or_else(|| "Conflict".into()),
        };
    }

    let reads_object = matches!(operation, StoreOp::GetObject | StoreOp::CopyObject);
    let missing = matches!(code.as_deref(), Some("NoSuchKey" | "NotFound"))
        || (status == Some(404) && code.is_none());
    if reads_object && missing {
        return StoreError::NotFound {
            key: target.to_string(),
        };
    }

    StoreError::Service {
        operation,
        status,
        code,
        message,
    }
}
