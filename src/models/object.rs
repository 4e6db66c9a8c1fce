//! Store-side view of an object: what a listing reports and what a fetch returns.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::{fmt, io};

/// One entry of a bucket listing.
///
/// `size` and `last_modified` are optional because not every store reports
/// them; absence is kept as absence instead of being coerced to zero/epoch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Full physical key inside the bucket.
    pub key: String,

    /// Payload size in bytes, when known.
    pub size: Option<u64>,

    /// Last modification time reported by the store, when known.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Byte stream of an object body.
pub type BodyStream = BoxStream<'static, io::Result<Bytes>>;

/// A fetched object: headers plus a body that has not been read yet.
pub struct ObjectBody {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: BodyStream,
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
