//! Client-facing projections of the bucket listing.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// A live gallery item as returned by `GET /api/list`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LiveFile {
    /// Object key, verbatim.
    pub key: String,

    /// Direct URL on the store endpoint (only reachable for public buckets).
    pub url: String,

    /// Size in bytes, `null` when the store did not report one.
    pub size: Option<u64>,

    /// ISO-8601 timestamp with milliseconds, `null` when unknown.
    pub last_modified: Option<String>,
}

/// A soft-deleted item as returned by `GET /api/trash-list`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrashedFile {
    /// Original key, with the trash prefix stripped.
    pub key: String,

    /// Physical key inside the trash namespace.
    pub trash_key: String,

    pub size: Option<u64>,
    pub last_modified: Option<String>,
}

/// Render a store timestamp the way browsers print `Date.toISOString()`.
pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}
