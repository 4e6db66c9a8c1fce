//! Batch download as a streamed ZIP archive.
//!
//! The archive is written by the synchronous `zip` writer on a blocking
//! thread into one end of an in-memory pipe; the other end becomes the HTTP
//! body. Object bodies are copied into the archive as they arrive from the
//! store, so memory use is bounded by the pipe and copy buffers rather than
//! by the size of the export.

use crate::{
    errors::GalleryError,
    services::namespace::{entry_name, physical_key},
    store::ObjectStore,
};
use serde_json::Value;
use std::{
    collections::HashMap,
    io::{self, Read, Write},
    sync::Arc,
};
use tokio::{
    io::{DuplexStream, duplex},
    runtime::Handle,
};
use tokio_util::io::{ReaderStream, StreamReader, SyncIoBridge};
use tracing::{error, info, warn};
use zip::{
    CompressionMethod, ZipWriter,
    result::ZipResult,
    write::SimpleFileOptions,
};

const PIPE_CAPACITY: usize = 64 * 1024;
const COMPRESSION_LEVEL: i64 = 9;
const COPY_BUFFER: usize = 16 * 1024;

/// A running export: read `body` to receive the archive bytes.
pub struct ArchiveExport {
    /// Suggested download filename.
    pub file_name: String,
    pub body: ReaderStream<DuplexStream>,
}

/// Outcome of a finished export, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries: usize,
    pub skipped: usize,
}

/// Validate the `keys` field of an export request.
///
/// The field must be a non-empty array. Elements that are not non-empty
/// strings are dropped; if nothing usable remains the request is rejected.
pub fn requested_keys(keys: Option<&Value>) -> Result<Vec<String>, GalleryError> {
    let items = match keys {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return Err(GalleryError::bad_request("keys array required")),
    };

    let keys: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(key) if !key.is_empty() => Some(key.clone()),
            other => {
                warn!(entry = %other, "ignoring non-string key in archive request");
                None
            }
        })
        .collect();

    if keys.is_empty() {
        return Err(GalleryError::bad_request("keys must contain at least one string"));
    }
    Ok(keys)
}

/// Start streaming an archive of `keys`.
///
/// Must be called from within a Tokio runtime. Keys are read from the trash
/// namespace when `from_trash` is set. A key that cannot be fetched is
/// skipped with a warning; the archive is still finished. A body that fails
/// mid-read leaves a truncated entry and the export moves on. When several
/// keys share an entry name, the last one requested wins.
pub fn export_archive(
    store: Arc<dyn ObjectStore>,
    bucket: String,
    keys: Vec<String>,
    from_trash: bool,
    file_name: String,
) -> ArchiveExport {
    let (reader, writer) = duplex(PIPE_CAPACITY);
    let handle = Handle::current();
    let sink = SyncIoBridge::new_with_handle(writer, handle.clone());

    tokio::task::spawn_blocking(move || {
        match write_archive(&handle, store.as_ref(), &bucket, &keys, from_trash, sink) {
            Ok(summary) => info!(
                entries = summary.entries,
                skipped = summary.skipped,
                from_trash,
                "archive export finished"
            ),
            Err(err) => error!(error = %err, from_trash, "archive export aborted"),
        }
    });

    ArchiveExport {
        file_name,
        body: ReaderStream::new(reader),
    }
}

fn write_archive<W: Write>(
    handle: &Handle,
    store: &dyn ObjectStore,
    bucket: &str,
    keys: &[String],
    from_trash: bool,
    sink: W,
) -> ZipResult<ArchiveSummary> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));
    let mut zip = ZipWriter::new_stream(sink);
    let mut summary = ArchiveSummary::default();
    let mut buf = vec![0u8; COPY_BUFFER];

    // A later key with the same entry name replaces an earlier one.
    let mut last_index = HashMap::new();
    for (index, key) in keys.iter().enumerate() {
        last_index.insert(entry_name(key), index);
    }

    for (index, key) in keys.iter().enumerate() {
        let object_key = physical_key(key, from_trash);
        let name = entry_name(key);
        if last_index.get(name) != Some(&index) {
            warn!(
                key = %object_key,
                name,
                "skipping key replaced by a later entry of the same name"
            );
            summary.skipped += 1;
            continue;
        }

        let object = match handle.block_on(store.get_object(bucket, &object_key)) {
            Ok(object) => object,
            Err(err) => {
                warn!(key = %object_key, error = %err, "skipping key in archive");
                summary.skipped += 1;
                continue;
            }
        };

        zip.start_file(name, options)?;
        let mut body = SyncIoBridge::new_with_handle(StreamReader::new(object.body), handle.clone());
        match copy_entry(&mut body, &mut zip, &mut buf) {
            Ok(_) => summary.entries += 1,
            Err(CopyError::Read(err)) => {
                warn!(
                    key = %object_key,
                    error = %err,
                    "object body failed mid-read; entry truncated"
                );
                summary.skipped += 1;
            }
            Err(CopyError::Write(err)) => return Err(err.into()),
        }
    }

    zip.finish()?.flush()?;
    Ok(summary)
}

enum CopyError {
    /// The object body could not be read; the archive is still usable.
    Read(io::Error),
    /// The archive sink failed; nothing more can be written.
    Write(io::Error),
}

fn copy_entry<R: Read, W: Write>(
    body: &mut R,
    sink: &mut W,
    buf: &mut [u8],
) -> Result<u64, CopyError> {
    let mut copied = 0;
    loop {
        let n = match body.read(buf) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CopyError::Read(err)),
        };
        sink.write_all(&buf[..n]).map_err(CopyError::Write)?;
        copied += n as u64;
    }
}
