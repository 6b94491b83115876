//! Atomic, cancelable single-file copy
//!
//! Data is streamed into a sibling partial file and renamed onto the final
//! destination only after every byte is written and metadata is applied, so
//! observers never see a half-written file. The cancellation token is polled
//! between chunks; a cancelled copy leaves the destination untouched.

use crate::metadata::preserve_metadata;
use porter_types::{CancelToken, Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace};

/// Suffix appended to the destination path while a copy is in flight
pub const PARTIAL_SUFFIX: &str = ".porter-partial";

/// Sibling partial-file path for a destination
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Copy a regular file onto `dest`, replacing whatever is there
///
/// Returns the number of bytes copied. On any failure, including
/// cancellation, the partial file is removed before the error is returned.
pub async fn copy_file_atomic(
    source: &Path,
    dest: &Path,
    buffer_size: usize,
    cancel: &CancelToken,
) -> Result<u64> {
    let partial = partial_path(dest);

    match copy_to_partial(source, dest, &partial, buffer_size, cancel).await {
        Ok(bytes_copied) => {
            debug!(
                "Copied '{}' -> '{}' ({} bytes)",
                source.display(),
                dest.display(),
                bytes_copied
            );
            Ok(bytes_copied)
        }
        Err(error) => {
            if let Err(cleanup) = fs::remove_file(&partial).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    debug!(
                        "Could not remove partial file '{}': {}",
                        partial.display(),
                        cleanup
                    );
                }
            }
            Err(error)
        }
    }
}

async fn copy_to_partial(
    source: &Path,
    dest: &Path,
    partial: &Path,
    buffer_size: usize,
    cancel: &CancelToken,
) -> Result<u64> {
    let source_metadata = fs::symlink_metadata(source)
        .await
        .map_err(|e| Error::io_at("read metadata for", source, e))?;

    let mut reader = File::open(source)
        .await
        .map_err(|e| Error::io_at("open", source, e))?;
    let mut writer = File::create(partial)
        .await
        .map_err(|e| Error::io_at("create partial file", partial, e))?;

    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut bytes_copied = 0u64;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let bytes_read = reader
            .read(&mut buffer)
            .await
            .map_err(|e| Error::io_at("read from", source, e))?;
        if bytes_read == 0 {
            break; // EOF
        }

        writer
            .write_all(&buffer[..bytes_read])
            .await
            .map_err(|e| Error::io_at("write to partial file", partial, e))?;
        bytes_copied += bytes_read as u64;
        trace!("copied chunk of {} bytes", bytes_read);
    }

    writer
        .flush()
        .await
        .map_err(|e| Error::io_at("flush partial file", partial, e))?;
    drop(writer);

    // Apply permission bits and times to the partial file so the rename
    // publishes a fully-formed destination.
    preserve_metadata(&source_metadata, partial).await?;

    fs::rename(partial, dest)
        .await
        .map_err(|e| Error::io_at("rename partial file onto", dest, e))?;

    Ok(bytes_copied)
}
