//! Metadata preservation helpers

use porter_types::{Error, Result};
use std::path::Path;
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// Copy permission bits and file times from `source_metadata` onto `dest`
///
/// Used on the partial file right before it is renamed into place.
pub async fn preserve_metadata(source_metadata: &std::fs::Metadata, dest: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(source_metadata.permissions().mode());
        fs::set_permissions(dest, permissions)
            .await
            .map_err(|e| Error::io_at("set permissions on", dest, e))?;
    }

    let accessed = source_metadata
        .accessed()
        .unwrap_or_else(|_| SystemTime::now());
    let modified = source_metadata
        .modified()
        .unwrap_or_else(|_| SystemTime::now());

    filetime::set_file_times(
        dest,
        filetime::FileTime::from_system_time(accessed),
        filetime::FileTime::from_system_time(modified),
    )
    .map_err(|e| Error::io_at("set file times on", dest, e))?;

    Ok(())
}

/// Best-effort permission-bit inheritance for directories
///
/// Unlike [`preserve_metadata`], a failure here is logged and swallowed: a
/// directory that cannot take the source's mode bits is still usable as a
/// copy destination.
pub async fn inherit_permissions(source_metadata: &std::fs::Metadata, dest: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(source_metadata.permissions().mode());
        if let Err(error) = fs::set_permissions(dest, permissions).await {
            debug!(
                "Could not inherit permissions for '{}': {}",
                dest.display(),
                error
            );
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (source_metadata, dest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_preserve_metadata_copies_times() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.txt");
        let dest = temp_dir.path().join("dest.txt");
        fs::write(&source, b"a").await.unwrap();
        fs::write(&dest, b"b").await.unwrap();

        let past = filetime::FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_times(&source, past, past).unwrap();

        let metadata = fs::metadata(&source).await.unwrap();
        preserve_metadata(&metadata, &dest).await.unwrap();

        let dest_metadata = fs::metadata(&dest).await.unwrap();
        assert_eq!(
            filetime::FileTime::from_last_modification_time(&dest_metadata),
            past
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_inherit_permissions_is_best_effort() {
        let temp_dir = TempDir::new().unwrap();
        let source_dir = temp_dir.path().join("src_dir");
        fs::create_dir(&source_dir).await.unwrap();
        let metadata = fs::metadata(&source_dir).await.unwrap();

        // Missing destination: must not error, only log.
        inherit_permissions(&metadata, &temp_dir.path().join("missing")).await;
    }
}
