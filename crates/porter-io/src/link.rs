//! Symbolic link transfer
//!
//! Links are recreated, never dereferenced: the destination gets a new link
//! pointing at the same target string the source carried.

use porter_types::{Error, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Recreate the symlink at `source` as `dest`
///
/// Any pre-existing object at `dest` is removed first. With `remove_source`
/// set (a move), the source link is removed after the new one exists.
pub async fn transfer_symlink(source: &Path, dest: &Path, remove_source: bool) -> Result<()> {
    let target = fs::read_link(source)
        .await
        .map_err(|e| Error::io_at("read symlink", source, e))?;

    remove_existing(dest).await?;

    create_symlink(&target, dest)
        .await
        .map_err(|e| Error::io_at("create symlink at", dest, e))?;

    debug!(
        "Linked '{}' -> '{}' (target '{}')",
        source.display(),
        dest.display(),
        target.display()
    );

    if remove_source {
        fs::remove_file(source)
            .await
            .map_err(|e| Error::io_at("remove source symlink", source, e))?;
    }

    Ok(())
}

async fn remove_existing(dest: &Path) -> Result<()> {
    match fs::symlink_metadata(dest).await {
        Ok(metadata) => {
            if metadata.is_dir() {
                fs::remove_dir_all(dest)
                    .await
                    .map_err(|e| Error::io_at("remove existing directory", dest, e))
            } else {
                fs::remove_file(dest)
                    .await
                    .map_err(|e| Error::io_at("remove existing file", dest, e))
            }
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(Error::io_at("inspect", dest, error)),
    }
}

#[cfg(unix)]
async fn create_symlink(target: &Path, dest: &Path) -> std::io::Result<()> {
    fs::symlink(target, dest).await
}

#[cfg(windows)]
async fn create_symlink(target: &Path, dest: &Path) -> std::io::Result<()> {
    // The target kind is unknown without dereferencing; file links cover the
    // common case for user data.
    fs::symlink_file(target, dest).await
}

#[cfg(all(unix, test))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_symlink_target_is_preserved() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("link");
        let dest = temp_dir.path().join("copied-link");
        fs::symlink("some/relative/target", &link).await.unwrap();

        transfer_symlink(&link, &dest, false).await.unwrap();

        let target = fs::read_link(&dest).await.unwrap();
        assert_eq!(target, Path::new("some/relative/target"));
        assert!(fs::symlink_metadata(&link).await.is_ok());
    }

    #[tokio::test]
    async fn test_symlink_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("link");
        let dest = temp_dir.path().join("occupied");
        fs::symlink("/etc/hosts", &link).await.unwrap();
        fs::write(&dest, b"in the way").await.unwrap();

        transfer_symlink(&link, &dest, false).await.unwrap();

        let metadata = fs::symlink_metadata(&dest).await.unwrap();
        assert!(metadata.file_type().is_symlink());
    }

    #[tokio::test]
    async fn test_move_removes_source_link() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("link");
        let dest = temp_dir.path().join("moved-link");
        fs::symlink("target", &link).await.unwrap();

        transfer_symlink(&link, &dest, true).await.unwrap();

        assert!(fs::symlink_metadata(&link).await.is_err());
        assert_eq!(fs::read_link(&dest).await.unwrap(), Path::new("target"));
    }
}
