//! Shared test utilities
//!
//! Common helpers used across the integration tests to keep fixture setup
//! consistent.

use porter_engine::{TaskId, TaskManager, TaskSnapshot};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Create a file with deterministic content derived from its size
pub fn create_test_file(path: &Path, size: usize) -> std::io::Result<()> {
    let content: Vec<u8> = (0..size).map(|i| ((i * 7 + 13) % 256) as u8).collect();
    fs::write(path, content)
}

/// Create a nested directory structure with files of several sizes
///
/// Returns the paths of the created files, relative to `base_path`.
pub fn create_test_directory_structure(base_path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let sub_dirs = ["subdir1", "subdir2", "subdir1/nested"];
    for dir in &sub_dirs {
        fs::create_dir_all(base_path.join(dir))?;
    }

    let files = [
        ("small.txt", 1024),
        ("medium.txt", 64 * 1024),
        ("subdir1/file1.txt", 2048),
        ("subdir2/file2.txt", 4096),
        ("subdir1/nested/file3.txt", 8192),
    ];

    let mut created = Vec::new();
    for (file_path, size) in &files {
        create_test_file(&base_path.join(file_path), *size)?;
        created.push(PathBuf::from(file_path));
    }

    Ok(created)
}

/// Poll `list()` until the task reaches a terminal status
///
/// Panics if the task is still live after ten seconds.
pub async fn wait_terminal(manager: &TaskManager, id: TaskId) -> TaskSnapshot {
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(snapshot) = manager.list().into_iter().find(|s| s.id == id) {
            if snapshot.status.is_terminal() {
                return snapshot;
            }
        }
        assert!(
            std::time::Instant::now() < deadline,
            "task {id} did not reach a terminal status in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
