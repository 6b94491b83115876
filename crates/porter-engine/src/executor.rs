//! Transfer executor for running tasks on the worker
//!
//! The executor walks each top-level source in order and transfers it into
//! the destination directory. The first fatal error aborts the whole task;
//! there is no best-effort continuation to remaining sources.

use crate::task::Task;
use porter_io::{copy_file_atomic, inherit_permissions, transfer_symlink};
use porter_types::{Error, FailureRecord};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{debug, info, warn};

/// Configuration for the transfer executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Fixed buffer size for streaming file copies
    pub buffer_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024 * 1024, // 1MB
        }
    }
}

/// Final outcome of executing one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Every source was transferred
    Completed,
    /// A fatal error was recorded against the task
    Failed,
    /// The cancellation signal was observed at a checkpoint
    Cancelled,
}

/// Failure bubbling out of the recursive transfer, keyed by the path that
/// actually failed (possibly a descendant of the top-level source)
#[derive(Debug)]
struct TransferFailure {
    path: PathBuf,
    error: Error,
}

impl TransferFailure {
    fn new(path: &Path, error: Error) -> Self {
        Self {
            path: path.to_path_buf(),
            error,
        }
    }
}

type TransferResult = std::result::Result<(), TransferFailure>;

/// Executes tasks one at a time on behalf of the worker
#[derive(Debug, Clone)]
pub struct TransferExecutor {
    config: ExecutorConfig,
}

impl TransferExecutor {
    /// Create a new executor
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Execute all of a task's sources in order
    ///
    /// Progress and failures are recorded on the task itself; `notify` is
    /// invoked after every per-item progress update. The returned outcome
    /// tells the worker which terminal status to apply.
    pub async fn execute(&self, task: &Task, notify: &(dyn Fn() + Send + Sync)) -> TaskOutcome {
        let request = task.request();

        for source in &request.sources {
            if task.is_cancel_requested() {
                info!("Task {} cancelled before '{}'", task.id(), source.display());
                return TaskOutcome::Cancelled;
            }

            task.begin_item(source);
            notify();

            match self.transfer_path(task, source, &request.dest_dir).await {
                Ok(()) => {
                    task.complete_item();
                    notify();
                }
                Err(failure) if failure.error.is_cancelled() => {
                    info!("Task {} cancelled at '{}'", task.id(), failure.path.display());
                    return TaskOutcome::Cancelled;
                }
                Err(failure) => {
                    warn!(
                        "Task {} failed at '{}': {}",
                        task.id(),
                        failure.path.display(),
                        failure.error
                    );
                    task.record_failure(FailureRecord {
                        source: source.clone(),
                        path: failure.path,
                        error: failure.error.to_string(),
                    });
                    return TaskOutcome::Failed;
                }
            }
        }

        TaskOutcome::Completed
    }

    /// Transfer one path into `dest_dir`, recursing into directories
    ///
    /// The destination for every level is `dest_dir` joined with the
    /// source's own base name.
    fn transfer_path<'a>(
        &'a self,
        task: &'a Task,
        source: &'a Path,
        dest_dir: &'a Path,
    ) -> Pin<Box<dyn Future<Output = TransferResult> + Send + 'a>> {
        Box::pin(async move {
            if task.is_cancel_requested() {
                return Err(TransferFailure::new(source, Error::Cancelled));
            }

            let metadata = tokio::fs::symlink_metadata(source)
                .await
                .map_err(|e| TransferFailure::new(source, Error::io_at("read metadata for", source, e)))?;

            let file_name = source.file_name().ok_or_else(|| {
                TransferFailure::new(
                    source,
                    Error::other(format!("Source '{}' has no base name", source.display())),
                )
            })?;
            let dest = dest_dir.join(file_name);
            let remove_source = task.request().kind.removes_source();

            if metadata.file_type().is_symlink() {
                transfer_symlink(source, &dest, remove_source)
                    .await
                    .map_err(|e| TransferFailure::new(source, e))?;
            } else if metadata.is_dir() {
                self.transfer_dir(task, source, &metadata, &dest, remove_source)
                    .await?;
            } else {
                copy_file_atomic(source, &dest, self.config.buffer_size, task.cancel_token())
                    .await
                    .map_err(|e| TransferFailure::new(source, e))?;
                if remove_source {
                    tokio::fs::remove_file(source).await.map_err(|e| {
                        TransferFailure::new(source, Error::io_at("remove source file", source, e))
                    })?;
                }
            }

            Ok(())
        })
    }

    async fn transfer_dir(
        &self,
        task: &Task,
        source: &Path,
        metadata: &std::fs::Metadata,
        dest: &Path,
        remove_source: bool,
    ) -> TransferResult {
        match tokio::fs::create_dir(dest).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("Destination directory '{}' already exists", dest.display());
            }
            Err(e) => {
                return Err(TransferFailure::new(
                    source,
                    Error::io_at("create directory", dest, e),
                ));
            }
        }
        inherit_permissions(metadata, dest).await;

        let mut entries = tokio::fs::read_dir(source)
            .await
            .map_err(|e| TransferFailure::new(source, Error::io_at("read directory", source, e)))?;

        loop {
            let entry = entries.next_entry().await.map_err(|e| {
                TransferFailure::new(source, Error::io_at("read directory entry in", source, e))
            })?;
            let Some(entry) = entry else { break };

            if task.is_cancel_requested() {
                return Err(TransferFailure::new(source, Error::Cancelled));
            }

            let child = entry.path();
            self.transfer_path(task, &child, dest).await?;
        }

        if remove_source {
            tokio::fs::remove_dir(source).await.map_err(|e| {
                TransferFailure::new(source, Error::io_at("remove source directory", source, e))
            })?;
        }

        Ok(())
    }
}

impl Default for TransferExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}
