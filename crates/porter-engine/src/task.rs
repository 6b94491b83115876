//! Task model: requests, run-time state, and snapshots

use porter_types::{CancelToken, FailureRecord, OperationKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// Unique identifier for a task
///
/// Ids are allocated from the manager's monotonic counter, so a higher id
/// always means a later enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskStatus {
    /// Task is waiting in the queue
    Pending,
    /// Task is being executed by the worker
    Running,
    /// Task completed successfully
    Completed,
    /// Task failed with a fatal error
    Failed,
    /// Task was cancelled
    Cancelled,
}

impl TaskStatus {
    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Transfer request containing the immutable parameters of a task
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransferRequest {
    /// Kind of transfer
    pub kind: OperationKind,
    /// Ordered absolute source paths
    pub sources: Vec<PathBuf>,
    /// Destination directory all sources are transferred into
    pub dest_dir: PathBuf,
}

impl TransferRequest {
    /// Create a new transfer request
    pub fn new<P: Into<PathBuf>>(kind: OperationKind, sources: Vec<PathBuf>, dest_dir: P) -> Self {
        Self {
            kind,
            sources,
            dest_dir: dest_dir.into(),
        }
    }
}

/// Mutable run-time state, guarded by the task's own lock
#[derive(Debug)]
struct TaskState {
    status: TaskStatus,
    total_items: u64,
    done_items: u64,
    current_source: Option<PathBuf>,
    message: String,
    error: Option<String>,
    failures: Vec<FailureRecord>,
    enqueued_at: SystemTime,
    started_at: Option<SystemTime>,
    completed_at: Option<SystemTime>,
}

/// A queued copy-or-move request plus its run-time state
///
/// The immutable request and the cancellation token are freely shared; all
/// mutable fields sit behind a per-task lock so readers can snapshot safely
/// while the worker makes progress. Status transitions are monotonic along
/// Pending → Running → {Completed | Failed | Cancelled}, and a terminal
/// status is never left.
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    request: TransferRequest,
    cancel: CancelToken,
    state: Mutex<TaskState>,
}

impl Task {
    /// Create a new pending task
    pub(crate) fn new(id: TaskId, request: TransferRequest) -> Self {
        let total_items = request.sources.len() as u64;
        Self {
            id,
            request,
            cancel: CancelToken::new(),
            state: Mutex::new(TaskState {
                status: TaskStatus::Pending,
                total_items,
                done_items: 0,
                current_source: None,
                message: "queued".to_string(),
                error: None,
                failures: Vec::new(),
                enqueued_at: SystemTime::now(),
                started_at: None,
                completed_at: None,
            }),
        }
    }

    /// Task identifier
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The immutable transfer request
    pub fn request(&self) -> &TransferRequest {
        &self.request
    }

    /// Raise the one-shot cancellation signal
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// Check whether cancellation has been requested
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The cancellation token, for I/O layers that poll it directly
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the task as started
    pub(crate) fn mark_started(&self) {
        let mut state = self.state();
        if state.status == TaskStatus::Pending {
            state.status = TaskStatus::Running;
            state.started_at = Some(SystemTime::now());
            state.message = "starting".to_string();
        }
    }

    /// Record the top-level source the worker is about to process
    pub(crate) fn begin_item(&self, source: &Path) {
        let mut state = self.state();
        state.current_source = Some(source.to_path_buf());
        state.message = format!("processing '{}'", source.display());
    }

    /// Count one top-level source as done
    pub(crate) fn complete_item(&self) {
        let mut state = self.state();
        if state.done_items < state.total_items {
            state.done_items += 1;
        }
    }

    /// Record a fatal failure against this task
    pub(crate) fn record_failure(&self, failure: FailureRecord) {
        let mut state = self.state();
        state.error = Some(failure.error.clone());
        state.failures.push(failure);
    }

    /// Mark the task as completed
    pub(crate) fn mark_completed(&self) {
        self.finish(TaskStatus::Completed, "completed");
    }

    /// Mark the task as failed; the error text was recorded with the failure
    pub(crate) fn mark_failed(&self) {
        self.finish(TaskStatus::Failed, "failed");
    }

    /// Mark the task as cancelled
    pub(crate) fn mark_cancelled(&self) {
        self.finish(TaskStatus::Cancelled, "cancelled");
    }

    fn finish(&self, status: TaskStatus, message: &str) {
        let mut state = self.state();
        if !state.status.is_terminal() {
            state.status = status;
            state.completed_at = Some(SystemTime::now());
            state.message = message.to_string();
        }
    }

    /// Take a fully-copied snapshot of the observable state
    pub fn snapshot(&self) -> TaskSnapshot {
        let state = self.state();
        TaskSnapshot {
            id: self.id,
            kind: self.request.kind,
            sources: self.request.sources.clone(),
            dest_dir: self.request.dest_dir.clone(),
            status: state.status,
            total_items: state.total_items,
            done_items: state.done_items,
            current_source: state.current_source.clone(),
            message: state.message.clone(),
            error: state.error.clone(),
            failures: state.failures.clone(),
            enqueued_at: state.enqueued_at,
            started_at: state.started_at,
            completed_at: state.completed_at,
        }
    }
}

/// Immutable point-in-time copy of a task's observable state
///
/// This is the only form task state takes across the manager's public
/// boundary; nothing in it aliases the task's own fields.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskSnapshot {
    /// Task identifier
    pub id: TaskId,
    /// Kind of transfer
    pub kind: OperationKind,
    /// Ordered source paths
    pub sources: Vec<PathBuf>,
    /// Destination directory
    pub dest_dir: PathBuf,
    /// Status at snapshot time
    pub status: TaskStatus,
    /// Number of top-level sources, fixed at creation
    pub total_items: u64,
    /// Top-level sources fully transferred so far
    pub done_items: u64,
    /// Source being processed at snapshot time
    pub current_source: Option<PathBuf>,
    /// Human-readable progress message
    pub message: String,
    /// Terminal error text, if the task failed
    pub error: Option<String>,
    /// Recorded failures; processing stops at the first fatal one
    pub failures: Vec<FailureRecord>,
    /// When the task was enqueued
    pub enqueued_at: SystemTime,
    /// When execution began, unset while pending
    pub started_at: Option<SystemTime>,
    /// When the task reached a terminal status
    pub completed_at: Option<SystemTime>,
}

impl TaskSnapshot {
    /// Overall progress in percent, by top-level items
    pub fn progress(&self) -> f64 {
        if self.total_items > 0 {
            (self.done_items as f64 / self.total_items as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_types::OperationKind;

    fn task(sources: usize) -> Task {
        let sources = (0..sources).map(|i| PathBuf::from(format!("/src/{i}"))).collect();
        Task::new(
            TaskId::new(1),
            TransferRequest::new(OperationKind::Copy, sources, "/dst"),
        )
    }

    #[test]
    fn test_task_lifecycle() {
        let task = task(2);
        let snapshot = task.snapshot();
        assert_eq!(snapshot.status, TaskStatus::Pending);
        assert_eq!(snapshot.total_items, 2);
        assert!(snapshot.started_at.is_none());
        assert!(snapshot.completed_at.is_none());

        task.mark_started();
        let snapshot = task.snapshot();
        assert_eq!(snapshot.status, TaskStatus::Running);
        assert!(snapshot.started_at.is_some());

        task.complete_item();
        task.complete_item();
        task.mark_completed();
        let snapshot = task.snapshot();
        assert_eq!(snapshot.status, TaskStatus::Completed);
        assert_eq!(snapshot.done_items, 2);
        assert!(snapshot.completed_at.is_some());
    }

    #[test]
    fn test_terminal_status_is_final() {
        let task = task(1);
        task.mark_started();
        task.mark_completed();
        task.mark_cancelled();
        assert_eq!(task.snapshot().status, TaskStatus::Completed);
    }

    #[test]
    fn test_done_items_never_exceed_total() {
        let task = task(1);
        task.complete_item();
        task.complete_item();
        assert_eq!(task.snapshot().done_items, 1);
    }

    #[test]
    fn test_cancel_signal_is_observable() {
        let task = task(1);
        assert!(!task.is_cancel_requested());
        task.request_cancel();
        task.request_cancel();
        assert!(task.is_cancel_requested());
    }

    #[test]
    fn test_failure_record_sets_error_text() {
        let task = task(1);
        task.record_failure(FailureRecord {
            source: "/src/0".into(),
            path: "/src/0/nested".into(),
            error: "Permission denied: /src/0/nested".to_string(),
        });
        task.mark_failed();
        let snapshot = task.snapshot();
        assert_eq!(snapshot.status, TaskStatus::Failed);
        assert_eq!(snapshot.failures.len(), 1);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Permission denied: /src/0/nested")
        );
    }

    #[test]
    fn test_snapshot_progress() {
        let task = task(4);
        task.complete_item();
        assert!((task.snapshot().progress() - 25.0).abs() < f64::EPSILON);
    }
}
