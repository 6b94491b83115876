//! Shared data types for porter
//!
//! The types in this module cross crate boundaries: the engine records
//! failures and operation kinds, while the I/O layer polls the cancellation
//! token at chunk boundaries.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Kind of transfer requested for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperationKind {
    /// Copy sources into the destination directory
    Copy,
    /// Move sources into the destination directory
    Move,
}

impl OperationKind {
    /// Whether the source object is removed after a successful transfer
    pub fn removes_source(self) -> bool {
        matches!(self, Self::Move)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy => write!(f, "copy"),
            Self::Move => write!(f, "move"),
        }
    }
}

/// A single fatal failure recorded against a task
///
/// `path` may be a descendant of `source` when the failure happened deep in
/// a directory tree. Processing stops at the first fatal error, so a task
/// usually carries zero or one record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailureRecord {
    /// Top-level source path the task was processing
    pub source: PathBuf,
    /// Specific path that failed
    pub path: PathBuf,
    /// Formatted error text
    pub error: String,
}

/// One-shot cooperative cancellation signal
///
/// Raising the token is idempotent and never blocks. Workers poll it at safe
/// checkpoints; it does not preempt an in-flight write.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    /// Create a new, unraised token
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the cancellation signal
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
