//! Error types for porter operations
//!
//! Every fatal transfer error carries enough context to be shown to a user
//! verbatim: the offending path is formatted into the message at the point
//! where the underlying I/O error is observed.

use std::path::PathBuf;

/// Main error type for porter operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found
        path: PathBuf,
    },

    /// Permission denied
    #[error("Permission denied: {path}")]
    PermissionDenied {
        /// Path to the file with permission issues
        path: PathBuf,
    },

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// No task with the given id is known to the manager
    #[error("Task {id} not found")]
    TaskNotFound {
        /// Identifier that failed to resolve
        id: u64,
    },

    /// The pending queue has reached its configured capacity
    #[error("Task queue is full")]
    QueueFull,

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Path resolution and I/O errors, fatal to the running task
    Io,
    /// Cooperative cancellation, not an I/O failure
    Cancelled,
    /// Queue and task-lookup errors from the manager API
    Queue,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::FileNotFound { .. } | Self::PermissionDenied { .. } => {
                ErrorKind::Io
            }
            Self::Cancelled => ErrorKind::Cancelled,
            Self::TaskNotFound { .. } | Self::QueueFull => ErrorKind::Queue,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Check whether this error is the cooperative cancellation signal
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Create a new I/O error for an operation on `path`
    pub fn io_at(operation: &str, path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Self::Io {
                message: format!("Failed to {} '{}': {}", operation, path.display(), error),
            },
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
