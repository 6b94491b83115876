//! Result type alias for porter operations

use crate::Error;

/// Result type alias for porter operations
pub type Result<T> = std::result::Result<T, Error>;
