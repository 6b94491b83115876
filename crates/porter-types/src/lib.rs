//! Core type system and error handling for porter
//!
//! This crate provides the foundational types shared by the porter engine
//! and its I/O layer:
//!
//! - **Error handling**: a structured error type distinguishing fatal I/O
//!   failures from cooperative cancellation
//! - **Core types**: transfer operation kinds and failure records
//! - **Cancellation**: the one-shot token polled by long-running transfers
//!
//! # Features
//!
//! - `serde`: enable serialization support for UI-facing types
//!
//! # Examples
//!
//! ```rust
//! use porter_types::{CancelToken, Error, Result};
//!
//! fn example_operation(cancel: &CancelToken) -> Result<()> {
//!     if cancel.is_cancelled() {
//!         return Err(Error::Cancelled);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use result::Result;
pub use types::{CancelToken, FailureRecord, OperationKind};
