//! Atomic, cancelable filesystem primitives for porter
//!
//! This crate provides the single-path operations the transfer executor is
//! built from:
//!
//! - **Atomic file copy**: stream through a fixed-size buffer into a sibling
//!   partial file, then rename into place
//! - **Symlink transfer**: recreate links without dereferencing them
//! - **Metadata preservation**: permission bits and file times
//!
//! All operations poll a [`CancelToken`](porter_types::CancelToken) at safe
//! checkpoints and format the offending path into every error.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod copy;
pub mod link;
pub mod metadata;

pub use copy::{copy_file_atomic, partial_path, PARTIAL_SUFFIX};
pub use link::transfer_symlink;
pub use metadata::{inherit_permissions, preserve_metadata};
