//! Integration test suite for porter
//!
//! End-to-end scenarios live in `tests/integration_tests.rs`; this crate
//! only carries the shared helpers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod test_utils;
