//! Background transfer queue for porter
//!
//! This crate provides the task-execution engine a file-browsing UI hangs
//! its copy/move operations on:
//!
//! - **Task management**: a FIFO queue serviced by exactly one worker
//! - **Progress tracking**: fully-copied snapshots and synchronous
//!   change notifications
//! - **Cooperative cancellation**: a one-shot signal polled at safe
//!   checkpoints, down to copy-chunk boundaries
//! - **Bounded history**: the most recent terminal tasks, oldest evicted
//!
//! # Examples
//!
//! ```rust,no_run
//! use porter_engine::{ManagerConfig, TaskManager};
//!
//! # async fn example() -> porter_types::Result<()> {
//! let manager = TaskManager::new(ManagerConfig::default());
//! let id = manager.enqueue_copy(vec!["/a/src.txt".into()], "/a/dst")?;
//! manager.subscribe(move || {
//!     // re-render the queue view
//! });
//! let tasks = manager.list();
//! println!("{} task(s) known", tasks.len());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod executor;
pub mod manager;
pub mod task;

pub use executor::{ExecutorConfig, TaskOutcome, TransferExecutor};
pub use manager::{ManagerConfig, Subscriber, TaskManager};
pub use task::{Task, TaskId, TaskSnapshot, TaskStatus, TransferRequest};
