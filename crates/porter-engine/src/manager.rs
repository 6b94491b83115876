//! Task manager: pending queue, worker, history, and subscriber fan-out
//!
//! The manager owns all queue-level state behind one short-critical-section
//! lock, never held across I/O or callbacks. Exactly one worker services the
//! queue, so tasks execute in strict FIFO enqueue order without overlapping.

use crate::executor::{ExecutorConfig, TaskOutcome, TransferExecutor};
use crate::task::{Task, TaskId, TaskSnapshot, TransferRequest};
use once_cell::sync::OnceCell;
use porter_types::{Error, OperationKind, Result};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::Notify;
use tracing::{debug, info};

/// Configuration for the task manager
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Maximum number of terminal tasks retained in history
    pub history_capacity: usize,
    /// Maximum number of pending tasks accepted into the queue
    pub max_queue_size: usize,
    /// Executor configuration
    pub executor: ExecutorConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            max_queue_size: 1000,
            executor: ExecutorConfig::default(),
        }
    }
}

/// Zero-argument callback invoked after every state transition
///
/// Delivery is best-effort and synchronous; callbacks must not block and
/// must not assume a specific calling thread. They may re-enter the manager,
/// since no manager lock is held during delivery.
pub type Subscriber = Arc<dyn Fn() + Send + Sync + 'static>;

#[derive(Debug, Default)]
struct ManagerState {
    queue: VecDeque<Arc<Task>>,
    current: Option<Arc<Task>>,
    history: VecDeque<Arc<Task>>,
    next_id: u64,
}

struct ManagerShared {
    config: ManagerConfig,
    state: Mutex<ManagerState>,
    subscribers: RwLock<Vec<Subscriber>>,
    queue_wake: Notify,
    shutdown: AtomicBool,
}

impl ManagerShared {
    fn state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy the subscriber list, then invoke outside any lock
    fn notify_subscribers(&self) {
        let subscribers: Vec<Subscriber> = {
            let registered = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            registered.clone()
        };
        for subscriber in subscribers {
            subscriber();
        }
    }

    fn push_history(state: &mut ManagerState, capacity: usize, task: Arc<Task>) {
        state.history.push_back(task);
        while state.history.len() > capacity {
            state.history.pop_front();
        }
    }
}

/// Process-wide transfer queue driving the single background worker
///
/// Cloning is cheap and every clone refers to the same queue. The
/// caller-facing API is synchronous and non-blocking; all filesystem work
/// happens on the worker.
#[derive(Clone)]
pub struct TaskManager {
    shared: Arc<ManagerShared>,
    worker: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl TaskManager {
    /// Create a new manager and spawn its worker
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ManagerConfig) -> Self {
        let executor = TransferExecutor::new(config.executor.clone());
        let shared = Arc::new(ManagerShared {
            config,
            state: Mutex::new(ManagerState::default()),
            subscribers: RwLock::new(Vec::new()),
            queue_wake: Notify::new(),
            shutdown: AtomicBool::new(false),
        });

        let worker = tokio::spawn(worker_loop(Arc::clone(&shared), executor));
        info!("Task manager initialized");

        Self {
            shared,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// The process-wide manager, constructed lazily on first use
    ///
    /// The first call must happen from within a Tokio runtime. Prefer
    /// passing a [`TaskManager`] into consumers explicitly; this accessor
    /// exists for UI layers that share one queue across all windows.
    pub fn global() -> &'static TaskManager {
        static GLOBAL: OnceCell<TaskManager> = OnceCell::new();
        GLOBAL.get_or_init(|| TaskManager::new(ManagerConfig::default()))
    }

    /// Enqueue a copy of `sources` into `dest_dir`
    pub fn enqueue_copy<P: Into<PathBuf>>(
        &self,
        sources: Vec<PathBuf>,
        dest_dir: P,
    ) -> Result<TaskId> {
        self.enqueue(TransferRequest::new(OperationKind::Copy, sources, dest_dir))
    }

    /// Enqueue a move of `sources` into `dest_dir`
    pub fn enqueue_move<P: Into<PathBuf>>(
        &self,
        sources: Vec<PathBuf>,
        dest_dir: P,
    ) -> Result<TaskId> {
        self.enqueue(TransferRequest::new(OperationKind::Move, sources, dest_dir))
    }

    /// Enqueue a transfer request
    ///
    /// Paths are not validated here; a nonexistent source surfaces later as
    /// a task failure, not an enqueue error.
    pub fn enqueue(&self, request: TransferRequest) -> Result<TaskId> {
        let task = {
            let mut state = self.shared.state();
            if state.queue.len() >= self.shared.config.max_queue_size {
                return Err(Error::QueueFull);
            }
            state.next_id += 1;
            let task = Arc::new(Task::new(TaskId::new(state.next_id), request));
            state.queue.push_back(Arc::clone(&task));
            task
        };

        debug!(
            "Task {} enqueued ({} {} items)",
            task.id(),
            task.request().kind,
            task.request().sources.len()
        );
        self.shared.queue_wake.notify_one();
        self.shared.notify_subscribers();
        Ok(task.id())
    }

    /// Cancel a task by id
    ///
    /// A pending task is removed from the queue and moved to history as
    /// Cancelled, entirely on the calling thread. For the running task only
    /// the cancellation signal is raised; the terminal transition happens
    /// inside the worker at its next checkpoint. Cancelling an
    /// already-terminal task is a no-op, not an error.
    pub fn cancel(&self, id: TaskId) -> Result<()> {
        enum Hit {
            Running(Arc<Task>),
            Pending,
            Terminal,
            Miss,
        }

        let hit = {
            let mut state = self.shared.state();
            if let Some(current) = state.current.as_ref().filter(|t| t.id() == id) {
                Hit::Running(Arc::clone(current))
            } else if let Some(position) = state.queue.iter().position(|t| t.id() == id) {
                if let Some(task) = state.queue.remove(position) {
                    task.mark_cancelled();
                    ManagerShared::push_history(
                        &mut state,
                        self.shared.config.history_capacity,
                        task,
                    );
                }
                Hit::Pending
            } else if state.history.iter().any(|t| t.id() == id) {
                Hit::Terminal
            } else {
                Hit::Miss
            }
        };

        match hit {
            Hit::Running(task) => {
                debug!("Cancellation requested for running task {}", id);
                task.request_cancel();
                Ok(())
            }
            Hit::Pending => {
                debug!("Pending task {} cancelled", id);
                self.shared.notify_subscribers();
                Ok(())
            }
            Hit::Terminal => Ok(()),
            Hit::Miss => Err(Error::TaskNotFound { id: id.as_u64() }),
        }
    }

    /// Snapshot every known task, in display order
    ///
    /// Current task first (if any), then pending tasks in queue order, then
    /// history most-recently-completed first. Snapshots are taken after the
    /// manager lock is released, so they never contend with the worker.
    pub fn list(&self) -> Vec<TaskSnapshot> {
        let tasks: Vec<Arc<Task>> = {
            let state = self.shared.state();
            state
                .current
                .iter()
                .chain(state.queue.iter())
                .chain(state.history.iter().rev())
                .cloned()
                .collect()
        };
        tasks.iter().map(|task| task.snapshot()).collect()
    }

    /// Register a callback invoked after every state transition
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    /// Request worker shutdown
    ///
    /// The worker observes the request when it would next wait for work; a
    /// transfer already in flight runs to its own conclusion.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.queue_wake.notify_one();
    }

    /// Wait for the worker to terminate after [`shutdown`](Self::shutdown)
    pub async fn join(&self) {
        let handle = {
            let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            worker.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state();
        f.debug_struct("TaskManager")
            .field("pending", &state.queue.len())
            .field("current", &state.current.as_ref().map(|t| t.id()))
            .field("history", &state.history.len())
            .finish()
    }
}

/// The single worker loop: pop, execute, retire, repeat
async fn worker_loop(shared: Arc<ManagerShared>, executor: TransferExecutor) {
    info!("Transfer worker started");

    loop {
        let task = {
            let mut state = shared.state();
            let task = state.queue.pop_front();
            if let Some(task) = &task {
                state.current = Some(Arc::clone(task));
            }
            task
        };

        let Some(task) = task else {
            if shared.shutdown.load(Ordering::Acquire) {
                break;
            }
            shared.queue_wake.notified().await;
            continue;
        };

        run_task(&shared, &executor, task).await;
    }

    info!("Transfer worker stopped");
}

async fn run_task(shared: &Arc<ManagerShared>, executor: &TransferExecutor, task: Arc<Task>) {
    task.mark_started();
    info!(
        "Task {} started: {} {} item(s) -> '{}'",
        task.id(),
        task.request().kind,
        task.request().sources.len(),
        task.request().dest_dir.display()
    );
    shared.notify_subscribers();

    let notify_shared = Arc::clone(shared);
    let notify = move || notify_shared.notify_subscribers();
    let outcome = executor.execute(&task, &notify).await;

    match outcome {
        TaskOutcome::Completed => task.mark_completed(),
        TaskOutcome::Failed => task.mark_failed(),
        TaskOutcome::Cancelled => task.mark_cancelled(),
    }

    {
        let mut state = shared.state();
        state.current = None;
        ManagerShared::push_history(&mut state, shared.config.history_capacity, task.clone());
    }

    info!("Task {} finished: {:?}", task.id(), outcome);
    shared.notify_subscribers();
}
