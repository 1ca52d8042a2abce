//! # Host Scheduler
//!
//! The region tracker and the jail warden depend on four scheduling primitives:
//! repeating main-thread tasks, delayed main-thread tasks, tasks that run off
//! the main thread, and hand-off back onto the main thread. [`Scheduler`] is
//! that contract; [`TickScheduler`] is the bundled implementation.
//!
//! ## Main Thread Model
//!
//! The "main thread" is whoever calls [`TickScheduler::tick`]. Each call
//! advances the tick counter by one and runs every due main-thread task inline,
//! in the order they were scheduled. Async tasks are handed to the blocking
//! pool of a tokio runtime, so they never run on the ticking thread.
//!
//! Every task runs under `catch_unwind`: a panicking task is logged and the
//! next task still runs.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A task that runs once.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A task that runs every period until cancelled.
pub type RepeatingTask = Box<dyn FnMut() + Send + 'static>;

// ============================================================================
// Scheduler Contract
// ============================================================================

/// Scheduling primitives provided by the host.
///
/// Delays and periods are expressed in main-thread ticks.
pub trait Scheduler: Send + Sync {
    /// Runs `task` on the main thread every `period_ticks`, starting after `delay_ticks`.
    fn run_repeating(&self, delay_ticks: u64, period_ticks: u64, task: RepeatingTask) -> TaskHandle;

    /// Runs `task` once on the main thread after `delay_ticks`.
    fn run_later(&self, delay_ticks: u64, task: Task);

    /// Runs `task` once off the main thread after `delay_ticks`.
    fn run_async_later(&self, delay_ticks: u64, task: Task);

    /// Runs `task` on the main thread at the next opportunity.
    fn run_on_main(&self, task: Task) {
        self.run_later(0, task)
    }

    /// Runs `task` off the main thread at the next opportunity.
    fn run_async(&self, task: Task) {
        self.run_async_later(0, task)
    }
}

/// Handle to a repeating task.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the task. A run already in progress completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

// ============================================================================
// Tick Scheduler
// ============================================================================

enum Work {
    Main(Task),
    Async(Task),
}

struct Scheduled {
    due: u64,
    seq: u64,
    work: Work,
}

struct Repeating {
    next_due: u64,
    period: u64,
    handle: TaskHandle,
    task: RepeatingTask,
}

/// Tick-driven [`Scheduler`] backed by a tokio runtime for async work.
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::scheduler::{Scheduler, TickScheduler};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let scheduler = TickScheduler::new(tokio::runtime::Handle::current());
/// let runs = Arc::new(AtomicUsize::new(0));
/// let counter = runs.clone();
/// scheduler.run_later(2, Box::new(move || { counter.fetch_add(1, Ordering::SeqCst); }));
///
/// scheduler.tick();
/// assert_eq!(runs.load(Ordering::SeqCst), 0);
/// scheduler.tick();
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
/// # }
/// ```
pub struct TickScheduler {
    runtime: Handle,
    current_tick: AtomicU64,
    next_seq: AtomicU64,
    queue: Mutex<Vec<Scheduled>>,
    repeating: Mutex<Vec<Repeating>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl TickScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            current_tick: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            queue: Mutex::new(Vec::new()),
            repeating: Mutex::new(Vec::new()),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick.load(Ordering::Acquire)
    }

    /// Advances one tick and runs everything that became due.
    ///
    /// Must only be called from the thread acting as the main thread.
    pub fn tick(&self) {
        let now = self.current_tick.fetch_add(1, Ordering::AcqRel) + 1;

        for scheduled in self.take_due(now) {
            match scheduled.work {
                Work::Main(task) => run_guarded("main", task),
                Work::Async(task) => self.spawn_async(task),
            }
        }

        self.run_repeating_due(now);

        lock(&self.in_flight).retain(|handle| !handle.is_finished());
    }

    /// Advances `count` ticks.
    pub fn tick_n(&self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// Waits until every async task spawned so far, and every async task those
    /// tasks spawned, has finished.
    pub async fn wait_async(&self) {
        loop {
            let handles = std::mem::take(&mut *lock(&self.in_flight));
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    error!("❌ Async task failed to join: {e}");
                }
            }
        }
    }

    /// Number of main-thread and async tasks waiting for their tick.
    pub fn pending_tasks(&self) -> usize {
        lock(&self.queue).len()
    }

    fn take_due(&self, now: u64) -> Vec<Scheduled> {
        let mut queue = lock(&self.queue);
        let (mut due, rest): (Vec<_>, Vec<_>) = queue.drain(..).partition(|s| s.due <= now);
        *queue = rest;
        drop(queue);

        due.sort_by_key(|s| s.seq);
        due
    }

    fn run_repeating_due(&self, now: u64) {
        // Tasks run outside the lock so they can schedule more work.
        let mut tasks = std::mem::take(&mut *lock(&self.repeating));

        for entry in tasks.iter_mut() {
            if entry.handle.is_cancelled() || entry.next_due > now {
                continue;
            }
            entry.next_due = now + entry.period;
            let task = &mut entry.task;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task())) {
                error!("❌ Repeating task panicked: {}", panic_message(&payload));
            }
        }

        tasks.retain(|entry| !entry.handle.is_cancelled());

        let mut repeating = lock(&self.repeating);
        tasks.append(&mut repeating);
        *repeating = tasks;
    }

    fn spawn_async(&self, task: Task) {
        let handle = self.runtime.spawn_blocking(move || run_guarded("async", task));
        lock(&self.in_flight).push(handle);
    }

    fn enqueue(&self, delay_ticks: u64, work: Work) {
        let scheduled = Scheduled {
            due: self.current_tick() + delay_ticks,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            work,
        };
        lock(&self.queue).push(scheduled);
    }
}

impl Scheduler for TickScheduler {
    fn run_repeating(&self, delay_ticks: u64, period_ticks: u64, task: RepeatingTask) -> TaskHandle {
        let handle = TaskHandle::new();
        lock(&self.repeating).push(Repeating {
            next_due: self.current_tick() + delay_ticks,
            period: period_ticks.max(1),
            handle: handle.clone(),
            task,
        });
        debug!("Registered repeating task every {} ticks", period_ticks.max(1));
        handle
    }

    fn run_later(&self, delay_ticks: u64, task: Task) {
        self.enqueue(delay_ticks, Work::Main(task));
    }

    fn run_async_later(&self, delay_ticks: u64, task: Task) {
        if delay_ticks == 0 {
            self.spawn_async(task);
        } else {
            self.enqueue(delay_ticks, Work::Async(task));
        }
    }
}

impl std::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickScheduler")
            .field("current_tick", &self.current_tick())
            .field("pending", &self.pending_tasks())
            .finish()
    }
}

fn run_guarded(kind: &str, task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        error!("❌ Scheduled {} task panicked: {}", kind, panic_message(&payload));
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Locks a scheduler queue, recovering from poisoning since tasks never run
/// while a queue lock is held.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
