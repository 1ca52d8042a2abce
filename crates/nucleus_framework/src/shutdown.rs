//! Shutdown coordination between the tick loop and the framework services.
//!
//! Once stopping, no new commands are dispatched and no new samples are fed to
//! the region tracker. Stopped means the watcher and warden are cancelled and
//! the tick loop may exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared, cloneable shutdown flags.
#[derive(Debug, Clone, Default)]
pub struct ShutdownState {
    stopping: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Returns `false` if shutdown had already begun.
    pub fn begin(&self) -> bool {
        let first = !self.stopping.swap(true, Ordering::AcqRel);
        if first {
            info!("🛑 Shutdown initiated, commands and samples are no longer accepted");
        }
        first
    }

    pub fn complete(&self) {
        self.stopping.store(true, Ordering::Release);
        self.stopped.store(true, Ordering::Release);
        info!("✅ Framework services stopped");
    }
}
