use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Flag for cooperative cancellation of a pass.
///
/// Passes poll it between items; setting it never interrupts a network call
/// already in flight. Clone is cheap and shares state.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clear a previous request so the flag can be reused for the next run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Process-wide "a monitor pass is running" flag.
///
/// At most one [`MonitorPermit`] exists at a time; acquiring is a single
/// atomic check-and-set and never waits.
#[derive(Debug, Clone, Default)]
pub struct MonitorGate {
    active: Arc<AtomicBool>,
}

impl MonitorGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` if a monitor pass already holds the gate.
    pub fn try_acquire(&self) -> Option<MonitorPermit> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| MonitorPermit { active: Arc::clone(&self.active) })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Held for the whole of a monitor pass. Dropping it (on any exit path,
/// including a panic or the pass stream being dropped) releases the gate.
#[derive(Debug)]
pub struct MonitorPermit {
    active: Arc<AtomicBool>,
}

impl Drop for MonitorPermit {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
