//! Status returned from each monitor tick, and the coarse monitor state.

use crate::error::GuardError;

/// Outcome of a single `PresenceMonitor::tick`.
#[derive(Debug, Clone, PartialEq)]
pub enum TickStatus {
    /// Session is locked; nothing was read.
    Idle,
    /// No usable reading this tick (no echo, out of tolerance, garbled line).
    Skipped,
    /// Reading accepted; the user is (still) considered present.
    Watching {
        range_cm: i32,
        culled_cm: f64,
        stddev: f64,
    },
    /// Absence detected but a badge suppressed the lock.
    Vetoed { vetoes: u32 },
    /// Absence detected but the OS refused to lock; retried on a later tick.
    LockFailed,
    /// Session locked by the monitor.
    Locked,
    /// Device channel closed; safety lock attempted, monitor is finished.
    Aborted(GuardError),
}

impl TickStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TickStatus::Aborted(_))
    }
}

/// Coarse lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Built but never ticked.
    Idle,
    /// Unlocked and reading the rangefinder.
    Polling,
    /// Session locked; waiting for an unlock notification.
    Locked,
    /// Terminal: the device link is gone.
    Aborted,
}
