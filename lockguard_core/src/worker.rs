//! Background worker running the presence monitor.
//!
//! The worker thread owns the monitor (and through it the device handle) for
//! its whole life. Ticks are paced by the configured interval; the interval
//! wait is the cancellation point and also where queued session changes are
//! applied.
//!
//! Each `MonitorWorker` spawns exactly one thread, which is shut down and
//! joined when the worker is stopped or dropped.
use crossbeam_channel as xch;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::error::{GuardError, Result};
use crate::monitor::PresenceMonitor;
use crate::status::MonitorState;

pub struct MonitorWorker {
    /// Dropping the sender is the stop signal.
    stop_tx: Option<xch::Sender<()>>,
    /// Join handle yielding the monitor back to the caller.
    join_handle: Option<JoinHandle<PresenceMonitor>>,
}

impl MonitorWorker {
    /// Start polling on a dedicated thread.
    ///
    /// An aborted monitor has lost its device link and is refused.
    pub fn spawn(monitor: PresenceMonitor) -> Result<Self> {
        if monitor.state() == MonitorState::Aborted {
            return Err(eyre::Report::new(GuardError::State(
                "monitor aborted; reconnect the device and build a new one".into(),
            )));
        }
        let (stop_tx, stop_rx) = xch::bounded::<()>(1);
        let join_handle = std::thread::Builder::new()
            .name("lockguard-monitor".into())
            .spawn(move || run(monitor, &stop_rx))
            .map_err(|e| eyre::eyre!("spawn monitor thread: {e}"))?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        })
    }

    /// True once the thread has exited on its own (after an abort).
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }

    /// Stop the thread, wait for the in-flight tick, and hand the monitor back.
    pub fn stop(mut self) -> Result<PresenceMonitor> {
        self.stop_tx.take();
        let handle = self
            .join_handle
            .take()
            .ok_or_else(|| eyre::Report::new(GuardError::State("worker already stopped".into())))?;
        handle
            .join()
            .map_err(|_| eyre::Report::new(GuardError::State("monitor thread panicked".into())))
    }
}

fn run(mut monitor: PresenceMonitor, stop_rx: &xch::Receiver<()>) -> PresenceMonitor {
    tracing::info!(
        interval_ms = monitor.config().interval_ms,
        threshold_cm = monitor.config().threshold_cm,
        sample_size = monitor.config().sample_size,
        "presence monitor started"
    );
    loop {
        let status = monitor.tick();
        tracing::trace!(?status, "tick");
        if status.is_terminal() {
            tracing::debug!("monitor aborted; worker exiting");
            break;
        }
        let deadline = Instant::now() + monitor.config().interval();
        if !monitor.wait_until(deadline, stop_rx) {
            tracing::debug!("monitor worker received stop signal");
            break;
        }
    }
    tracing::trace!("monitor worker exiting cleanly");
    monitor
}

impl Drop for MonitorWorker {
    fn drop(&mut self) {
        self.stop_tx.take();
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(_) => {
                    tracing::trace!("monitor worker joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "monitor worker panicked during shutdown");
                }
            }
        }
    }
}
