#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Device-facing side of the workstation guard: the rangefinder's serial line
//! protocol, smart-card probing and the OS session lock.
//!
//! Real backends are feature gated (`serial`, `smartcard`, or both via
//! `hardware`); the simulated devices below are always available.
pub mod badge;
pub mod error;
pub mod link;
pub mod protocol;
#[cfg(feature = "serial")]
pub mod serial;
pub mod session;
pub mod transport;

pub use badge::{NoBadge, is_virtual_reader};
pub use error::LinkError;
pub use link::{DeviceLink, discover};
pub use session::{SessionWatcher, SystemSession};
pub use transport::{LinkSettings, PortProvider, SerialIo};

use lockguard_traits::{BadgeReader, Rangefinder, SessionControl, Tone};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Simulated rangefinder replaying a scripted distance sequence.
///
/// The script repeats once exhausted. With `close_after`, the n-th read and
/// every later one fail as if the USB cable had been pulled.
#[derive(Debug, Clone)]
pub struct SimulatedRangefinder {
    script: Vec<i32>,
    reads: usize,
    close_after: Option<usize>,
}

impl SimulatedRangefinder {
    pub fn new(script: Vec<i32>) -> Self {
        SimulatedRangefinder {
            script,
            reads: 0,
            close_after: None,
        }
    }

    pub fn close_after(mut self, reads: usize) -> Self {
        self.close_after = Some(reads);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl Rangefinder for SimulatedRangefinder {
    fn read_range(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        if self.close_after.is_some_and(|n| self.reads >= n) {
            return Err(Box::new(LinkError::PortClosed));
        }
        let value = if self.script.is_empty() {
            protocol::NO_READING
        } else {
            self.script[self.reads % self.script.len()]
        };
        self.reads += 1;
        tracing::trace!(range_cm = value, "simulated range");
        Ok(value)
    }

    fn write_configuration(&mut self, payload: &str) {
        tracing::debug!(payload, "simulated configuration write");
    }

    fn play_tone(&mut self, tone: Tone) {
        tracing::debug!(?tone, "simulated tone");
    }
}

/// Simulated badge reader with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedBadge(pub bool);

impl BadgeReader for SimulatedBadge {
    fn has_badge(&mut self) -> bool {
        self.0
    }
}

/// Simulated session that accepts every lock request and counts them.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSession {
    locks: Arc<AtomicUsize>,
}

impl SimulatedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lock requests seen by this session and its clones.
    pub fn lock_count(&self) -> usize {
        self.locks.load(Ordering::Relaxed)
    }
}

impl SessionControl for SimulatedSession {
    fn lock_session(&mut self) -> bool {
        self.locks.fetch_add(1, Ordering::Relaxed);
        tracing::info!("session locked (simulated)");
        true
    }
}
