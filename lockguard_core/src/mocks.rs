//! Test and helper mocks for lockguard_core.
//!
//! Every mock records what the monitor did to it behind an `Arc`, so a clone
//! kept by the test observes the copy moved into the monitor.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lockguard_traits::{BadgeReader, Rangefinder, SessionControl, Tone};

/// One scripted answer of `ScriptedRangefinder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    Cm(i32),
    /// A garbled line.
    Garbled,
    /// The port went away.
    Closed,
}

#[derive(Debug, Default)]
struct RangefinderLog {
    script: VecDeque<Reading>,
    tones: Vec<Tone>,
    payloads: Vec<String>,
    reads: usize,
}

/// Rangefinder replaying a script; once exhausted it repeats the last entry.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRangefinder {
    log: Arc<Mutex<RangefinderLog>>,
}

impl ScriptedRangefinder {
    pub fn new(script: impl IntoIterator<Item = Reading>) -> Self {
        let log = RangefinderLog {
            script: script.into_iter().collect(),
            ..RangefinderLog::default()
        };
        Self {
            log: Arc::new(Mutex::new(log)),
        }
    }

    /// Script of plain distances.
    pub fn ranges(cms: impl IntoIterator<Item = i32>) -> Self {
        Self::new(cms.into_iter().map(Reading::Cm))
    }

    pub fn push(&self, reading: Reading) {
        if let Ok(mut log) = self.log.lock() {
            log.script.push_back(reading);
        }
    }

    pub fn tones(&self) -> Vec<Tone> {
        self.log.lock().map(|l| l.tones.clone()).unwrap_or_default()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.log.lock().map(|l| l.payloads.clone()).unwrap_or_default()
    }

    pub fn reads(&self) -> usize {
        self.log.lock().map(|l| l.reads).unwrap_or_default()
    }
}

impl Rangefinder for ScriptedRangefinder {
    fn read_range(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| std::io::Error::other("mock poisoned"))?;
        log.reads += 1;
        let next = if log.script.len() > 1 {
            log.script.pop_front()
        } else {
            log.script.front().copied()
        };
        match next {
            Some(Reading::Cm(cm)) => Ok(cm),
            Some(Reading::Garbled) => Err("malformed device response: R0?x".into()),
            Some(Reading::Closed) => Err(Box::new(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            ))),
            None => Ok(-1),
        }
    }

    fn write_configuration(&mut self, payload: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.payloads.push(payload.to_string());
        }
    }

    fn play_tone(&mut self, tone: Tone) {
        if let Ok(mut log) = self.log.lock() {
            log.tones.push(tone);
        }
    }
}

/// Badge reader whose answer can be flipped from the test.
#[derive(Debug, Clone, Default)]
pub struct SwitchBadge {
    present: Arc<AtomicBool>,
    queries: Arc<AtomicUsize>,
}

impl SwitchBadge {
    pub fn new(present: bool) -> Self {
        let b = Self::default();
        b.set(present);
        b
    }

    pub fn set(&self, present: bool) {
        self.present.store(present, Ordering::Relaxed);
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

impl BadgeReader for SwitchBadge {
    fn has_badge(&mut self) -> bool {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.present.load(Ordering::Relaxed)
    }
}

/// Session control that records lock requests and can be told to refuse.
#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    locks: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }

    /// Lock requests seen, successful or not.
    pub fn lock_calls(&self) -> usize {
        self.locks.load(Ordering::Relaxed)
    }
}

impl SessionControl for RecordingSession {
    fn lock_session(&mut self) -> bool {
        self.locks.fetch_add(1, Ordering::Relaxed);
        !self.refuse.load(Ordering::Relaxed)
    }
}
