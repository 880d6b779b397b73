//! Events surfaced to collaborators (tray, console, logs) and their fan-out.

use crossbeam_channel as xch;

/// Observable monitor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardEvent {
    /// A reading was accepted into the window (cm).
    RangeRead(i32),
    Locked,
    Unlocked,
    /// The device channel closed; the monitor stopped after a safety lock.
    Abort,
}

/// Unbounded fan-out to any number of subscribers.
///
/// Subscribers whose receiver has been dropped are pruned on the next emit.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    subscribers: Vec<xch::Sender<GuardEvent>>,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self) -> xch::Receiver<GuardEvent> {
        let (tx, rx) = xch::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn emit(&mut self, event: GuardEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }
}
