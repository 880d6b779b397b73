pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Audible feedback the rangefinder can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Lock,
    Unlock,
    Warning,
}

/// Lock-state change reported by the operating system for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Locked,
    Unlocked,
}

/// Distance sensor reachable over a command/response channel.
pub trait Rangefinder {
    /// Distance in centimeters, or a value <= 0 when the device produced no
    /// usable reading this time.
    fn read_range(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;

    /// Best-effort; failures are swallowed by the implementation.
    fn write_configuration(&mut self, payload: &str);

    /// Best-effort; failures are swallowed by the implementation.
    fn play_tone(&mut self, tone: Tone);
}

/// Presence probe for a physical smart card. Must fail open (`false`).
pub trait BadgeReader {
    fn has_badge(&mut self) -> bool;
}

/// The operating system's "lock this session" primitive.
pub trait SessionControl {
    /// Returns `true` when the OS accepted the lock request.
    fn lock_session(&mut self) -> bool;
}

impl<T: Rangefinder + ?Sized> Rangefinder for Box<T> {
    fn read_range(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_range()
    }
    fn write_configuration(&mut self, payload: &str) {
        (**self).write_configuration(payload);
    }
    fn play_tone(&mut self, tone: Tone) {
        (**self).play_tone(tone);
    }
}

impl<T: BadgeReader + ?Sized> BadgeReader for Box<T> {
    fn has_badge(&mut self) -> bool {
        (**self).has_badge()
    }
}

impl<T: SessionControl + ?Sized> SessionControl for Box<T> {
    fn lock_session(&mut self) -> bool {
        (**self).lock_session()
    }
}
