//! Byte-level seam between `DeviceLink` and an actual serial port.
use std::time::Duration;

use crate::error::Result;

/// Timing and line parameters for the rangefinder link.
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub baud_rate: u32,
    /// Bound on a single write so a mute peer cannot hang discovery.
    pub write_timeout: Duration,
    /// Wait between `I0` and reading the answer.
    pub handshake_settle: Duration,
    /// Handshake tries per port; the first one also raises RTS.
    pub handshake_attempts: u8,
    /// Yield between a runtime command and draining its answer.
    pub command_settle: Duration,
    /// Probe only this port instead of enumerating.
    pub port: Option<String>,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: 57_600,
            write_timeout: Duration::from_millis(1000),
            handshake_settle: Duration::from_millis(250),
            handshake_attempts: 2,
            command_settle: Duration::from_micros(100),
            port: None,
        }
    }
}

/// An open, half-duplex, line-oriented serial handle.
pub trait SerialIo: Send {
    /// Write `line` followed by the newline terminator.
    fn write_line(&mut self, line: &str) -> Result<()>;
    /// Non-blocking drain of whatever bytes are currently buffered.
    fn read_available(&mut self) -> Result<String>;
    fn set_rts(&mut self, level: bool) -> Result<()>;
    /// Discard unread input and unsent output.
    fn clear(&mut self) -> Result<()>;
}

/// Source of candidate ports for discovery.
pub trait PortProvider {
    type Port: SerialIo;

    fn port_names(&self) -> Result<Vec<String>>;
    fn open(&self, name: &str, settings: &LinkSettings) -> Result<Self::Port>;
}

impl<T: SerialIo + ?Sized> SerialIo for Box<T> {
    fn write_line(&mut self, line: &str) -> Result<()> {
        (**self).write_line(line)
    }
    fn read_available(&mut self) -> Result<String> {
        (**self).read_available()
    }
    fn set_rts(&mut self, level: bool) -> Result<()> {
        (**self).set_rts(level)
    }
    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }
}
