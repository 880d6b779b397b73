//! `DeviceLink`: exclusive owner of the rangefinder's serial handle.
//!
//! Discovery probes every candidate port with the `I0` handshake and keeps the
//! first one that identifies itself. Afterwards the link serves the per-tick
//! `R0` range request plus best-effort configuration and tone commands.
//!
//! Once the transport reports the port closed, the link is invalidated and
//! every further call fails with `LinkError::PortClosed` without touching the
//! handle again.
use lockguard_traits::clock::{Clock, MonotonicClock};
use lockguard_traits::{Rangefinder, Tone};
use tracing::{debug, info, trace, warn};

use crate::error::{LinkError, Result};
use crate::protocol;
use crate::transport::{LinkSettings, PortProvider, SerialIo};

pub struct DeviceLink<P, C = MonotonicClock> {
    port_name: String,
    port: P,
    settings: LinkSettings,
    clock: C,
    closed: bool,
}

impl<P: SerialIo, C: Clock> DeviceLink<P, C> {
    /// Wrap an already identified port.
    pub fn new(port_name: impl Into<String>, port: P, settings: LinkSettings, clock: C) -> Self {
        Self {
            port_name: port_name.into(),
            port,
            settings,
            clock,
            closed: false,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drop residual handshake noise in both directions.
    pub fn clear_buffers(&mut self) -> Result<()> {
        self.ensure_open()?;
        let r = self.port.clear();
        self.track(r)
    }

    /// Request one distance sample.
    ///
    /// Returns `protocol::NO_READING` when the device has not (fully) answered yet.
    pub fn read_range(&mut self) -> Result<i32> {
        self.ensure_open()?;
        let r = self.port.write_line(protocol::READ_RANGE);
        self.track(r)?;
        self.clock.sleep(self.settings.command_settle);
        let r = self.port.read_available();
        let response = self.track(r)?;
        match protocol::parse_range_response(&response)? {
            Some(cm) => {
                trace!(range_cm = cm, "range answer");
                Ok(cm)
            }
            None => {
                trace!(bytes = response.len(), "no range answer this tick");
                Ok(protocol::NO_READING)
            }
        }
    }

    /// Push a configuration payload (`C0<payload>`). Errors are swallowed.
    pub fn write_configuration(&mut self, payload: &str) {
        let line = protocol::configuration_command(payload);
        self.send_best_effort(&line);
    }

    /// Play one of the feedback tones. Errors are swallowed.
    pub fn play_tone(&mut self, tone: Tone) {
        self.send_best_effort(protocol::tone_command(tone));
    }

    fn send_best_effort(&mut self, line: &str) {
        if self.closed {
            return;
        }
        let r = self.port.write_line(line);
        if let Err(e) = self.track(r) {
            debug!(command = line, error = %e, "side-channel write failed");
            return;
        }
        self.clock.sleep(self.settings.command_settle);
        let r = self.port.read_available();
        if let Err(e) = self.track(r) {
            debug!(command = line, error = %e, "side-channel drain failed");
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(LinkError::PortClosed)
        } else {
            Ok(())
        }
    }

    fn track<T>(&mut self, r: Result<T>) -> Result<T> {
        if let Err(LinkError::PortClosed) = &r {
            if !self.closed {
                warn!(port = %self.port_name, "serial port closed; link invalidated");
            }
            self.closed = true;
        }
        r
    }
}

impl<P: SerialIo, C: Clock> Rangefinder for DeviceLink<P, C> {
    fn read_range(&mut self) -> std::result::Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        DeviceLink::read_range(self).map_err(Into::into)
    }

    fn write_configuration(&mut self, payload: &str) {
        DeviceLink::write_configuration(self, payload);
    }

    fn play_tone(&mut self, tone: Tone) {
        DeviceLink::play_tone(self, tone);
    }
}

/// Probe candidate ports until one answers the identification handshake.
///
/// The winning port is kept open, its buffers are cleared, and it is returned
/// wrapped in a `DeviceLink`. Every other port opened on the way is closed.
/// A failed buffer clear is only fatal when it reports the port closed.
pub fn discover<P, C>(provider: &P, settings: LinkSettings, clock: C) -> Result<DeviceLink<P::Port, C>>
where
    P: PortProvider,
    C: Clock,
{
    let candidates = match &settings.port {
        Some(name) => vec![name.clone()],
        None => provider.port_names()?,
    };
    info!(ports = ?candidates, "probing serial ports for rangefinder");

    for name in candidates {
        debug!(port = %name, "testing port");
        let mut port = match provider.open(&name, &settings) {
            Ok(p) => p,
            Err(e) => {
                debug!(port = %name, error = %e, "cannot open port; skipping");
                continue;
            }
        };

        for attempt in 0..settings.handshake_attempts {
            match identify(&mut port, &settings, &clock, attempt == 0) {
                Ok(true) => {
                    info!(port = %name, "found rangefinder");
                    let mut link = DeviceLink::new(name, port, settings, clock);
                    match link.clear_buffers() {
                        Ok(()) => {}
                        Err(LinkError::PortClosed) => return Err(LinkError::PortClosed),
                        Err(e) => {
                            warn!(port = %link.port_name(), error = %e, "clearing buffers failed; keeping link");
                        }
                    }
                    return Ok(link);
                }
                Ok(false) => {
                    debug!(port = %name, attempt, "no identification answer");
                }
                Err(e) => {
                    debug!(port = %name, attempt, error = %e, "handshake failed; abandoning port");
                    break;
                }
            }
        }
        // `port` drops here and closes the handle.
    }

    warn!("failed to find rangefinder on any port");
    Err(LinkError::NotFound)
}

fn identify<S: SerialIo, C: Clock>(
    port: &mut S,
    settings: &LinkSettings,
    clock: &C,
    raise_rts: bool,
) -> Result<bool> {
    if raise_rts {
        // Some USB CDC stacks (ATmega32U4) stay silent until RTS is asserted.
        if let Err(e) = port.set_rts(true) {
            trace!(error = %e, "RTS not supported");
        }
    }
    port.write_line(protocol::IDENTIFY)?;
    clock.sleep(settings.handshake_settle);
    let response = port.read_available()?;
    Ok(protocol::is_identification(&response))
}
