//! `serialport`-backed transport.
use std::io::{Read, Write};

use serialport::{ClearBuffer, SerialPort};

use crate::error::{LinkError, Result};
use crate::transport::{LinkSettings, PortProvider, SerialIo};

/// Enumerates the host's serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

pub struct SerialHandle {
    inner: Box<dyn SerialPort>,
}

impl PortProvider for SystemPorts {
    type Port = SerialHandle;

    fn port_names(&self) -> Result<Vec<String>> {
        let ports = serialport::available_ports().map_err(map_serial_error)?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn open(&self, name: &str, settings: &LinkSettings) -> Result<SerialHandle> {
        let inner = serialport::new(name, settings.baud_rate)
            .timeout(settings.write_timeout)
            .open()
            .map_err(map_serial_error)?;
        tracing::debug!(port = name, baud = settings.baud_rate, "opened serial port");
        Ok(SerialHandle { inner })
    }
}

impl SerialIo for SerialHandle {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let framed = format!("{line}\n");
        self.inner
            .write_all(framed.as_bytes())
            .and_then(|()| self.inner.flush())
            .map_err(LinkError::from_io)
    }

    fn read_available(&mut self) -> Result<String> {
        let pending = self.inner.bytes_to_read().map_err(map_serial_error)? as usize;
        if pending == 0 {
            return Ok(String::new());
        }
        let mut buf = vec![0u8; pending];
        self.inner.read_exact(&mut buf).map_err(LinkError::from_io)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn set_rts(&mut self, level: bool) -> Result<()> {
        self.inner
            .write_request_to_send(level)
            .map_err(map_serial_error)
    }

    fn clear(&mut self) -> Result<()> {
        self.inner.clear(ClearBuffer::All).map_err(map_serial_error)
    }
}

fn map_serial_error(e: serialport::Error) -> LinkError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => LinkError::PortClosed,
        serialport::ErrorKind::Io(kind) => {
            LinkError::from_io(std::io::Error::new(kind, e.description))
        }
        _ => LinkError::Serial(e.to_string()),
    }
}
