use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("rangefinder not found on any serial port")]
    NotFound,
    #[error("the port is closed")]
    PortClosed,
    #[error("serial timeout")]
    Timeout,
    #[error("malformed device response: {0}")]
    Malformed(String),
    #[error("serial error: {0}")]
    Serial(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// Classify an I/O error coming from the serial handle.
    pub fn from_io(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => LinkError::Timeout,
            ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotFound => LinkError::PortClosed,
            _ => LinkError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
