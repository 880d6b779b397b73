use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("rangefinder not found on any serial port")]
    DeviceNotFound,
    #[error("rangefinder port closed")]
    PortClosed,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing rangefinder")]
    MissingRangefinder,
    #[error("missing session control")]
    MissingSession,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
