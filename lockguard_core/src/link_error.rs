//! Maps `Box<dyn Error>` from trait boundaries to typed `GuardError`.
//!
//! The traits in `lockguard_traits` use `Box<dyn Error + Send + Sync>` so the
//! core stays hardware agnostic; this module converts those to our typed enum,
//! with an optional feature-gated path for `lockguard_hardware::LinkError`.

use crate::error::GuardError;

/// Map a trait-boundary error to a typed `GuardError`.
///
/// Attempts to downcast the hardware link error first, then falls back to
/// message heuristics.
pub fn map_link_error(e: &(dyn std::error::Error + 'static)) -> GuardError {
    #[cfg(feature = "hardware-errors")]
    {
        use lockguard_hardware::error::LinkError;
        if let Some(link) = e.downcast_ref::<LinkError>() {
            return match link {
                LinkError::NotFound => GuardError::DeviceNotFound,
                LinkError::PortClosed => GuardError::PortClosed,
                LinkError::Malformed(_) => GuardError::Protocol(link.to_string()),
                other => GuardError::Hardware(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        use std::io::ErrorKind;
        if matches!(
            io.kind(),
            ErrorKind::BrokenPipe
                | ErrorKind::NotConnected
                | ErrorKind::UnexpectedEof
                | ErrorKind::ConnectionAborted
        ) {
            return GuardError::PortClosed;
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("closed") || lower.contains("disconnected") {
        GuardError::PortClosed
    } else if lower.contains("malformed") || lower.contains("parse") {
        GuardError::Protocol(s)
    } else {
        GuardError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Msg(&'static str);
    impl std::fmt::Display for Msg {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }
    impl std::error::Error for Msg {}

    #[test]
    fn heuristics_without_typed_source() {
        assert_eq!(map_link_error(&Msg("port closed")), GuardError::PortClosed);
        assert!(matches!(
            map_link_error(&Msg("malformed range response")),
            GuardError::Protocol(_)
        ));
        assert!(matches!(map_link_error(&Msg("framing")), GuardError::Hardware(_)));
    }

    #[test]
    fn broken_pipe_is_closed() {
        let e = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        assert_eq!(map_link_error(&e), GuardError::PortClosed);
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_link_errors() {
        use lockguard_hardware::error::LinkError;
        assert_eq!(map_link_error(&LinkError::PortClosed), GuardError::PortClosed);
        assert_eq!(map_link_error(&LinkError::NotFound), GuardError::DeviceNotFound);
        assert!(matches!(
            map_link_error(&LinkError::Malformed("R0x".into())),
            GuardError::Protocol(_)
        ));
        assert!(matches!(map_link_error(&LinkError::Timeout), GuardError::Hardware(_)));
    }
}
