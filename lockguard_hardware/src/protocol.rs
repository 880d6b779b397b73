//! Plain-text line protocol spoken by the rangefinder firmware.
//!
//! Every command is a two-character token terminated by a newline. The device
//! echoes the command token in front of its answer:
//!
//! | Command       | Answer                               |
//! |---------------|--------------------------------------|
//! | `I0`          | `I0LockDuinoV1...`                   |
//! | `R0`          | `R0<distance cm>\r\n`                |
//! | `C0<payload>` | ignored                              |
//! | `P0`/`P1`/`P2`| ignored (lock / unlock / warning)    |
use lockguard_traits::Tone;

use crate::error::{LinkError, Result};

pub const IDENTIFY: &str = "I0";
pub const IDENTIFICATION_RESPONSE: &str = "I0LockDuinoV1";
pub const READ_RANGE: &str = "R0";
pub const WRITE_CONFIGURATION: &str = "C0";
pub const LOCK_TONE: &str = "P0";
pub const UNLOCK_TONE: &str = "P1";
pub const WARNING_TONE: &str = "P2";

/// Returned by range reads when the device produced nothing usable this tick.
pub const NO_READING: i32 = -1;

/// Device command that plays `tone`.
pub fn tone_command(tone: Tone) -> &'static str {
    match tone {
        Tone::Lock => LOCK_TONE,
        Tone::Unlock => UNLOCK_TONE,
        Tone::Warning => WARNING_TONE,
    }
}

/// Configuration command line carrying `payload`.
pub fn configuration_command(payload: &str) -> String {
    format!("{WRITE_CONFIGURATION}{payload}")
}

/// True when a handshake answer identifies the rangefinder.
#[inline]
pub fn is_identification(response: &str) -> bool {
    response.starts_with(IDENTIFICATION_RESPONSE)
}

/// Parse whatever the device returned for `R0`.
///
/// - `Ok(None)`: too short to hold a value, or the line is not terminated yet.
/// - `Ok(Some(cm))`: distance between the echo prefix and the terminator.
/// - `Err(Malformed)`: a complete line whose payload is not an integer.
pub fn parse_range_response(response: &str) -> Result<Option<i32>> {
    if response.len() <= READ_RANGE.len() {
        return Ok(None);
    }
    let Some(body) = response.strip_prefix(READ_RANGE) else {
        return Err(LinkError::Malformed(truncate(response)));
    };
    let Some(end) = body.find(['\r', '\n']) else {
        return Ok(None);
    };
    let digits = body[..end].trim();
    digits
        .parse::<i32>()
        .map(Some)
        .map_err(|_| LinkError::Malformed(truncate(response)))
}

fn truncate(s: &str) -> String {
    const MAX: usize = 32;
    let line = s.trim_end();
    match line.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", None)]
    #[case("R", None)]
    #[case("R0", None)]
    #[case("R0123", None)]
    #[case("R0123\r\n", Some(123))]
    #[case("R042\n", Some(42))]
    #[case("R0 87 \r\n", Some(87))]
    #[case("R0-1\r\n", Some(-1))]
    #[case("R0250\r\nR0251\r\n", Some(250))]
    fn parses_range_answers(#[case] input: &str, #[case] expected: Option<i32>) {
        assert_eq!(parse_range_response(input).unwrap(), expected);
    }

    #[rstest]
    #[case("R0abc\r\n")]
    #[case("R0\r\n")]
    #[case("P0ok\r\n")]
    #[case("R099999999999\r\n")]
    fn rejects_garbled_lines(#[case] input: &str) {
        match parse_range_response(input) {
            Err(LinkError::Malformed(_)) => {}
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn identification_is_a_prefix_match() {
        assert!(is_identification("I0LockDuinoV1"));
        assert!(is_identification("I0LockDuinoV1extra\r\n"));
        assert!(!is_identification("timeout"));
        assert!(!is_identification(" I0LockDuinoV1"));
    }

    #[test]
    fn tones_map_to_play_commands() {
        assert_eq!(tone_command(Tone::Lock), "P0");
        assert_eq!(tone_command(Tone::Unlock), "P1");
        assert_eq!(tone_command(Tone::Warning), "P2");
        assert_eq!(configuration_command("1"), "C01");
    }

    #[test]
    fn malformed_message_is_truncated() {
        let long = format!("R0{}\r\n", "x".repeat(100));
        let Err(LinkError::Malformed(msg)) = parse_range_response(&long) else {
            panic!("expected Malformed");
        };
        assert!(msg.ends_with("..."));
        assert!(msg.len() < 40);
    }
}
