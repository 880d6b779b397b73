//! Human-readable error descriptions, exit codes and structured JSON errors.

use lockguard_core::error::{BuildError, GuardError};

/// Stable name for the error class, used in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(ge) = err.downcast_ref::<GuardError>() {
        return match ge {
            GuardError::DeviceNotFound => "DeviceNotFound",
            GuardError::PortClosed => "Abort",
            GuardError::Protocol(_) => "Protocol",
            GuardError::Hardware(_) => "Hardware",
            GuardError::Config(_) => "InvalidConfig",
            GuardError::State(_) => "State",
        };
    }
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "InvalidConfig",
            BuildError::MissingRangefinder | BuildError::MissingSession => "Build",
        };
    }
    "Error"
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRangefinder => {
                "What happened: No rangefinder was provided to the monitor.\nLikely causes: Device discovery returned nothing and the builder was not given a device.\nHow to fix: Ensure the rangefinder is found and passed via with_rangefinder(...).".to_string()
            }
            BuildError::MissingSession => {
                "What happened: No session control was provided to the monitor.\nLikely causes: The OS lock backend was not wired into the builder.\nHow to fix: Pass a session via with_session(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid monitor settings ({msg}).\nLikely causes: Out-of-range values in [monitor] or in the --interval-ms/--threshold-cm/--sample-size overrides.\nHow to fix: Keep threshold_cm below max_tolerance_cm, every count above zero and sample_size at most 4096, then rerun."
            ),
        };
    }

    if let Some(ge) = err.downcast_ref::<GuardError>() {
        return match ge {
            GuardError::DeviceNotFound => {
                "What happened: The rangefinder did not answer on any serial port.\nLikely causes: Device unplugged, wrong [device] port, or another program holding the port.\nHow to fix: Reconnect the device, close other serial monitors, or set device.port explicitly.".to_string()
            }
            GuardError::PortClosed => {
                "What happened: The rangefinder's serial port closed. When this happens while guarding, the session is locked as a precaution.\nLikely causes: USB cable pulled or the device reset.\nHow to fix: Reconnect the device and run the command again.".to_string()
            }
            GuardError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo or out-of-range value in the TOML.\nHow to fix: Edit the config file, then rerun. Every key is optional; delete it to fall back to the default."
            ),
            GuardError::Protocol(msg) => format!(
                "What happened: The rangefinder sent data that could not be used ({msg}).\nLikely causes: Nothing in front of the sensor, or a noisy serial line.\nHow to fix: Point the sensor at the chair and retry; use --log-level=debug to see raw readings."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("permission denied") {
        return "What happened: Access to a device or file was denied.\nLikely causes: The serial port belongs to a group the user is not in (e.g. dialout), or the config file is read-only.\nHow to fix: Add the user to the port's group or fix the file permissions.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 device not found, 3 aborted, 4 invalid configuration,
/// 1 for everything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ge) = err.downcast_ref::<GuardError>() {
        return match ge {
            GuardError::DeviceNotFound => 2,
            GuardError::PortClosed => 3,
            GuardError::Config(_) => 4,
            _ => 1,
        };
    }
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return 4;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
