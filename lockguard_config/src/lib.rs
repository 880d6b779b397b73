#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the workstation guard.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section and key is optional; absent values take the defaults the
//!   rangefinder firmware was tuned for.
//! - `apply_calibration` rewrites the `[monitor]` distances in an existing
//!   document while leaving everything else in place.
use serde::Deserialize;

/// Largest accepted `monitor.sample_size`. At the default 250 ms interval a
/// full window already spans about seventeen minutes.
pub const MAX_SAMPLE_SIZE: usize = 4096;

/// Presence detection parameters, read every tick by the monitor.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorCfg {
    /// Polling interval between range requests (ms)
    pub interval_ms: u64,
    /// Readings at or above this distance are discarded as reflections (cm)
    pub max_tolerance_cm: f64,
    /// Distance beyond which the user is suspected absent (cm)
    pub threshold_cm: f64,
    /// Stability bound on the window's standard deviation
    pub std_epsilon: f64,
    /// Sample window length
    pub sample_size: usize,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            interval_ms: 250,
            max_tolerance_cm: 1000.0,
            threshold_cm: 180.0,
            std_epsilon: 0.66,
            sample_size: 12,
        }
    }
}

/// Badge veto policy.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VetoCfg {
    pub enabled: bool,
    /// Consecutive lock attempts a present badge may suppress
    pub max_vetoes: u32,
    /// Play the warning tone on each suppressed attempt
    pub warning_tone: bool,
}

impl Default for VetoCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            max_vetoes: 3,
            warning_tone: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceCfg {
    /// Fixed port; when absent every serial port is probed
    pub port: Option<String>,
    pub baud_rate: u32,
    pub write_timeout_ms: u64,
    /// Wait between the identify command and reading its answer
    pub handshake_settle_ms: u64,
    pub handshake_attempts: u8,
    /// Wait between a runtime command and draining its answer (µs)
    pub command_settle_us: u64,
    /// Audible range feedback on the device; pushed once at startup when set
    pub range_sounds: Option<bool>,
}

impl Default for DeviceCfg {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 57_600,
            write_timeout_ms: 1000,
            handshake_settle_ms: 250,
            handshake_attempts: 2,
            command_settle_us: 100,
            range_sounds: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionCfg {
    /// Follow OS lock/unlock changes made outside the guard
    pub watch: bool,
    /// Lock-state sampling period (ms); a lock and unlock inside one period are missed
    pub poll_ms: u64,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            watch: true,
            poll_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorCfg,
    pub veto: VetoCfg,
    pub device: DeviceCfg,
    pub session: SessionCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Monitor
        let m = &self.monitor;
        if m.interval_ms == 0 {
            eyre::bail!("monitor.interval_ms must be >= 1");
        }
        if m.sample_size == 0 {
            eyre::bail!("monitor.sample_size must be >= 1");
        }
        if m.sample_size > MAX_SAMPLE_SIZE {
            eyre::bail!("monitor.sample_size must be <= {MAX_SAMPLE_SIZE}");
        }
        if !(m.max_tolerance_cm.is_finite() && m.max_tolerance_cm > 0.0) {
            eyre::bail!("monitor.max_tolerance_cm must be a positive number");
        }
        if !(m.threshold_cm.is_finite() && m.threshold_cm > 0.0) {
            eyre::bail!("monitor.threshold_cm must be a positive number");
        }
        if m.threshold_cm >= m.max_tolerance_cm {
            eyre::bail!(
                "monitor.threshold_cm ({}) must be below monitor.max_tolerance_cm ({})",
                m.threshold_cm,
                m.max_tolerance_cm
            );
        }
        if !(m.std_epsilon.is_finite() && m.std_epsilon > 0.0) {
            eyre::bail!("monitor.std_epsilon must be a positive number");
        }

        // Device
        if self.device.baud_rate == 0 {
            eyre::bail!("device.baud_rate must be > 0");
        }
        if self.device.write_timeout_ms == 0 {
            eyre::bail!("device.write_timeout_ms must be >= 1");
        }
        if self.device.handshake_attempts == 0 {
            eyre::bail!("device.handshake_attempts must be >= 1");
        }
        if self.device.port.as_deref().is_some_and(str::is_empty) {
            eyre::bail!("device.port must not be empty when set");
        }

        // Session
        if self.session.poll_ms == 0 {
            eyre::bail!("session.poll_ms must be >= 1");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rotation:?}");
        }

        // Veto: max_vetoes = 0 is a valid "never veto"

        Ok(())
    }
}

/// Store calibrated distances into `[monitor]` of an existing TOML document.
///
/// Other tables and keys are preserved; comments are not.
pub fn apply_calibration(
    document: &str,
    threshold_cm: f64,
    max_tolerance_cm: f64,
) -> eyre::Result<String> {
    let mut root: toml::Table = if document.trim().is_empty() {
        toml::Table::new()
    } else {
        document
            .parse()
            .map_err(|e| eyre::eyre!("parse existing config: {e}"))?
    };
    let monitor = root
        .entry("monitor")
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    let Some(monitor) = monitor.as_table_mut() else {
        eyre::bail!("config key `monitor` is not a table");
    };
    monitor.insert("threshold_cm".into(), toml::Value::Float(threshold_cm));
    monitor.insert(
        "max_tolerance_cm".into(),
        toml::Value::Float(max_tolerance_cm),
    );
    toml::to_string_pretty(&root).map_err(|e| eyre::eyre!("serialize config: {e}"))
}
