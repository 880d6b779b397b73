//! `From` implementations bridging `lockguard_config` types to runtime types.

use crate::config::{MonitorCfg, VetoCfg};

impl From<&lockguard_config::MonitorCfg> for MonitorCfg {
    fn from(c: &lockguard_config::MonitorCfg) -> Self {
        Self {
            interval_ms: c.interval_ms,
            max_tolerance_cm: c.max_tolerance_cm,
            threshold_cm: c.threshold_cm,
            std_epsilon: c.std_epsilon,
            sample_size: c.sample_size,
        }
    }
}

impl From<&lockguard_config::VetoCfg> for VetoCfg {
    fn from(c: &lockguard_config::VetoCfg) -> Self {
        Self {
            enabled: c.enabled,
            max_vetoes: c.max_vetoes,
            warning_tone: c.warning_tone,
        }
    }
}

/// Serial link parameters from the `[device]` section.
#[cfg(feature = "hardware-errors")]
pub fn link_settings(c: &lockguard_config::DeviceCfg) -> lockguard_hardware::LinkSettings {
    use std::time::Duration;
    lockguard_hardware::LinkSettings {
        baud_rate: c.baud_rate,
        write_timeout: Duration::from_millis(c.write_timeout_ms),
        handshake_settle: Duration::from_millis(c.handshake_settle_ms),
        handshake_attempts: c.handshake_attempts,
        command_settle: Duration::from_micros(c.command_settle_us),
        port: c.port.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_defaults_match_runtime_defaults() {
        let file = lockguard_config::Config::default();
        assert_eq!(MonitorCfg::from(&file.monitor), MonitorCfg::default());
        assert_eq!(VetoCfg::from(&file.veto), VetoCfg::default());
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn device_section_maps_to_link_settings() {
        let file = lockguard_config::DeviceCfg {
            port: Some("COM4".into()),
            command_settle_us: 300,
            ..Default::default()
        };
        let s = link_settings(&file);
        assert_eq!(s.port.as_deref(), Some("COM4"));
        assert_eq!(s.command_settle, std::time::Duration::from_micros(300));
        assert_eq!(s.baud_rate, 57_600);
    }
}
