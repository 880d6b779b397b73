//! Runtime configuration for the presence monitor.
//!
//! These are the structs the monitor reads every tick. They are separate from
//! the TOML-deserialized config in `lockguard_config`; see `conversions`.

use std::time::Duration;

pub use lockguard_config::MAX_SAMPLE_SIZE;

/// Detection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorCfg {
    /// Wait between ticks.
    pub interval_ms: u64,
    /// Readings at or above this are discarded (cm).
    pub max_tolerance_cm: f64,
    /// Culled range beyond which absence is suspected (cm).
    pub threshold_cm: f64,
    /// Window standard deviation must stay below this to count as stable.
    pub std_epsilon: f64,
    /// Window length.
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

impl MonitorCfg {
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Whether a raw reading may enter the window: `0 < cm < max_tolerance`.
    #[inline]
    pub fn accepts(&self, cm: i32) -> bool {
        cm > 0 && f64::from(cm) < self.max_tolerance_cm
    }
}

/// Badge veto policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VetoCfg {
    pub enabled: bool,
    pub max_vetoes: u32,
    pub warning_tone: bool,
}

impl Default for VetoCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            max_vetoes: crate::policy::VetoCounter::DEFAULT_CAP,
            warning_tone: true,
        }
    }
}

impl VetoCfg {
    /// Effective cap: a disabled veto behaves like a cap of zero.
    pub fn cap(&self) -> u32 {
        if self.enabled { self.max_vetoes } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-1, false)]
    #[case(0, false)]
    #[case(1, true)]
    #[case(999, true)]
    #[case(1000, false)]
    #[case(4000, false)]
    fn tolerance_band_is_open(#[case] cm: i32, #[case] ok: bool) {
        assert_eq!(MonitorCfg::default().accepts(cm), ok);
    }

    #[test]
    fn disabled_veto_has_no_cap() {
        let v = VetoCfg {
            enabled: false,
            ..VetoCfg::default()
        };
        assert_eq!(v.cap(), 0);
        assert_eq!(VetoCfg::default().cap(), 3);
    }
}
