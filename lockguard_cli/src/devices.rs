//! Device assembly.
//!
//! With the `hardware` feature the rangefinder is discovered on the host's
//! serial ports, the badge is probed over PC/SC and the session is locked
//! through the OS. Without it every device is simulated and scripted through
//! `LOCKGUARD_SIM_*` environment variables.

use lockguard_config::Config;
use lockguard_traits::{BadgeReader, Rangefinder, SessionControl};

#[cfg(not(feature = "hardware"))]
pub use sim::SimSettings;

pub struct Devices {
    pub port: String,
    pub rangefinder: Box<dyn Rangefinder + Send>,
    pub badge: Box<dyn BadgeReader + Send>,
    pub session: Box<dyn SessionControl + Send>,
}

#[cfg(feature = "hardware")]
pub fn open(cfg: &Config) -> eyre::Result<Devices> {
    use lockguard_core::link_error::map_link_error;
    use lockguard_hardware::serial::SystemPorts;
    use lockguard_hardware::SystemSession;
    use lockguard_hardware::badge::PcscBadgeReader;
    use lockguard_traits::MonotonicClock;

    let settings = lockguard_core::conversions::link_settings(&cfg.device);
    let link = lockguard_hardware::discover(&SystemPorts, settings, MonotonicClock::new())
        .map_err(|e| eyre::Report::new(map_link_error(&e)))?;
    Ok(Devices {
        port: link.port_name().to_string(),
        rangefinder: Box::new(link),
        badge: Box::new(PcscBadgeReader::new()),
        session: Box::new(SystemSession),
    })
}

#[cfg(not(feature = "hardware"))]
pub fn open(_cfg: &Config) -> eyre::Result<Devices> {
    use lockguard_core::GuardError;
    use lockguard_hardware::{SimulatedBadge, SimulatedRangefinder, SimulatedSession};

    let sim = SimSettings::from_env()?;
    if sim.no_device {
        return Err(GuardError::DeviceNotFound.into());
    }
    let mut rangefinder = SimulatedRangefinder::new(sim.ranges);
    if let Some(n) = sim.close_after {
        rangefinder = rangefinder.close_after(n);
    }
    tracing::info!(badge = sim.badge, close_after = ?sim.close_after, "using simulated devices");
    Ok(Devices {
        port: "sim".to_string(),
        rangefinder: Box::new(rangefinder),
        badge: Box::new(SimulatedBadge(sim.badge)),
        session: Box::new(SimulatedSession::new()),
    })
}

#[cfg(not(feature = "hardware"))]
mod sim {
    use lockguard_core::GuardError;

    /// Simulation script read from the environment.
    #[derive(Debug, Clone, PartialEq)]
    pub struct SimSettings {
        pub ranges: Vec<i32>,
        pub close_after: Option<usize>,
        pub badge: bool,
        pub no_device: bool,
    }

    impl Default for SimSettings {
        fn default() -> Self {
            Self {
                // A user seated at arm's length.
                ranges: vec![90],
                close_after: None,
                badge: false,
                no_device: false,
            }
        }
    }

    impl SimSettings {
        pub fn from_env() -> eyre::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
            let mut sim = Self::default();
            if let Some(raw) = get("LOCKGUARD_SIM_RANGES") {
                sim.ranges = parse_ranges(&raw)?;
            }
            if let Some(raw) = get("LOCKGUARD_SIM_CLOSE_AFTER") {
                let n = raw.trim().parse::<usize>().map_err(|e| {
                    GuardError::Config(format!("LOCKGUARD_SIM_CLOSE_AFTER={raw:?}: {e}"))
                })?;
                sim.close_after = Some(n);
            }
            sim.badge = get("LOCKGUARD_SIM_BADGE").is_some_and(|v| flag(&v));
            sim.no_device = get("LOCKGUARD_SIM_NO_DEVICE").is_some_and(|v| flag(&v));
            Ok(sim)
        }
    }

    fn flag(v: &str) -> bool {
        matches!(v.trim(), "1" | "true" | "yes" | "on")
    }

    fn parse_ranges(raw: &str) -> eyre::Result<Vec<i32>> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i32>().map_err(|e| {
                    eyre::Report::new(GuardError::Config(format!(
                        "LOCKGUARD_SIM_RANGES entry {s:?}: {e}"
                    )))
                })
            })
            .collect()
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            move |k| map.get(k).cloned()
        }

        #[test]
        fn empty_environment_simulates_a_seated_user() {
            let sim = SimSettings::from_lookup(lookup(&[])).unwrap();
            assert_eq!(sim, SimSettings::default());
        }

        #[test]
        fn script_and_flags_are_parsed() {
            let sim = SimSettings::from_lookup(lookup(&[
                ("LOCKGUARD_SIM_RANGES", "90, 95,,-1"),
                ("LOCKGUARD_SIM_CLOSE_AFTER", "4"),
                ("LOCKGUARD_SIM_BADGE", "yes"),
                ("LOCKGUARD_SIM_NO_DEVICE", "0"),
            ]))
            .unwrap();
            assert_eq!(sim.ranges, vec![90, 95, -1]);
            assert_eq!(sim.close_after, Some(4));
            assert!(sim.badge);
            assert!(!sim.no_device);
        }

        #[test]
        fn garbage_is_a_config_error() {
            let err = SimSettings::from_lookup(lookup(&[("LOCKGUARD_SIM_RANGES", "90,far")]))
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<GuardError>(),
                Some(GuardError::Config(_))
            ));
        }
    }
}
