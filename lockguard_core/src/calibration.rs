//! Seated/away calibration.
//!
//! Calibration measures the culled range twice: once with the user seated
//! normally and once after they have walked away. The lock threshold sits a
//! fixed margin beyond the seated distance; the tolerance ceiling is the away
//! distance, pushed out to at least a second margin past the seated one.
//!
//! The monitor must not be running while calibrating; both need the device.

use std::time::Duration;

use lockguard_traits::Rangefinder;
use lockguard_traits::clock::Clock;

use crate::config::{MAX_SAMPLE_SIZE, MonitorCfg};
use crate::error::{GuardError, Result};
use crate::link_error::map_link_error;
use crate::stats::culled_mean;

/// Margin between the seated distance and the lock threshold (cm).
pub const THRESHOLD_MARGIN_CM: f64 = 50.0;
/// Minimum gap between the seated distance and the tolerance ceiling (cm).
pub const TOLERANCE_MARGIN_CM: f64 = 100.0;

pub const DEFAULT_SAMPLES: usize = 16;
pub const DEFAULT_REST: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub seated_cm: f64,
    pub away_cm: f64,
}

impl Calibration {
    pub fn threshold_cm(&self) -> f64 {
        self.seated_cm + THRESHOLD_MARGIN_CM
    }

    pub fn max_tolerance_cm(&self) -> f64 {
        self.away_cm.max(self.seated_cm + TOLERANCE_MARGIN_CM)
    }

    /// Copy the derived distances into `cfg`, leaving the other fields alone.
    pub fn apply_to(&self, cfg: &mut MonitorCfg) {
        cfg.threshold_cm = self.threshold_cm();
        cfg.max_tolerance_cm = self.max_tolerance_cm();
    }
}

/// Take `samples` readings spaced by `rest` and return their culled mean.
///
/// Readings without an echo (≤ 0) and transient read errors are skipped; a
/// closed port aborts the measurement.
pub fn sample_average<R, C>(rangefinder: &mut R, samples: usize, rest: Duration, clock: &C) -> Result<f64>
where
    R: Rangefinder + ?Sized,
    C: Clock + ?Sized,
{
    let mut readings = Vec::with_capacity(samples.min(MAX_SAMPLE_SIZE));
    for i in 0..samples {
        match rangefinder.read_range() {
            Ok(cm) if cm > 0 => {
                tracing::debug!(sample = i, range_cm = cm, "calibration sample");
                readings.push(cm);
            }
            Ok(cm) => tracing::trace!(sample = i, range_cm = cm, "no echo"),
            Err(e) => {
                let err = map_link_error(&*e);
                if err == GuardError::PortClosed {
                    return Err(eyre::Report::new(err));
                }
                tracing::warn!(sample = i, error = %err, "calibration read failed");
            }
        }
        clock.sleep(rest);
    }

    culled_mean(&readings).ok_or_else(|| {
        eyre::Report::new(GuardError::Protocol(format!(
            "no valid range reading in {samples} samples"
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockguard_traits::Tone;
    use lockguard_traits::clock::test_clock::TestClock;

    struct Script(Vec<std::result::Result<i32, &'static str>>);

    impl Rangefinder for Script {
        fn read_range(&mut self) -> std::result::Result<i32, Box<dyn std::error::Error + Send + Sync>> {
            match self.0.remove(0) {
                Ok(v) => Ok(v),
                Err(msg) => Err(msg.into()),
            }
        }
        fn write_configuration(&mut self, _payload: &str) {}
        fn play_tone(&mut self, _tone: Tone) {}
    }

    #[test]
    fn derived_distances() {
        let c = Calibration {
            seated_cm: 70.0,
            away_cm: 140.0,
        };
        assert_eq!(c.threshold_cm(), 120.0);
        assert_eq!(c.max_tolerance_cm(), 170.0);

        let far = Calibration {
            seated_cm: 70.0,
            away_cm: 400.0,
        };
        assert_eq!(far.max_tolerance_cm(), 400.0);

        let mut cfg = MonitorCfg::default();
        far.apply_to(&mut cfg);
        assert_eq!(cfg.threshold_cm, 120.0);
        assert_eq!(cfg.max_tolerance_cm, 400.0);
        assert_eq!(cfg.sample_size, 12);
    }

    #[test]
    fn skips_silence_and_paces_with_clock() {
        let mut rf = Script(vec![Ok(80), Ok(-1), Ok(82), Err("frame error"), Ok(0), Ok(400)]);
        let clock = TestClock::new();
        let avg = sample_average(&mut rf, 6, Duration::from_millis(250), &clock).unwrap();
        // 400 lies outside one deviation of the mean of {80, 82, 400}.
        assert!((avg - 81.0).abs() < 1e-9);
        assert_eq!(clock.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn no_valid_reading_is_protocol_error() {
        let mut rf = Script(vec![Ok(-1), Ok(0)]);
        let err = sample_average(&mut rf, 2, Duration::ZERO, &TestClock::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GuardError>(),
            Some(GuardError::Protocol(_))
        ));
    }

    #[test]
    fn closed_port_stops_sampling() {
        let mut rf = Script(vec![Ok(80), Err("port closed")]);
        let err = sample_average(&mut rf, 5, Duration::ZERO, &TestClock::new()).unwrap_err();
        assert_eq!(err.downcast_ref::<GuardError>(), Some(&GuardError::PortClosed));
    }
}
