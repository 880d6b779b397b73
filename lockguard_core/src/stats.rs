//! Sample statistics over a window of range readings (cm).
//!
//! Both functions use the population standard deviation (divide by N) so the
//! culling bound and the stability bound agree with each other.

/// Arithmetic mean; `None` for an empty input.
#[inline]
pub fn mean(samples: &[i32]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().map(|&v| f64::from(v)).sum();
    Some(sum / samples.len() as f64)
}

/// Population standard deviation; `None` for an empty input.
pub fn standard_deviation(samples: &[i32]) -> Option<f64> {
    let m = mean(samples)?;
    Some(std_dev_around(samples, m))
}

fn std_dev_around(samples: &[i32], m: f64) -> f64 {
    let sq: f64 = samples
        .iter()
        .map(|&v| {
            let d = f64::from(v) - m;
            d * d
        })
        .sum();
    (sq / samples.len() as f64).sqrt()
}

/// Mean of the readings within one standard deviation of the raw mean.
///
/// Falls back to the raw mean when no reading survives the cull. Returns
/// `None` only for an empty input.
pub fn culled_mean(samples: &[i32]) -> Option<f64> {
    let m = mean(samples)?;
    let s = std_dev_around(samples, m);

    let (sum, n) = samples
        .iter()
        .map(|&v| f64::from(v))
        .filter(|v| (v - m).abs() <= s)
        .fold((0.0f64, 0usize), |(sum, n), v| (sum + v, n + 1));

    if n == 0 {
        tracing::trace!(mean = m, stddev = s, "empty culled subset; using raw mean");
        Some(m)
    } else {
        Some(sum / n as f64)
    }
}

/// Both statistics in one pass over the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub culled_cm: f64,
    pub stddev: f64,
}

impl WindowStats {
    pub fn of(samples: &[i32]) -> Option<Self> {
        Some(Self {
            culled_cm: culled_mean(samples)?,
            stddev: standard_deviation(samples)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn outlier_is_culled() {
        let w = [100, 101, 99, 102, 98, 250];
        let m = mean(&w).unwrap();
        let s = standard_deviation(&w).unwrap();
        assert!((m - 125.0).abs() < 1e-9);
        assert!((s - 55.916).abs() < 0.01, "stddev {s}");
        assert!((culled_mean(&w).unwrap() - 100.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(&[200; 12], 200.0, 0.0)]
    #[case(&[7], 7.0, 0.0)]
    #[case(&[10, 20], 15.0, 5.0)]
    fn simple_windows(#[case] w: &[i32], #[case] culled: f64, #[case] sd: f64) {
        assert!((culled_mean(w).unwrap() - culled).abs() < 1e-9);
        assert!((standard_deviation(w).unwrap() - sd).abs() < 1e-9);
    }

    #[test]
    fn empty_window_has_no_statistics() {
        assert_eq!(mean(&[]), None);
        assert_eq!(culled_mean(&[]), None);
        assert_eq!(standard_deviation(&[]), None);
        assert_eq!(WindowStats::of(&[]), None);
    }

    #[test]
    fn window_stats_matches_free_functions() {
        let w = [150, 152, 149, 151];
        let st = WindowStats::of(&w).unwrap();
        assert_eq!(st.culled_cm, culled_mean(&w).unwrap());
        assert_eq!(st.stddev, standard_deviation(&w).unwrap());
    }
}
