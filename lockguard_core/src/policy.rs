//! Lock decision rule and badge veto bookkeeping.

/// True when the window is both stable and far: the user is confidently absent.
///
/// Both inequalities are strict; a reading exactly at the threshold or a
/// deviation exactly at epsilon does not lock.
#[inline]
pub fn confidently_absent(stddev: f64, culled_cm: f64, std_epsilon: f64, threshold_cm: f64) -> bool {
    stddev < std_epsilon && culled_cm > threshold_cm
}

/// Counts consecutive lock attempts suppressed by a present badge.
///
/// Once `cap` vetoes have been spent, `try_veto` refuses until `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VetoCounter {
    count: u32,
    cap: u32,
}

impl VetoCounter {
    pub const DEFAULT_CAP: u32 = 3;

    pub fn new(cap: u32) -> Self {
        Self { count: 0, cap }
    }

    /// Spend one veto if any remain.
    pub fn try_veto(&mut self) -> bool {
        if self.count < self.cap {
            self.count += 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn exhausted(&self) -> bool {
        self.count >= self.cap
    }
}

impl Default for VetoCounter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 200.0, true)]
    #[case(0.65, 180.1, true)]
    #[case(0.66, 200.0, false)] // stddev == epsilon
    #[case(0.0, 180.0, false)] // culled == threshold
    #[case(0.1, 100.0, false)] // stable but close
    #[case(40.0, 400.0, false)] // far but noisy
    fn decision_rule(#[case] sd: f64, #[case] culled: f64, #[case] expected: bool) {
        assert_eq!(confidently_absent(sd, culled, 0.66, 180.0), expected);
    }

    #[test]
    fn three_vetoes_then_refuse_until_reset() {
        let mut v = VetoCounter::default();
        assert!(v.try_veto());
        assert!(v.try_veto());
        assert!(v.try_veto());
        assert!(v.exhausted());
        assert!(!v.try_veto());
        assert_eq!(v.count(), 3);
        v.reset();
        assert_eq!(v.count(), 0);
        assert!(v.try_veto());
    }

    #[test]
    fn zero_cap_never_vetoes() {
        let mut v = VetoCounter::new(0);
        assert!(!v.try_veto());
    }
}
