use std::thread;
use std::time::{Duration, Instant};

/// Time source for the settle delays of the serial protocol and the pacing
/// of calibration samples. Tests swap in `TestClock` so nothing really sleeps.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

/// Wall-clock implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        // The 100 µs command settle is far below the scheduler's sleep granularity.
        if d < Duration::from_millis(1) {
            let deadline = Instant::now() + d;
            while Instant::now() < deadline {
                thread::yield_now();
            }
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Clock that only moves when slept on or advanced. Clones share time, so
    /// a test can keep one handle and give the other to the code under test.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        slept: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                slept: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        pub fn advance(&self, d: Duration) {
            if let Ok(mut slept) = self.slept.lock() {
                *slept = slept.saturating_add(d);
            }
        }

        /// Total simulated time so far.
        pub fn elapsed(&self) -> Duration {
            self.slept.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn test_clock_sleep_is_instant_and_shared_between_clones() {
        let clock = TestClock::new();
        let handle = clock.clone();
        let start = clock.now();
        let wall = Instant::now();

        handle.sleep(Duration::from_secs(10));
        handle.sleep(Duration::from_millis(250));

        assert_eq!(clock.elapsed(), Duration::from_millis(10_250));
        assert_eq!(clock.now() - start, Duration::from_millis(10_250));
        assert!(wall.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn monotonic_sub_millisecond_sleep_returns() {
        let clock = MonotonicClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_micros(100));
        assert!(clock.now() >= start + Duration::from_micros(100));
    }
}
