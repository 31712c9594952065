//! Host-driven timers.
//!
//! Nothing here sleeps or spawns: the host reports elapsed time through
//! `DrawingSession::advance`, and each timer says how often it fired.

use std::time::Duration;

/// A repeating timer with a fixed period.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTimer {
    period: Duration,
    elapsed: Duration,
}

impl IntervalTimer {
    pub const MAX_BURST: u32 = 4;

    pub fn new(period: Duration) -> Self {
        Self {
            period,
            elapsed: Duration::ZERO,
        }
    }

    /// Advance by `dt`, returning the number of periods completed.
    ///
    /// At most `MAX_BURST` periods fire per call; any further backlog from a
    /// long host gap is dropped.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        if self.period.is_zero() {
            return 0;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        let mut fired = 0;
        while self.elapsed >= self.period && fired < Self::MAX_BURST {
            self.elapsed -= self.period;
            fired += 1;
        }
        if self.elapsed >= self.period {
            log::trace!("interval dropped {:?} of backlog", self.elapsed);
            self.elapsed = Duration::ZERO;
        }
        fired
    }
}

/// A one-shot action that becomes due after a delay.
#[derive(Debug, Clone, PartialEq)]
pub struct Deferred {
    remaining: Duration,
}

impl Deferred {
    pub fn after(delay: Duration) -> Self {
        Self { remaining: delay }
    }

    /// Advance by `dt`; `true` once the delay has fully elapsed.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.remaining = self.remaining.saturating_sub(dt);
        self.remaining.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_fires_once_per_period() {
        let mut t = IntervalTimer::new(Duration::from_millis(30));
        assert_eq!(t.advance(Duration::from_millis(20)), 0);
        assert_eq!(t.advance(Duration::from_millis(20)), 1);
        assert_eq!(t.advance(Duration::from_millis(65)), 2);
    }

    #[test]
    fn long_gap_fires_a_bounded_burst() {
        let mut t = IntervalTimer::new(Duration::from_millis(30));
        assert_eq!(t.advance(Duration::from_secs(60)), IntervalTimer::MAX_BURST);
        assert_eq!(t.advance(Duration::from_millis(20)), 0);
        assert_eq!(t.advance(Duration::from_millis(10)), 1);
    }

    #[test]
    fn huge_advance_saturates() {
        let mut t = IntervalTimer::new(Duration::from_millis(30));
        t.advance(Duration::MAX);
        assert_eq!(t.advance(Duration::MAX), IntervalTimer::MAX_BURST);
    }

    #[test]
    fn deferred_fires_after_delay() {
        let mut d = Deferred::after(Duration::from_secs(2));
        assert!(!d.advance(Duration::from_millis(1500)));
        assert!(d.advance(Duration::from_millis(600)));
    }
}
