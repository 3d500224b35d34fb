//! General time utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Deadline based pacing of a cyclic loop.
///
/// Each deadline is the previous one plus the period, so the time spent processing a cycle does
/// not accumulate into the loop timing. If a cycle overruns its deadline the timer restarts from
/// the current instant rather than trying to catch up with a burst of short cycles.
#[derive(Debug, Clone)]
pub struct CycleTimer {
    period: Duration,
    next_deadline: Instant,
    num_overruns: u64,
    num_consec_overruns: u64,
}

/// Outcome of waiting for the end of a cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleEnd {
    /// The deadline was met, the timer slept for the given duration.
    OnTime(Duration),

    /// The deadline was missed by the given duration.
    Overrun(Duration),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CycleTimer {
    /// Create a new timer whose first deadline is one period from now.
    pub fn new(period: Duration) -> Self {
        Self::starting_at(period, Instant::now())
    }

    /// Create a new timer whose first deadline is one period after `start`.
    pub fn starting_at(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next_deadline: start + period,
            num_overruns: 0,
            num_consec_overruns: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Total number of overran cycles.
    pub fn num_overruns(&self) -> u64 {
        self.num_overruns
    }

    /// Number of consecutive overran cycles, reset on the first cycle to meet its deadline.
    pub fn num_consec_overruns(&self) -> u64 {
        self.num_consec_overruns
    }

    /// Advance the deadline given the current instant, returning how long to sleep.
    ///
    /// This does not sleep, which allows the timing logic to be used with simulated time.
    pub fn advance(&mut self, now: Instant) -> CycleEnd {
        match self.next_deadline.checked_duration_since(now) {
            Some(remaining) => {
                self.num_consec_overruns = 0;
                self.next_deadline += self.period;
                CycleEnd::OnTime(remaining)
            }
            None => {
                let overrun = now - self.next_deadline;
                self.num_overruns += 1;
                self.num_consec_overruns += 1;
                self.next_deadline = now + self.period;
                CycleEnd::Overrun(overrun)
            }
        }
    }

    /// Block until the end of the current cycle.
    pub fn wait(&mut self) -> CycleEnd {
        let end = self.advance(Instant::now());

        if let CycleEnd::OnTime(d) = end {
            std::thread::sleep(d);
        }

        end
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cycle_timer_no_drift() {
        let start = Instant::now();
        let period = Duration::from_millis(100);
        let mut timer = CycleTimer::starting_at(period, start);

        // Processing takes 30 ms, so the timer should sleep for the remaining 70 ms
        assert_eq!(
            timer.advance(start + Duration::from_millis(30)),
            CycleEnd::OnTime(Duration::from_millis(70))
        );

        // The second deadline is at 200 ms regardless of when the first cycle ended
        assert_eq!(
            timer.advance(start + Duration::from_millis(140)),
            CycleEnd::OnTime(Duration::from_millis(60))
        );
        assert_eq!(timer.num_overruns(), 0);
    }

    #[test]
    fn test_cycle_timer_overrun() {
        let start = Instant::now();
        let period = Duration::from_millis(100);
        let mut timer = CycleTimer::starting_at(period, start);

        assert_eq!(
            timer.advance(start + Duration::from_millis(150)),
            CycleEnd::Overrun(Duration::from_millis(50))
        );
        assert_eq!(timer.num_consec_overruns(), 1);

        // After an overrun the deadline is one period after the overrun instant
        assert_eq!(
            timer.advance(start + Duration::from_millis(200)),
            CycleEnd::OnTime(Duration::from_millis(50))
        );
        assert_eq!(timer.num_consec_overruns(), 0);
        assert_eq!(timer.num_overruns(), 1);
    }

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }
}
