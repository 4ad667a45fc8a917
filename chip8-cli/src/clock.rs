//! Frame clock.
use std::{
    thread,
    time::{Duration, Instant},
};

use chip8_vm::constants::NANOS_IN_SECOND;

/// Clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy)]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Timer to pace the frame loop of the driver.
///
/// The VM runs a batch of cycles and ticks its timers once per frame.
/// Time spent running the batch counts towards the frame, so the clock
/// only waits out the remainder.
pub struct Clock {
    start: Instant,
    interval: Duration,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(frequency: Hz) -> Self {
        Self {
            start: Instant::now(),
            interval: frequency.into(),
        }
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Block the current thread until the next frame.
    pub fn wait(&mut self) {
        loop {
            let elapsed = self.start.elapsed();
            if elapsed < self.interval {
                // Sleep does not have enough resolution, and causes
                // the clock to run at 30 FPS.
                //
                // Spinning a loop causes high CPU usage and fan madness.
                //
                // Yielding in a loop is the best alternative.
                thread::yield_now();
            } else {
                // Reset back to zero, rather than trying to catch up.
                //
                // If the driver was stalled for a long time, it should
                // simply continue at the next frame at its usual speed.
                self.reset();
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clock_hz() {
        let interval: Duration = Hz(60).into();
        assert_eq!(interval.as_millis(), 16);

        let interval: Duration = Hz(0).into();
        assert_eq!(interval, Duration::ZERO);
    }

    #[test]
    fn test_wait_takes_an_interval() {
        let mut clock = Clock::new(Hz(1000));
        let start = Instant::now();
        clock.wait();
        assert!(start.elapsed() >= Duration::from_millis(1));
    }
}
