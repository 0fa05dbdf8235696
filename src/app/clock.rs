//! Time source for every cadence in the loop.

use std::{
    cell::{Cell, RefCell},
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

pub trait Clock {
    /// Wall-clock time since the UNIX epoch. Only page rotation reads it.
    fn now(&self) -> Duration;
    /// Time since an arbitrary origin; never steps backwards.
    fn monotonic(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Manually driven clock; `sleep` advances time instantly and is recorded.
/// The wall clock can be stepped on its own, like an NTP correction.
#[derive(Debug, Default)]
pub struct FakeClock {
    wall: Cell<Duration>,
    elapsed: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub fn new(start: Duration) -> Self {
        Self {
            wall: Cell::new(start),
            elapsed: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.wall.set(self.wall.get() + by);
        self.elapsed.set(self.elapsed.get() + by);
    }

    /// Jump the wall clock to `to`, forwards or backwards.
    pub fn set_wall(&self, to: Duration) {
        self.wall.set(to);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        self.wall.get()
    }

    fn monotonic(&self) -> Duration {
        self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn monotonic(&self) -> Duration {
        (**self).monotonic()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_sleep_advances_and_records() {
        let clock = FakeClock::new(Duration::from_secs(100));
        clock.sleep(Duration::from_millis(50));
        clock.sleep(Duration::from_millis(50));
        assert_eq!(clock.now(), Duration::from_millis(100_100));
        assert_eq!(clock.monotonic(), Duration::from_millis(100));
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[test]
    fn wall_step_leaves_monotonic_time_alone() {
        let clock = FakeClock::new(Duration::from_secs(5_000));
        clock.advance(Duration::from_secs(2));
        clock.set_wall(Duration::from_secs(1_400));
        assert_eq!(clock.now(), Duration::from_secs(1_400));
        assert_eq!(clock.monotonic(), Duration::from_secs(2));
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1_401));
        assert_eq!(clock.monotonic(), Duration::from_secs(3));
    }

    #[test]
    fn system_clock_is_past_the_epoch() {
        let clock = SystemClock::new();
        assert!(clock.now() > Duration::from_secs(1_600_000_000));
        let before = clock.monotonic();
        assert!(clock.monotonic() >= before);
    }
}
