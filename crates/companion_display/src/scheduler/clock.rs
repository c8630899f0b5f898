//! # Tick Clock
//!
//! Fixed-timestep pacing for [`TickDriver::spawn`](super::TickDriver::spawn).
//!
//! Time accumulates between polls; each whole tick's worth of accumulated
//! time releases one tick. A slow tick is counted as late and the backlog is
//! worked off on the following polls.

use std::time::{Duration, Instant};

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Ticks measured.
    pub total_ticks: u64,
    /// Ticks that took longer than their budget.
    pub late_ticks: u64,
    /// Shortest tick (µs).
    pub min_tick_us: u64,
    /// Longest tick (µs).
    pub max_tick_us: u64,
    /// Rolling average (µs).
    pub avg_tick_us: u64,
}

impl TickStats {
    const fn empty() -> Self {
        Self {
            total_ticks: 0,
            late_ticks: 0,
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: 0,
        }
    }
}

/// Fixed-timestep clock.
pub struct TickClock {
    tick_duration: Duration,
    last_poll: Instant,
    accumulator: Duration,
    stats: TickStats,
}

impl TickClock {
    /// Creates a clock releasing `tick_rate` ticks per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_duration = Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)));
        Self {
            tick_duration,
            last_poll: Instant::now(),
            accumulator: Duration::ZERO,
            stats: TickStats::empty(),
        }
    }

    /// Returns true if a tick is due. Call until it returns false.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_poll);
        self.last_poll = now;
        self.accumulator >= self.tick_duration
    }

    /// Consumes one tick of accumulated time; returns the tick start.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
        Instant::now()
    }

    /// Records how long the tick started at `start` took.
    pub fn end_tick(&mut self, start: Instant) {
        let elapsed = start.elapsed();
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);

        let stats = &mut self.stats;
        stats.avg_tick_us = if stats.total_ticks == 0 {
            us
        } else {
            (stats.avg_tick_us * 15 + us) / 16
        };
        stats.total_ticks += 1;
        stats.min_tick_us = stats.min_tick_us.min(us);
        stats.max_tick_us = stats.max_tick_us.max(us);
        if elapsed > self.tick_duration {
            stats.late_ticks += 1;
        }
    }

    /// Sleeps until the next tick is due.
    pub fn wait_for_next_tick(&self) {
        let since = self.last_poll.elapsed() + self.accumulator;
        if since < self.tick_duration {
            std::thread::sleep(self.tick_duration - since);
        }
    }

    /// Target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Statistics so far.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_creation() {
        let clock = TickClock::new(20);
        assert_eq!(clock.tick_duration(), Duration::from_millis(50));
        assert_eq!(clock.stats().total_ticks, 0);
    }

    #[test]
    fn test_tick_released_after_duration() {
        let mut clock = TickClock::new(1000);
        std::thread::sleep(Duration::from_millis(3));

        assert!(clock.should_tick());
        let start = clock.begin_tick();
        clock.end_tick(start);

        let stats = clock.stats();
        assert_eq!(stats.total_ticks, 1);
        assert!(stats.min_tick_us <= stats.max_tick_us);
    }
}
