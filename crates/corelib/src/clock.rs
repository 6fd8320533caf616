//! Frame pacing: accepts update ticks no faster than a minimum interval.

use std::time::{Duration, Instant};

/// Default minimum spacing between accepted ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Longest single sleep while waiting for the next tick.
pub const PACING_YIELD: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickDecision {
    Accept,
    /// Not yet due; the remaining time until the next tick.
    Wait(Duration),
}

#[derive(Clone, Debug)]
pub struct FrameClock {
    min_interval: Duration,
    last_tick: Option<Instant>,
}

impl FrameClock {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_tick: None,
        }
    }

    #[inline]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    #[inline]
    pub fn last_tick(&self) -> Option<Instant> {
        self.last_tick
    }

    /// Decide whether `now` is an accepted tick. The first poll is always accepted.
    pub fn poll(&mut self, now: Instant) -> TickDecision {
        if let Some(last) = self.last_tick {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                return TickDecision::Wait(self.min_interval - elapsed);
            }
        }
        self.last_tick = Some(now);
        TickDecision::Accept
    }

    /// Poll at the current time. When the tick is not due yet, sleep for one
    /// short slice before returning so the caller can check for input again.
    pub fn pace(&mut self) -> TickDecision {
        let decision = self.poll(Instant::now());
        if let TickDecision::Wait(remaining) = decision {
            std::thread::sleep(remaining.min(PACING_YIELD));
        }
        decision
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_poll_is_accepted() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.poll(Instant::now()), TickDecision::Accept);
        assert!(clock.last_tick().is_some());
    }

    #[test]
    fn early_poll_waits_without_advancing() {
        let mut clock = FrameClock::new(Duration::from_millis(20));
        let t0 = Instant::now();
        assert_eq!(clock.poll(t0), TickDecision::Accept);

        let early = t0 + Duration::from_millis(5);
        assert_eq!(
            clock.poll(early),
            TickDecision::Wait(Duration::from_millis(15))
        );
        assert_eq!(clock.last_tick(), Some(t0));

        let due = t0 + Duration::from_millis(20);
        assert_eq!(clock.poll(due), TickDecision::Accept);
        assert_eq!(clock.last_tick(), Some(due));
    }

    #[test]
    fn accepted_ticks_respect_minimum_interval() {
        let interval = Duration::from_millis(10);
        let mut clock = FrameClock::new(interval);
        let mut ticks = Vec::new();
        while ticks.len() < 6 {
            if clock.pace() == TickDecision::Accept {
                ticks.extend(clock.last_tick());
            }
        }
        for pair in ticks.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= interval);
        }
    }

    #[test]
    fn early_pace_sleeps_at_most_one_slice() {
        let mut clock = FrameClock::new(Duration::from_secs(10));
        assert_eq!(clock.pace(), TickDecision::Accept);
        let before = Instant::now();
        assert!(matches!(clock.pace(), TickDecision::Wait(_)));
        assert!(before.elapsed() >= PACING_YIELD);
        assert!(before.elapsed() < Duration::from_secs(1));
    }
}
