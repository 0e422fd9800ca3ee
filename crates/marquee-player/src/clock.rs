//! Injectable wall-clock source.

use chrono::{Duration, Local, NaiveDateTime};

/// Supplies "now" to the player so tests can drive evaluation with
/// simulated time instead of sleeping.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

/// The real display clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock anchored at a fixed datetime that advances with the tokio
/// runtime's notion of time.
///
/// Under a paused runtime this yields a discrete-event simulation: sleeping
/// advances the wall clock and the player's timers in lockstep, so due
/// timers fire in timestamp order without real waiting.
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    base: NaiveDateTime,
    started: tokio::time::Instant,
}

impl SimulatedClock {
    /// Anchor the clock at `base`, measuring elapsed runtime time from the
    /// moment of construction.
    pub fn starting_at(base: NaiveDateTime) -> Self {
        Self {
            base,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = Duration::from_std(self.started.elapsed()).unwrap_or(Duration::zero());
        self.base + elapsed
    }
}
