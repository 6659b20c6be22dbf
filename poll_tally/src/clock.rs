use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::Tick;

/// Where the registry reads the current tick from.
pub trait TickSource {
    fn current_tick(&self) -> Tick;
}

/// A tick counter advanced explicitly by its owner.
///
/// Clones share the same counter, so a test (or the host) can keep a handle
/// and move time forward while the registry holds another one.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    tick: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock::default()
    }

    pub fn starting_at(tick: Tick) -> ManualClock {
        ManualClock {
            tick: Arc::new(AtomicU64::new(tick)),
        }
    }

    /// Moves the clock forward and returns the new tick. The clock stops at
    /// `Tick::MAX`.
    pub fn advance(&self, ticks: Tick) -> Tick {
        let previous = self
            .tick
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(ticks))
            })
            .unwrap_or_else(|t| t);
        previous.saturating_add(ticks)
    }

    /// Moves the clock to `tick`. Ticks never go backwards: an earlier value
    /// leaves the clock where it is.
    pub fn set(&self, tick: Tick) -> Tick {
        self.tick.fetch_max(tick, Ordering::SeqCst).max(tick)
    }
}

impl TickSource for ManualClock {
    fn current_tick(&self) -> Tick {
        self.tick.load(Ordering::SeqCst)
    }
}
