//! Virtual simulation clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Monotonic virtual clock shared by everything in one simulation.
///
/// Time only moves when the runner calls [`SimClock::advance`]; handlers
/// read it through [`Transport::now`](crate::Transport::now).
#[derive(Debug, Default)]
pub struct SimClock {
    nanos: AtomicU64,
}

impl SimClock {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }

    /// Move time forward by `by`, returning the new time.
    pub fn advance(&self, by: Duration) -> Duration {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let previous = self.nanos.fetch_add(by, Ordering::AcqRel);
        Duration::from_nanos(previous.saturating_add(by))
    }
}
