//! Ring protocol configuration.

use std::time::Duration;

/// Configuration for the ring protocol.
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// How long an initiator waits for its ELECTION to come back before
    /// sending a fresh one. A lap is lost when the node holding it crashes.
    ///
    /// This does not repair a node the COORDINATOR lap never reached. The
    /// announcement halts at the first node that already knew the winner, so
    /// a node further along the ring can keep following a dead coordinator.
    /// It recovers through its heartbeat timeout, which starts a fresh lap.
    ///
    /// `None` waits forever.
    pub lap_timeout: Option<Duration>,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            lap_timeout: Some(Duration::from_secs(1)),
        }
    }
}

impl RingConfig {
    /// Set the lap timeout.
    pub fn with_lap_timeout(mut self, timeout: Duration) -> Self {
        self.lap_timeout = Some(timeout);
        self
    }

    /// Never restart a lost lap.
    pub fn without_lap_timeout(mut self) -> Self {
        self.lap_timeout = None;
        self
    }
}
