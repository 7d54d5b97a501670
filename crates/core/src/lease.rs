//! Process-wide leader lease.

use elector_types::NodeId;
use std::time::Duration;

/// The shared "current leader / last heartbeat" pair.
///
/// Owned by the [`Network`](crate::Network) behind a single lock. The
/// heartbeat monitor reads it to decide who broadcasts, and winners write it
/// when they are elected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeaderLease {
    pub leader: Option<NodeId>,
    pub last_heartbeat: Option<Duration>,
}

impl LeaderLease {
    /// Record a freshly elected leader.
    pub fn elect(&mut self, leader: NodeId, now: Duration) {
        self.leader = Some(leader);
        self.last_heartbeat = Some(now);
    }

    /// Refresh the heartbeat time if `leader` still holds the lease.
    ///
    /// Returns `false` when the lease moved to someone else.
    pub fn beat(&mut self, leader: NodeId, now: Duration) -> bool {
        if self.leader != Some(leader) {
            return false;
        }
        self.last_heartbeat = Some(now);
        true
    }
}
