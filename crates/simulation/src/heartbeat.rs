//! Leader heartbeats and follower timeouts.

use crate::ConfigError;
use elector_core::{DeliveryMode, Network, ProcessNode, Transport};
use elector_types::{Message, NodeId};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Heartbeat settings.
#[derive(Clone, Debug)]
pub struct HeartbeatConfig {
    /// Minimum time between two heartbeats from the same leader.
    pub interval: Duration,

    /// Silence after which a follower starts its own election.
    pub timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(300),
            timeout: Duration::from_millis(1000),
        }
    }
}

impl HeartbeatConfig {
    /// Set the heartbeat interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the follower timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the interval is usable and shorter than the timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroHeartbeatInterval);
        }
        if self.timeout <= self.interval {
            return Err(ConfigError::TimeoutBelowInterval {
                interval: self.interval,
                timeout: self.timeout,
            });
        }
        Ok(())
    }
}

/// Emits leader heartbeats and decides when followers give up on a leader.
///
/// Under mailbox delivery the sender is whoever holds the network's
/// [`LeaderLease`](elector_core::LeaderLease), read and refreshed under the
/// lease lock. Under direct delivery there is no process-wide lock, so every
/// alive node that believes it leads sends its own heartbeat.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    last_sent: HashMap<NodeId, Duration>,
}

impl HeartbeatMonitor {
    /// Create a monitor.
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            last_sent: HashMap::new(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    /// Broadcast HEARTBEAT from every leader whose interval has elapsed.
    ///
    /// Dead leaders stay silent. Returns the ids that sent.
    pub fn emit(&mut self, network: &Network) -> Vec<NodeId> {
        let now = network.now();
        let leaders: Vec<NodeId> = match network.delivery_mode() {
            DeliveryMode::Mailbox => network.lease().leader.into_iter().collect(),
            DeliveryMode::Direct => network
                .nodes()
                .filter(|n| n.is_alive() && n.coordinator() == Some(n.id()))
                .map(ProcessNode::id)
                .collect(),
        };

        let mut sent = Vec::new();
        for leader in leaders {
            if !network.is_alive(leader) {
                continue;
            }
            let due = self
                .last_sent
                .get(&leader)
                .map_or(true, |at| now.saturating_sub(*at) >= self.config.interval);
            if !due {
                continue;
            }

            let reached = network.broadcast(leader, Message::Heartbeat { sender: leader });
            self.last_sent.insert(leader, now);
            if network.delivery_mode() == DeliveryMode::Mailbox {
                network.with_lease(|lease| lease.beat(leader, now));
            }
            debug!(leader = %leader, reached, "Heartbeat sent");
            sent.push(leader);
        }
        sent
    }

    /// Whether `node` should start its own election at `now`.
    ///
    /// True when no leader is known, or a follower has not heard from its
    /// leader for longer than the timeout. A node that believes it leads
    /// never times out on itself.
    pub fn is_overdue(&self, node: &ProcessNode, now: Duration) -> bool {
        if !node.is_alive() {
            return false;
        }
        let state = node.state();
        match state.coordinator {
            None => true,
            Some(leader) if leader == node.id() => false,
            Some(_) => state
                .last_heard
                .map_or(true, |at| now.saturating_sub(at) > self.config.timeout),
        }
    }

    /// Start an election on `id` if its leader went silent.
    ///
    /// Returns whether an election was requested.
    pub fn check(&self, network: &Network, id: NodeId) -> bool {
        let Some(node) = network.node(id) else {
            return false;
        };
        if !self.is_overdue(node, network.now()) {
            return false;
        }
        if !node.in_election() {
            info!(
                node = %id,
                coordinator = ?node.coordinator(),
                "Leader silent, starting election"
            );
        }
        network.request_election(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elector_bully::BullyProtocol;
    use elector_core::{InitialCoordinator, NetworkConfig};
    use elector_test_helpers::{build_network, kill, settle};
    use elector_types::MessageKind;
    use std::sync::Arc;

    fn mailbox_network(initial: InitialCoordinator) -> Network {
        let config = NetworkConfig::new(3)
            .with_delivery(DeliveryMode::Mailbox)
            .with_initial_coordinator(initial);
        build_network(config, Arc::new(BullyProtocol::default()))
    }

    #[test]
    fn test_validate() {
        assert_eq!(HeartbeatConfig::default().validate(), Ok(()));
        assert_eq!(
            HeartbeatConfig::default()
                .with_interval(Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroHeartbeatInterval)
        );
        assert!(HeartbeatConfig::default()
            .with_timeout(Duration::from_millis(300))
            .validate()
            .is_err());
    }

    #[test]
    fn test_lease_holder_sends_on_interval() {
        let network = mailbox_network(InitialCoordinator::Highest);
        let mut monitor = HeartbeatMonitor::new(HeartbeatConfig::default());

        assert_eq!(monitor.emit(&network), vec![NodeId(2)]);
        assert_eq!(network.stats().delivered(MessageKind::Heartbeat), 2);

        network.advance(Duration::from_millis(200));
        assert!(monitor.emit(&network).is_empty(), "interval not elapsed");

        network.advance(Duration::from_millis(100));
        assert_eq!(monitor.emit(&network), vec![NodeId(2)]);
        assert_eq!(network.lease().last_heartbeat, Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_dead_leader_is_silent() {
        let network = mailbox_network(InitialCoordinator::Highest);
        let mut monitor = HeartbeatMonitor::new(HeartbeatConfig::default());
        kill(&network, &[2]);
        assert!(monitor.emit(&network).is_empty());
        assert_eq!(network.stats().total_delivered(), 0);
    }

    #[test]
    fn test_heartbeats_keep_followers_fresh() {
        let network = mailbox_network(InitialCoordinator::Highest);
        let mut monitor = HeartbeatMonitor::new(HeartbeatConfig::default());

        for _ in 0..20 {
            monitor.emit(&network);
            settle(&network);
            network.advance(Duration::from_millis(100));
            for node in network.nodes() {
                assert!(!monitor.is_overdue(node, network.now()));
            }
        }
    }

    #[test]
    fn test_overdue_rules() {
        let network = mailbox_network(InitialCoordinator::Highest);
        let monitor = HeartbeatMonitor::new(HeartbeatConfig::default());
        let follower = network.node(NodeId(0)).unwrap();
        let leader = network.node(NodeId(2)).unwrap();

        network.advance(Duration::from_millis(1000));
        assert!(!monitor.is_overdue(follower, network.now()), "exactly at timeout");

        network.advance(Duration::from_millis(1));
        assert!(monitor.is_overdue(follower, network.now()));
        assert!(!monitor.is_overdue(leader, network.now()));

        let leaderless = mailbox_network(InitialCoordinator::None);
        assert!(monitor.is_overdue(leaderless.node(NodeId(1)).unwrap(), Duration::ZERO));
    }

    #[test]
    fn test_check_elects_after_silence() {
        let network = mailbox_network(InitialCoordinator::Highest);
        let monitor = HeartbeatMonitor::new(HeartbeatConfig::default());
        kill(&network, &[2]);

        assert!(!monitor.check(&network, NodeId(0)));
        network.advance(Duration::from_millis(1500));
        assert!(monitor.check(&network, NodeId(1)));
        settle(&network);

        assert_eq!(network.node(NodeId(0)).unwrap().coordinator(), Some(NodeId(1)));
        assert_eq!(network.lease().leader, Some(NodeId(1)));
    }

    #[test]
    fn test_direct_mode_every_self_believer_sends() {
        let config = NetworkConfig::new(3).with_initial_coordinator(InitialCoordinator::None);
        let network = build_network(config, Arc::new(BullyProtocol::default()));
        let mut monitor = HeartbeatMonitor::new(HeartbeatConfig::default());
        assert!(monitor.emit(&network).is_empty());

        network
            .node(NodeId(1))
            .unwrap()
            .adopt_leader(NodeId(1), Duration::ZERO);
        assert_eq!(monitor.emit(&network), vec![NodeId(1)]);
        // Leaderless nodes adopt a higher leader; a higher node elects instead.
        assert_eq!(network.node(NodeId(0)).unwrap().coordinator(), Some(NodeId(1)));
        assert_eq!(network.node(NodeId(2)).unwrap().coordinator(), None);
        assert_eq!(network.dispatch().len(), 1);

        settle(&network);
        assert_eq!(network.check_agreement(), Ok(Some(NodeId(2))));
    }
}
