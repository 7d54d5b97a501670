//! Ring protocol handlers.

use crate::RingConfig;
use elector_core::{Action, ElectionProtocol, ProcessNode, Transport};
use elector_types::{Message, NodeId};
use tracing::{debug, info, warn};

/// Ring election over the network's successor cycle.
#[derive(Debug, Clone, Default)]
pub struct RingProtocol {
    config: RingConfig,
}

impl RingProtocol {
    /// Create a ring protocol with the given configuration.
    pub fn new(config: RingConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Address `message` to the next alive node after `from`.
    ///
    /// Returns nothing when the whole cycle is dead, dropping the message.
    fn forward(&self, from: NodeId, message: Message, transport: &dyn Transport) -> Option<Action> {
        let Some(to) = transport.next_alive(from) else {
            warn!(node = %from, kind = %message.kind(), "No alive successor, message dropped");
            return None;
        };
        Some(Action::Forward { to, message })
    }

    /// ELECTION carrying `candidates`.
    fn on_election(
        &self,
        node: &ProcessNode,
        mut candidates: Vec<NodeId>,
        transport: &dyn Transport,
    ) -> Vec<Action> {
        let id = node.id();

        if !candidates.contains(&id) {
            candidates.push(id);
            debug!(node = %id, candidates = ?candidates, "Forwarding ELECTION");
            return self
                .forward(id, Message::ring_election(id, candidates), transport)
                .into_iter()
                .collect();
        }

        // Full lap: the list holds every node reachable when it left.
        let Some(winner) = candidates.iter().copied().max() else {
            return vec![];
        };
        node.adopt_leader(winner, transport.now());
        info!(
            node = %id,
            winner = %winner,
            candidates = ?candidates,
            "Lap completed, announcing coordinator"
        );
        let mut actions = vec![
            Action::LapCompleted { candidates },
            Action::LeaderElected { leader: winner },
        ];
        actions.extend(self.forward(id, Message::coordinator(id, winner), transport));
        actions
    }

    /// COORDINATOR for `leader`: adopt and pass it on unless already known.
    fn on_coordinator(
        &self,
        node: &ProcessNode,
        leader: NodeId,
        transport: &dyn Transport,
    ) -> Vec<Action> {
        let id = node.id();
        let previous = node.adopt_leader(leader, transport.now());
        if previous == Some(leader) {
            debug!(node = %id, leader = %leader, "Coordinator already known, lap ends");
            return vec![];
        }

        info!(node = %id, leader = %leader, ?previous, "Accepted new coordinator");
        self.forward(id, Message::coordinator(id, leader), transport)
            .into_iter()
            .collect()
    }
}

impl ElectionProtocol for RingProtocol {
    fn name(&self) -> &'static str {
        "ring"
    }

    fn start_election(&self, node: &ProcessNode, transport: &dyn Transport) -> Vec<Action> {
        let id = node.id();
        if !node.is_alive() {
            return vec![];
        }
        if !node.begin_election(transport.now()) {
            debug!(node = %id, "Election already circulating");
            return vec![];
        }

        info!(node = %id, "Starting ring election");
        self.forward(id, Message::ring_election(id, vec![id]), transport)
            .into_iter()
            .collect()
    }

    fn on_message(
        &self,
        node: &ProcessNode,
        message: Message,
        transport: &dyn Transport,
    ) -> Vec<Action> {
        match message {
            Message::Election {
                candidates: Some(candidates),
                ..
            } => self.on_election(node, candidates, transport),
            Message::Election {
                sender,
                candidates: None,
            } => {
                warn!(node = %node.id(), from = %sender, "ELECTION without candidate list, ignoring");
                vec![]
            }
            Message::Coordinator { leader, .. } => self.on_coordinator(node, leader, transport),
            Message::Ok { sender } | Message::Heartbeat { sender } => {
                debug!(node = %node.id(), from = %sender, "Unexpected message for ring, ignoring");
                vec![]
            }
        }
    }

    fn on_tick(&self, node: &ProcessNode, transport: &dyn Transport) -> Vec<Action> {
        let Some(timeout) = self.config.lap_timeout else {
            return vec![];
        };
        let Some(waited) = node.expire_election(transport.now(), timeout) else {
            return vec![];
        };

        warn!(node = %node.id(), waited = ?waited, "ELECTION lap lost, sending a new one");
        self.start_election(node, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elector_core::{DeliveryMode, InitialCoordinator, NetworkConfig};
    use elector_test_helpers::{assert_converged, build_network, ids, kill, revive, settle};
    use elector_types::MessageKind;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn ring() -> Arc<RingProtocol> {
        Arc::new(RingProtocol::default())
    }

    #[traced_test]
    #[test]
    fn test_lap_skips_dead_node() {
        for delivery in [DeliveryMode::Direct, DeliveryMode::Mailbox] {
            let network = build_network(NetworkConfig::new(5).with_delivery(delivery), ring());

            kill(&network, &[3]);
            network.trigger_election(NodeId(0));
            settle(&network);

            assert_eq!(network.stats().log().laps, vec![ids(&[0, 1, 2, 4])]);
            assert_converged(&network, NodeId(4));
        }
    }

    #[traced_test]
    #[test]
    fn test_highest_wins_from_leaderless_start() {
        let config =
            NetworkConfig::new(5).with_initial_coordinator(InitialCoordinator::None);
        let network = build_network(config, ring());

        network.trigger_election(NodeId(2));
        settle(&network);

        assert_eq!(network.stats().log().laps, vec![ids(&[2, 3, 4, 0, 1])]);
        assert_converged(&network, NodeId(4));
    }

    #[traced_test]
    #[test]
    fn test_lap_length_matches_alive_nodes() {
        let network = build_network(NetworkConfig::new(6), ring());
        kill(&network, &[1, 3]);

        network.trigger_election(NodeId(4));
        settle(&network);

        let laps = network.stats().log().laps;
        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].len(), network.alive_ids().len());
        assert_converged(&network, NodeId(5));
    }

    #[test]
    fn test_large_direct_ring_converges() {
        let config = NetworkConfig::new(1000)
            .with_initial_coordinator(InitialCoordinator::None)
            .with_delivery(DeliveryMode::Direct);
        let network = build_network(config, ring());

        network.trigger_election(NodeId(0));
        settle(&network);

        let laps = network.stats().log().laps;
        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].len(), 1000);
        assert_eq!(network.stats().delivered(MessageKind::Election), 1000);
        assert_converged(&network, NodeId(999));
    }

    #[traced_test]
    #[test]
    fn test_custom_ring_order() {
        let config = NetworkConfig::new(5)
            .with_ring_order(ids(&[0, 3, 1, 4, 2]))
            .with_initial_coordinator(InitialCoordinator::None);
        let network = build_network(config, ring());

        network.trigger_election(NodeId(1));
        settle(&network);

        assert_eq!(network.stats().log().laps, vec![ids(&[1, 4, 2, 0, 3])]);
        assert_converged(&network, NodeId(4));
    }

    #[traced_test]
    #[test]
    fn test_lone_survivor_elects_itself() {
        let network = build_network(NetworkConfig::new(3), ring());
        kill(&network, &[0, 1]);

        network.trigger_election(NodeId(2));
        settle(&network);

        assert_eq!(network.stats().log().laps, vec![ids(&[2])]);
        assert_converged(&network, NodeId(2));
    }

    #[traced_test]
    #[test]
    fn test_coordinator_lap_halts_on_known_leader() {
        let config =
            NetworkConfig::new(5).with_initial_coordinator(InitialCoordinator::None);
        let network = build_network(config, ring());

        // First lap: every node learns the winner, then the initiator halts it.
        network.trigger_election(NodeId(0));
        settle(&network);
        assert_eq!(network.stats().delivered(MessageKind::Coordinator), 5);

        // Second lap: the first successor already knows and stops it.
        network.trigger_election(NodeId(0));
        settle(&network);
        assert_eq!(network.stats().delivered(MessageKind::Coordinator), 6);
        assert_converged(&network, NodeId(4));
    }

    #[traced_test]
    #[test]
    fn test_retrigger_is_idempotent() {
        let config = NetworkConfig::new(4).with_delivery(DeliveryMode::Mailbox);
        let network = build_network(config, ring());

        network.trigger_election(NodeId(0));
        network.trigger_election(NodeId(0));
        assert_eq!(network.stats().delivered(MessageKind::Election), 1);

        settle(&network);
        assert_eq!(network.stats().log().laps.len(), 1);
        assert_converged(&network, NodeId(3));
    }

    #[traced_test]
    #[test]
    fn test_lost_lap_is_restarted() {
        let config = NetworkConfig::new(4)
            .with_initial_coordinator(InitialCoordinator::None)
            .with_delivery(DeliveryMode::Mailbox);
        let protocol = Arc::new(RingProtocol::new(
            RingConfig::default().with_lap_timeout(Duration::from_millis(300)),
        ));
        let network = build_network(config, protocol);

        network.trigger_election(NodeId(0));
        // The only copy of the ELECTION dies with node 1.
        kill(&network, &[1]);
        settle(&network);
        assert!(network.node(NodeId(0)).unwrap().in_election());
        assert!(network.stats().log().laps.is_empty());

        network.advance(Duration::from_millis(400));
        network.tick_node(NodeId(0));
        settle(&network);

        assert_eq!(network.stats().log().laps, vec![ids(&[0, 2, 3])]);
        assert_converged(&network, NodeId(3));
    }

    #[traced_test]
    #[test]
    fn test_revived_highest_reclaims_leadership() {
        let network = build_network(NetworkConfig::new(5), ring());

        kill(&network, &[4]);
        network.trigger_election(NodeId(0));
        settle(&network);
        assert_converged(&network, NodeId(3));

        revive(&network, &[4]);
        network.trigger_election(NodeId(4));
        settle(&network);
        assert_converged(&network, NodeId(4));
    }

    #[test]
    fn test_bully_style_election_is_ignored() {
        let network = build_network(NetworkConfig::new(3), ring());
        network.deliver(NodeId(1), Message::election(NodeId(0)));
        settle(&network);
        assert_eq!(network.stats().delivered(MessageKind::Election), 1);
        assert!(network.stats().log().laps.is_empty());
    }
}
