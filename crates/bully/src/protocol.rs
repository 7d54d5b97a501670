//! Bully protocol handlers.

use crate::BullyConfig;
use elector_core::{Action, ElectionProtocol, ProcessNode, Transport};
use elector_types::{Message, NodeId};
use tracing::{debug, info, warn};

/// Bully election.
///
/// Stateless apart from its configuration: per-node state (coordinator,
/// in-election flag, election start time) lives in the [`ProcessNode`].
#[derive(Debug, Clone, Default)]
pub struct BullyProtocol {
    config: BullyConfig,
}

impl BullyProtocol {
    /// Create a bully protocol with the given configuration.
    pub fn new(config: BullyConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &BullyConfig {
        &self.config
    }

    /// Declare `node` coordinator and tell every other member.
    fn become_coordinator(&self, node: &ProcessNode, transport: &dyn Transport) -> Vec<Action> {
        let id = node.id();
        node.adopt_leader(id, transport.now());
        info!(node = %id, "No higher node answered, becoming coordinator");

        let notified = transport.broadcast(id, Message::coordinator(id, id));
        debug!(node = %id, notified, "Coordinator announcement sent");

        vec![Action::LeaderElected { leader: id }]
    }

    /// ELECTION from `sender`: answer and take over if we outrank it.
    fn on_election(
        &self,
        node: &ProcessNode,
        sender: NodeId,
        transport: &dyn Transport,
    ) -> Vec<Action> {
        let id = node.id();
        if id <= sender {
            debug!(node = %id, from = %sender, "Ignoring ELECTION from higher node");
            return vec![];
        }

        let reply = transport.deliver(sender, Message::Ok { sender: id });
        debug!(node = %id, to = %sender, ?reply, "Answered ELECTION with OK");

        // Chained bullying: every node that answers runs its own election,
        // so the highest survivor is the one nobody answers.
        vec![Action::StartElection]
    }

    /// COORDINATOR for `leader`: adopt it unless we outrank it.
    fn on_coordinator(
        &self,
        node: &ProcessNode,
        leader: NodeId,
        transport: &dyn Transport,
    ) -> Vec<Action> {
        let id = node.id();
        if leader < id {
            warn!(node = %id, announced = %leader, "Rejecting lower coordinator, bullying back");
            return vec![Action::StartElection];
        }

        let previous = node.adopt_leader(leader, transport.now());
        if previous != Some(leader) {
            info!(node = %id, leader = %leader, ?previous, "Accepted new coordinator");
        } else {
            debug!(node = %id, leader = %leader, "Coordinator confirmed");
        }
        vec![]
    }
}

impl ElectionProtocol for BullyProtocol {
    fn name(&self) -> &'static str {
        "bully"
    }

    fn forbids_lower_coordinator(&self) -> bool {
        true
    }

    fn start_election(&self, node: &ProcessNode, transport: &dyn Transport) -> Vec<Action> {
        let id = node.id();
        if !node.is_alive() {
            return vec![];
        }
        if !node.begin_election(transport.now()) {
            debug!(node = %id, "Election already in progress");
            return vec![];
        }

        let higher = transport.higher_than(id);
        info!(node = %id, higher = ?higher, "Starting election");

        let mut answered = 0;
        for target in higher {
            if transport.deliver(target, Message::election(id)).is_delivered() {
                answered += 1;
            }
        }

        if answered == 0 {
            return self.become_coordinator(node, transport);
        }

        debug!(node = %id, answered, "Higher nodes reachable, waiting for COORDINATOR");
        vec![]
    }

    fn on_message(
        &self,
        node: &ProcessNode,
        message: Message,
        transport: &dyn Transport,
    ) -> Vec<Action> {
        match message {
            Message::Election { sender, .. } => self.on_election(node, sender, transport),
            Message::Ok { sender } => {
                debug!(node = %node.id(), from = %sender, "Received OK, standing down");
                vec![]
            }
            Message::Coordinator { leader, .. } => self.on_coordinator(node, leader, transport),
            Message::Heartbeat { sender } => {
                debug!(node = %node.id(), from = %sender, "Heartbeat routed to protocol, ignoring");
                vec![]
            }
        }
    }

    fn on_tick(&self, node: &ProcessNode, transport: &dyn Transport) -> Vec<Action> {
        let Some(timeout) = self.config.reelection_timeout else {
            return vec![];
        };
        let Some(waited) = node.expire_election(transport.now(), timeout) else {
            return vec![];
        };

        warn!(
            node = %node.id(),
            waited = ?waited,
            timeout = ?timeout,
            "No COORDINATOR after election, starting over"
        );
        self.start_election(node, transport)
    }
}
