//! In-process network: node registry, ring topology and message delivery.

use crate::{
    Action, DispatchQueue, ElectionProtocol, LeaderLease, ProcessNode, SimClock, Transport,
    TransportStats,
};
use elector_types::{DeliveryResult, InvariantViolation, Message, NodeId, NodeSnapshot};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How [`Network::deliver`](Transport::deliver) hands messages to targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Call the target's handler synchronously (reactive model).
    ///
    /// Counter-elections requested by handlers go through the network's
    /// bounded [`DispatchQueue`].
    #[default]
    Direct,

    /// Append to the target's FIFO mailbox, drained once per tick by the
    /// node's own task (cooperative model).
    Mailbox,
}

/// Coordinator belief installed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitialCoordinator {
    /// Every node starts out believing the highest id leads.
    #[default]
    Highest,
    /// Every node starts leaderless and must elect.
    None,
}

/// Configuration for building a [`Network`].
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Member ids. Order is irrelevant; ids must be unique.
    pub ids: Vec<NodeId>,

    /// Ring order (each node's successor is the next entry, wrapping).
    /// Defaults to ascending id order.
    pub ring_order: Option<Vec<NodeId>>,

    /// Initial coordinator belief.
    pub initial_coordinator: InitialCoordinator,

    /// Delivery mode.
    pub delivery: DeliveryMode,
}

impl NetworkConfig {
    /// Network of `num_nodes` nodes with ids `0..num_nodes`.
    pub fn new(num_nodes: u64) -> Self {
        Self::with_ids((0..num_nodes).map(NodeId))
    }

    /// Network with explicit ids.
    pub fn with_ids(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            ring_order: None,
            initial_coordinator: InitialCoordinator::default(),
            delivery: DeliveryMode::default(),
        }
    }

    /// Set an explicit ring order.
    pub fn with_ring_order(mut self, order: Vec<NodeId>) -> Self {
        self.ring_order = Some(order);
        self
    }

    /// Set the initial coordinator belief.
    pub fn with_initial_coordinator(mut self, initial: InitialCoordinator) -> Self {
        self.initial_coordinator = initial;
        self
    }

    /// Set the delivery mode.
    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }
}

/// Errors building a [`Network`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// No member ids were given.
    #[error("network must contain at least one node")]
    Empty,

    /// The same id was given twice.
    #[error("duplicate node id {0}")]
    DuplicateId(NodeId),

    /// The ring order is not a permutation of the member ids.
    #[error("ring order must list every member exactly once")]
    RingMismatch,
}

/// The simulation context: every node, how they are wired, and the shared
/// bookkeeping of one run.
///
/// A `Network` is built per run and passed (usually as `Arc<Network>`) to
/// every component, so independent simulations never share state.
pub struct Network {
    /// Nodes keyed by id, ascending.
    nodes: IndexMap<NodeId, ProcessNode>,

    /// Member ids, ascending.
    members: Vec<NodeId>,

    /// Ring order and successor pointers over *all* nodes.
    ring_order: Vec<NodeId>,
    successors: HashMap<NodeId, NodeId>,

    protocol: Arc<dyn ElectionProtocol>,
    delivery: DeliveryMode,

    /// Inbound FIFOs (mailbox delivery only).
    mailboxes: IndexMap<NodeId, Mutex<VecDeque<Message>>>,

    /// Deferred elections (direct delivery only).
    dispatch: DispatchQueue,

    clock: SimClock,

    /// Shared "current leader / last heartbeat" pair.
    lease: Mutex<LeaderLease>,

    stats: TransportStats,
}

impl Network {
    /// Build a network running `protocol`.
    pub fn new(
        config: NetworkConfig,
        protocol: Arc<dyn ElectionProtocol>,
    ) -> Result<Self, NetworkError> {
        let mut members = config.ids;
        if members.is_empty() {
            return Err(NetworkError::Empty);
        }
        members.sort();
        if let Some(pair) = members.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(NetworkError::DuplicateId(pair[0]));
        }

        let ring_order = match config.ring_order {
            Some(order) => {
                let unique: HashSet<NodeId> = order.iter().copied().collect();
                if order.len() != members.len()
                    || unique.len() != order.len()
                    || !members.iter().all(|m| unique.contains(m))
                {
                    return Err(NetworkError::RingMismatch);
                }
                order
            }
            None => members.clone(),
        };

        let successors = ring_order
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, ring_order[(i + 1) % ring_order.len()]))
            .collect();

        let initial = match config.initial_coordinator {
            InitialCoordinator::Highest => members.last().copied(),
            InitialCoordinator::None => None,
        };

        let nodes = members
            .iter()
            .map(|id| (*id, ProcessNode::new(*id, initial)))
            .collect();
        let mailboxes = members
            .iter()
            .map(|id| (*id, Mutex::new(VecDeque::new())))
            .collect();

        let mut lease = LeaderLease::default();
        if let Some(leader) = initial {
            lease.elect(leader, Duration::ZERO);
        }

        info!(
            protocol = protocol.name(),
            nodes = members.len(),
            delivery = ?config.delivery,
            initial_coordinator = ?initial,
            "Network created"
        );

        Ok(Self {
            nodes,
            members,
            ring_order,
            successors,
            protocol,
            delivery: config.delivery,
            mailboxes,
            dispatch: DispatchQueue::new(),
            clock: SimClock::new(),
            lease: Mutex::new(lease),
            stats: TransportStats::default(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Option<&ProcessNode> {
        self.nodes.get(&id)
    }

    /// All nodes, ascending by id.
    pub fn nodes(&self) -> impl Iterator<Item = &ProcessNode> {
        self.nodes.values()
    }

    /// Ids of nodes that are currently alive.
    pub fn alive_ids(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.is_alive())
            .map(|n| n.id())
            .collect()
    }

    /// The protocol every node runs.
    pub fn protocol(&self) -> &dyn ElectionProtocol {
        self.protocol.as_ref()
    }

    /// Delivery mode.
    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery
    }

    /// Ring order over all nodes.
    pub fn ring_order(&self) -> &[NodeId] {
        &self.ring_order
    }

    /// Virtual clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Move virtual time forward.
    pub fn advance(&self, by: Duration) -> Duration {
        self.clock.advance(by)
    }

    /// Copy of the leader lease.
    pub fn lease(&self) -> LeaderLease {
        *self.lease.lock()
    }

    /// Run `f` with exclusive access to the leader lease.
    pub fn with_lease<R>(&self, f: impl FnOnce(&mut LeaderLease) -> R) -> R {
        f(&mut self.lease.lock())
    }

    /// Message counters and election log.
    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Deferred-election queue.
    pub fn dispatch(&self) -> &DispatchQueue {
        &self.dispatch
    }

    /// Total elections actually started, across all nodes.
    pub fn elections_started(&self) -> u64 {
        self.nodes.values().map(|n| n.elections_started()).sum()
    }

    /// Number of messages waiting in `id`'s mailbox.
    pub fn mailbox_len(&self, id: NodeId) -> usize {
        self.mailboxes.get(&id).map(|m| m.lock().len()).unwrap_or(0)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Node control
    // ═══════════════════════════════════════════════════════════════════════

    /// Crash (`false`) or revive (`true`) a node.
    ///
    /// Returns `false` if the id is unknown or the node was already in the
    /// requested state.
    pub fn set_alive(&self, id: NodeId, alive: bool) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        let was_alive = node.set_alive(alive, self.now());
        if was_alive == alive {
            return false;
        }
        if alive {
            info!(node = %id, "Node recovered");
        } else {
            let leading = self.lease.lock().leader == Some(id);
            info!(node = %id, leader = leading, "Node crashed");
        }
        true
    }

    /// Whether `id`'s believed coordinator exists and is alive.
    pub fn check_coordinator(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .and_then(|n| n.coordinator())
            .is_some_and(|leader| self.is_alive(leader))
    }

    /// Start `id`'s election on the calling thread.
    ///
    /// Returns `false` if the node is unknown or dead. Re-triggering a node
    /// that is already electing is accepted but has no effect.
    pub fn trigger_election(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        if !node.is_alive() {
            debug!(node = %id, "Dead node cannot start an election");
            return false;
        }
        let actions = self.protocol.start_election(node, self);
        self.apply_actions(id, actions);
        true
    }

    /// Queue `id`'s election on the dispatch queue.
    pub fn schedule_election(&self, id: NodeId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.dispatch.push(id)
    }

    /// Ask `id` to run an election the way its handlers would.
    ///
    /// Direct delivery queues it on the dispatch queue; mailbox delivery runs
    /// it inline, as the node's own task would.
    pub fn request_election(&self, id: NodeId) -> bool {
        match self.delivery {
            DeliveryMode::Direct => self.schedule_election(id),
            DeliveryMode::Mailbox => self.trigger_election(id),
        }
    }

    /// Run the next queued election, if any. Returns whether one ran.
    pub fn run_next_dispatched(&self) -> bool {
        let Some(id) = self.dispatch.pop() else {
            return false;
        };
        self.trigger_election(id);
        self.dispatch.finish();
        true
    }

    /// Run queued elections on the calling thread until the queue drains.
    ///
    /// Returns the number of elections run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next_dispatched() {
            ran += 1;
        }
        ran
    }

    /// Let the protocol run its periodic checks for `id`.
    pub fn tick_node(&self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if !node.is_alive() {
            return;
        }
        let actions = self.protocol.on_tick(node, self);
        self.apply_actions(id, actions);
    }

    /// Process every message currently queued for `id`, in FIFO order.
    ///
    /// A dead node discards its mailbox instead. Messages that arrive while
    /// draining (e.g. sent to self) are processed in the same call. Returns
    /// the number of messages handled or discarded.
    pub fn drain_mailbox(&self, id: NodeId) -> usize {
        let (Some(node), Some(mailbox)) = (self.nodes.get(&id), self.mailboxes.get(&id)) else {
            return 0;
        };

        if !node.is_alive() {
            let mut queue = mailbox.lock();
            let discarded = queue.len();
            queue.clear();
            if discarded > 0 {
                debug!(node = %id, discarded, "Dead node discarded mailbox");
            }
            return discarded;
        }

        let mut handled = 0;
        loop {
            // Release the mailbox lock before handling: handlers deliver.
            let next = mailbox.lock().pop_front();
            let Some(message) = next else {
                break;
            };
            handled += 1;
            let actions = node.receive(message, self.protocol.as_ref(), self);
            self.apply_actions(id, actions);
        }
        handled
    }

    /// Apply actions requested by `id`'s handlers.
    ///
    /// Forwarded messages are delivered from a work list and the actions
    /// their handlers return are appended to it, so a message circling the
    /// ring is handled hop after hop on a flat stack.
    fn apply_actions(&self, id: NodeId, actions: Vec<Action>) {
        let mut pending: VecDeque<(NodeId, Action)> =
            actions.into_iter().map(|action| (id, action)).collect();

        while let Some((id, action)) = pending.pop_front() {
            match action {
                Action::StartElection => {
                    self.request_election(id);
                }
                Action::LeaderElected { leader } => {
                    let now = self.now();
                    self.stats.record_leader(now, id, leader);
                    // The lease belongs to the cooperative model; direct
                    // delivery takes no process-wide lock.
                    if self.delivery == DeliveryMode::Mailbox {
                        self.lease.lock().elect(leader, now);
                    }
                }
                Action::LapCompleted { candidates } => {
                    self.stats.record_lap(candidates);
                }
                Action::Forward { to, message } => {
                    let kind = message.kind();
                    let (result, follow_up) = self.handoff(to, message);
                    if !result.is_delivered() {
                        // Successor died between lookup and delivery.
                        warn!(node = %id, to = %to, kind = %kind, ?result, "Forward failed");
                    }
                    pending.extend(follow_up.into_iter().map(|action| (to, action)));
                }
            }
        }
    }

    /// Hand `message` to `target` without applying what its handler returns.
    ///
    /// Direct delivery runs the handler now and returns its actions; mailbox
    /// delivery only enqueues.
    fn handoff(&self, target: NodeId, message: Message) -> (DeliveryResult, Vec<Action>) {
        let kind = message.kind();
        let sender = message.sender();

        let Some(node) = self.nodes.get(&target) else {
            warn!(from = %sender, to = %target, kind = %kind, "Delivery to unknown node");
            self.stats.record_delivery(kind, false);
            return (DeliveryResult::TargetUnknown, vec![]);
        };
        if !node.is_alive() {
            debug!(from = %sender, to = %target, kind = %kind, "Target dead, message dropped");
            self.stats.record_delivery(kind, false);
            return (DeliveryResult::TargetDead, vec![]);
        }

        debug!(from = %sender, to = %target, kind = %kind, "Deliver");
        self.stats.record_delivery(kind, true);

        let actions = match self.delivery {
            DeliveryMode::Direct => node.receive(message, self.protocol.as_ref(), self),
            DeliveryMode::Mailbox => {
                if let Some(mailbox) = self.mailboxes.get(&target) {
                    mailbox.lock().push_back(message);
                }
                vec![]
            }
        };
        (DeliveryResult::Delivered, actions)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Observation
    // ═══════════════════════════════════════════════════════════════════════

    /// Snapshot of every node, ascending by id.
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.nodes.values().map(ProcessNode::snapshot).collect()
    }

    /// Check that all alive nodes agree on a known coordinator.
    ///
    /// Only meaningful at quiescence. Returns the agreed belief (`None` when
    /// no node is alive or none has a coordinator).
    pub fn check_agreement(&self) -> Result<Option<NodeId>, InvariantViolation> {
        let alive: Vec<NodeSnapshot> = self
            .snapshot()
            .into_iter()
            .filter(|s| s.alive)
            .collect();

        for snapshot in &alive {
            if let Some(coordinator) = snapshot.coordinator {
                if !self.nodes.contains_key(&coordinator) {
                    return Err(InvariantViolation::UnknownCoordinator {
                        node: snapshot.id,
                        coordinator,
                    });
                }
            }
        }

        let Some(first) = alive.first() else {
            return Ok(None);
        };
        if let Some(other) = alive.iter().find(|s| s.coordinator != first.coordinator) {
            return Err(InvariantViolation::Disagreement {
                first: first.id,
                first_leader: first.coordinator,
                second: other.id,
                second_leader: other.coordinator,
            });
        }
        Ok(first.coordinator)
    }

    /// Alive nodes that believe in a coordinator with a lower id than their own.
    pub fn lower_coordinators(&self) -> Vec<InvariantViolation> {
        self.snapshot()
            .into_iter()
            .filter(|s| s.alive)
            .filter_map(|s| match s.coordinator {
                Some(coordinator) if coordinator < s.id => {
                    Some(InvariantViolation::LowerCoordinator {
                        node: s.id,
                        coordinator,
                    })
                }
                _ => None,
            })
            .collect()
    }
}

impl Transport for Network {
    fn deliver(&self, target: NodeId, message: Message) -> DeliveryResult {
        let (result, actions) = self.handoff(target, message);
        self.apply_actions(target, actions);
        result
    }

    fn members(&self) -> &[NodeId] {
        &self.members
    }

    fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(ProcessNode::is_alive)
    }

    fn successor(&self, id: NodeId) -> Option<NodeId> {
        self.successors.get(&id).copied()
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("protocol", &self.protocol.name())
            .field("delivery", &self.delivery)
            .field("members", &self.members)
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elector_types::MessageKind;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tracing_test::traced_test;

    /// Protocol that only counts what it sees.
    #[derive(Default)]
    struct Silent {
        seen: Mutex<Vec<(NodeId, Message)>>,
    }

    impl ElectionProtocol for Silent {
        fn name(&self) -> &'static str {
            "silent"
        }

        fn start_election(&self, node: &ProcessNode, transport: &dyn Transport) -> Vec<Action> {
            node.begin_election(transport.now());
            vec![]
        }

        fn on_message(
            &self,
            node: &ProcessNode,
            message: Message,
            _transport: &dyn Transport,
        ) -> Vec<Action> {
            self.seen.lock().push((node.id(), message));
            vec![]
        }
    }

    /// Protocol that passes every OK on to the ring successor until it
    /// reaches node 0.
    #[derive(Default)]
    struct Relay {
        hops: AtomicU64,
    }

    impl ElectionProtocol for Relay {
        fn name(&self) -> &'static str {
            "relay"
        }

        fn start_election(&self, _node: &ProcessNode, _transport: &dyn Transport) -> Vec<Action> {
            vec![]
        }

        fn on_message(
            &self,
            node: &ProcessNode,
            _message: Message,
            transport: &dyn Transport,
        ) -> Vec<Action> {
            self.hops.fetch_add(1, Ordering::Relaxed);
            let id = node.id();
            match transport.successor(id) {
                Some(to) if id != NodeId(0) => vec![Action::Forward {
                    to,
                    message: Message::Ok { sender: id },
                }],
                _ => vec![],
            }
        }
    }

    fn network(config: NetworkConfig) -> (Network, Arc<Silent>) {
        let protocol = Arc::new(Silent::default());
        let network = Network::new(config, protocol.clone()).unwrap();
        (network, protocol)
    }

    #[test]
    fn test_rejects_bad_configs() {
        let protocol: Arc<dyn ElectionProtocol> = Arc::new(Silent::default());
        assert_eq!(
            Network::new(NetworkConfig::with_ids(Vec::new()), protocol.clone()).err(),
            Some(NetworkError::Empty)
        );
        assert_eq!(
            Network::new(NetworkConfig::with_ids(NodeId::many([1, 2, 1])), protocol.clone())
                .err(),
            Some(NetworkError::DuplicateId(NodeId(1)))
        );
        let config = NetworkConfig::new(3).with_ring_order(NodeId::many([0, 1, 1]));
        assert_eq!(
            Network::new(config, protocol).err(),
            Some(NetworkError::RingMismatch)
        );
    }

    #[test]
    fn test_initial_coordinator_is_highest() {
        let (network, _) = network(NetworkConfig::with_ids(NodeId::many([3, 1, 7])));
        assert_eq!(network.members(), NodeId::many([1, 3, 7]).as_slice());
        assert_eq!(network.check_agreement(), Ok(Some(NodeId(7))));
        assert_eq!(network.lease().leader, Some(NodeId(7)));
    }

    #[traced_test]
    #[test]
    fn test_delivery_results() {
        let (network, protocol) = network(NetworkConfig::new(3));
        network.set_alive(NodeId(2), false);

        assert_eq!(
            network.deliver(NodeId(1), Message::election(NodeId(0))),
            DeliveryResult::Delivered
        );
        assert_eq!(
            network.deliver(NodeId(2), Message::election(NodeId(0))),
            DeliveryResult::TargetDead
        );
        assert_eq!(
            network.deliver(NodeId(9), Message::election(NodeId(0))),
            DeliveryResult::TargetUnknown
        );

        assert_eq!(protocol.seen.lock().len(), 1);
        assert_eq!(network.stats().delivered(MessageKind::Election), 1);
        assert_eq!(network.stats().dropped(MessageKind::Election), 2);
    }

    #[test]
    fn test_forwarding_runs_on_a_flat_stack() {
        let protocol = Arc::new(Relay::default());
        let network = Network::new(NetworkConfig::new(20_000), protocol.clone()).unwrap();

        assert!(network
            .deliver(NodeId(1), Message::Ok { sender: NodeId(0) })
            .is_delivered());

        // Nodes 1..=19_999 and finally node 0.
        assert_eq!(protocol.hops.load(Ordering::Relaxed), 20_000);
        assert_eq!(network.stats().delivered(MessageKind::Ok), 20_000);
    }

    #[traced_test]
    #[test]
    fn test_forward_to_dead_node_is_dropped() {
        let protocol = Arc::new(Relay::default());
        let network = Network::new(NetworkConfig::new(4), protocol.clone()).unwrap();
        network.set_alive(NodeId(3), false);

        network.deliver(NodeId(1), Message::Ok { sender: NodeId(0) });

        // 1 → 2 → 3 (dead): the forward is dropped and the walk stops.
        assert_eq!(protocol.hops.load(Ordering::Relaxed), 2);
        assert_eq!(network.stats().delivered(MessageKind::Ok), 2);
        assert_eq!(network.stats().dropped(MessageKind::Ok), 1);
        assert!(logs_contain("Forward failed"));
    }

    #[test]
    fn test_mailbox_delivery_defers_handling() {
        let (network, protocol) =
            network(NetworkConfig::new(3).with_delivery(DeliveryMode::Mailbox));

        network.deliver(NodeId(1), Message::election(NodeId(0)));
        network.deliver(NodeId(1), Message::Ok { sender: NodeId(2) });
        assert!(protocol.seen.lock().is_empty());
        assert_eq!(network.mailbox_len(NodeId(1)), 2);

        assert_eq!(network.drain_mailbox(NodeId(1)), 2);
        let seen = protocol.seen.lock();
        assert_eq!(seen[0].1, Message::election(NodeId(0)));
        assert_eq!(seen[1].1, Message::Ok { sender: NodeId(2) });
    }

    #[test]
    fn test_dead_node_discards_mailbox() {
        let (network, protocol) =
            network(NetworkConfig::new(2).with_delivery(DeliveryMode::Mailbox));
        network.deliver(NodeId(1), Message::election(NodeId(0)));
        network.set_alive(NodeId(1), false);

        assert_eq!(network.drain_mailbox(NodeId(1)), 1);
        assert_eq!(network.mailbox_len(NodeId(1)), 0);
        assert!(protocol.seen.lock().is_empty());
    }

    #[test]
    fn test_next_alive_skips_dead_nodes() {
        let (network, _) = network(NetworkConfig::new(5));
        network.set_alive(NodeId(3), false);
        assert_eq!(network.next_alive(NodeId(2)), Some(NodeId(4)));
        assert_eq!(network.next_alive(NodeId(4)), Some(NodeId(0)));

        for id in [0, 1, 2, 4] {
            network.set_alive(NodeId(id), false);
        }
        assert_eq!(network.next_alive(NodeId(0)), None);

        // A lone survivor is its own successor.
        network.set_alive(NodeId(1), true);
        assert_eq!(network.next_alive(NodeId(1)), Some(NodeId(1)));
    }

    #[test]
    fn test_custom_ring_order() {
        let config = NetworkConfig::new(4).with_ring_order(NodeId::many([0, 2, 1, 3]));
        let (network, _) = network(config);
        assert_eq!(network.successor(NodeId(0)), Some(NodeId(2)));
        assert_eq!(network.successor(NodeId(2)), Some(NodeId(1)));
        assert_eq!(network.successor(NodeId(3)), Some(NodeId(0)));
    }

    #[test]
    fn test_check_coordinator() {
        let (network, _) = network(NetworkConfig::new(3));
        assert!(network.check_coordinator(NodeId(0)));
        network.set_alive(NodeId(2), false);
        assert!(!network.check_coordinator(NodeId(0)));
    }

    #[test]
    fn test_set_alive_reports_transitions() {
        let (network, _) = network(NetworkConfig::new(2));
        assert!(!network.set_alive(NodeId(1), true), "already alive");
        assert!(network.set_alive(NodeId(1), false));
        assert!(!network.set_alive(NodeId(1), false), "already dead");
        assert!(!network.set_alive(NodeId(5), false), "unknown");
    }

    #[test]
    fn test_trigger_and_schedule_ignore_dead_nodes() {
        let (network, _) = network(NetworkConfig::new(2));
        network.set_alive(NodeId(0), false);
        assert!(!network.trigger_election(NodeId(0)));
        assert!(!network.schedule_election(NodeId(0)));
        assert!(network.schedule_election(NodeId(1)));
        assert_eq!(network.run_until_idle(), 1);
        assert!(network.node(NodeId(1)).unwrap().in_election());
    }

    #[test]
    fn test_request_election_follows_delivery_mode() {
        let (direct, _) = network(NetworkConfig::new(2));
        assert!(direct.request_election(NodeId(0)));
        assert!(!direct.node(NodeId(0)).unwrap().in_election(), "queued, not run");
        assert_eq!(direct.dispatch().len(), 1);

        let (mailbox, _) = network(NetworkConfig::new(2).with_delivery(DeliveryMode::Mailbox));
        assert!(mailbox.request_election(NodeId(0)));
        assert!(mailbox.node(NodeId(0)).unwrap().in_election());
        assert!(mailbox.dispatch().is_empty());
    }

    #[test]
    fn test_agreement_detects_disagreement() {
        let (network, _) = network(NetworkConfig::new(3));
        network
            .node(NodeId(0))
            .unwrap()
            .adopt_leader(NodeId(1), Duration::ZERO);

        assert_eq!(
            network.check_agreement(),
            Err(InvariantViolation::Disagreement {
                first: NodeId(0),
                first_leader: Some(NodeId(1)),
                second: NodeId(1),
                second_leader: Some(NodeId(2)),
            })
        );
        assert!(network.lower_coordinators().is_empty());

        network
            .node(NodeId(2))
            .unwrap()
            .adopt_leader(NodeId(1), Duration::ZERO);
        assert_eq!(
            network.lower_coordinators(),
            vec![InvariantViolation::LowerCoordinator {
                node: NodeId(2),
                coordinator: NodeId(1),
            }]
        );
    }
}
