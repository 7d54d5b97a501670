//! Simulated process.

use crate::{Action, ElectionProtocol, Transport};
use elector_types::{Message, NodeId, NodeSnapshot};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Mutable election state of a single node.
///
/// Only protocol handlers mutate this, always through [`ProcessNode::update`],
/// which holds the node-local lock for the duration of the closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeState {
    /// The node this process currently recognizes as coordinator.
    pub coordinator: Option<NodeId>,

    /// Whether this node has an election of its own in flight.
    pub in_election: bool,

    /// When the current election started (used for re-election timeouts).
    pub election_started: Option<Duration>,

    /// Time of the last accepted HEARTBEAT or COORDINATOR.
    pub last_heard: Option<Duration>,
}

/// A simulated process: identity, liveness and election state.
///
/// Nodes are created once by the [`Network`](crate::Network) and never
/// removed. Liveness is toggled from outside (fault injection); everything
/// else is mutated only by protocol handlers under the node-local lock, which
/// keeps an inbound handler and a concurrently running own-election from
/// racing on `{coordinator, in_election}`.
#[derive(Debug)]
pub struct ProcessNode {
    id: NodeId,
    alive: AtomicBool,
    state: Mutex<NodeState>,
    elections_started: AtomicU64,
}

impl ProcessNode {
    /// Create a live node with the given initial coordinator belief.
    pub fn new(id: NodeId, coordinator: Option<NodeId>) -> Self {
        Self {
            id,
            alive: AtomicBool::new(true),
            state: Mutex::new(NodeState {
                coordinator,
                last_heard: coordinator.map(|_| Duration::ZERO),
                ..NodeState::default()
            }),
            elections_started: AtomicU64::new(0),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Identity and liveness
    // ═══════════════════════════════════════════════════════════════════════

    /// Get this node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Whether the node is currently alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Crash or revive the node.
    ///
    /// Returns the previous liveness. A revived process loses its volatile
    /// election state but keeps its (possibly stale) coordinator belief, and
    /// its heartbeat timer restarts at `now`.
    pub fn set_alive(&self, alive: bool, now: Duration) -> bool {
        let was_alive = self.alive.swap(alive, Ordering::AcqRel);
        if alive && !was_alive {
            let mut state = self.state.lock();
            state.in_election = false;
            state.election_started = None;
            state.last_heard = Some(now);
        }
        was_alive
    }

    // ═══════════════════════════════════════════════════════════════════════
    // State access
    // ═══════════════════════════════════════════════════════════════════════

    /// Run `f` with exclusive access to the election state.
    ///
    /// Never deliver messages from inside `f`: delivery may call back into
    /// this node and the lock is not re-entrant.
    pub fn update<R>(&self, f: impl FnOnce(&mut NodeState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Copy of the current election state.
    pub fn state(&self) -> NodeState {
        self.state.lock().clone()
    }

    /// Currently believed coordinator.
    pub fn coordinator(&self) -> Option<NodeId> {
        self.state.lock().coordinator
    }

    /// Whether an own election is in flight.
    pub fn in_election(&self) -> bool {
        self.state.lock().in_election
    }

    /// Read-only view for reporting.
    pub fn snapshot(&self) -> NodeSnapshot {
        let state = self.state.lock();
        NodeSnapshot {
            id: self.id,
            alive: self.is_alive(),
            coordinator: state.coordinator,
            in_election: state.in_election,
        }
    }

    /// Enter the electing state.
    ///
    /// Returns `false` (and changes nothing) when an election is already in
    /// flight, which makes re-triggering idempotent.
    pub fn begin_election(&self, now: Duration) -> bool {
        let started = self.update(|state| {
            if state.in_election {
                return false;
            }
            state.in_election = true;
            state.election_started = Some(now);
            true
        });
        if started {
            self.elections_started.fetch_add(1, Ordering::Relaxed);
        }
        started
    }

    /// Number of elections this node has actually started.
    pub fn elections_started(&self) -> u64 {
        self.elections_started.load(Ordering::Relaxed)
    }

    /// Abandon an election that has been in flight for longer than `timeout`.
    ///
    /// Returns how long it had been waiting, or `None` if nothing expired.
    pub fn expire_election(&self, now: Duration, timeout: Duration) -> Option<Duration> {
        self.update(|state| {
            let waited = now.saturating_sub(state.election_started?);
            if !state.in_election || waited <= timeout {
                return None;
            }
            state.in_election = false;
            state.election_started = None;
            Some(waited)
        })
    }

    /// Accept `leader` as coordinator and leave any election.
    ///
    /// Returns the previous belief.
    pub fn adopt_leader(&self, leader: NodeId, now: Duration) -> Option<NodeId> {
        self.update(|state| {
            let previous = state.coordinator.replace(leader);
            state.in_election = false;
            state.election_started = None;
            state.last_heard = Some(now);
            previous
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inbound dispatch
    // ═══════════════════════════════════════════════════════════════════════

    /// Handle one inbound message.
    ///
    /// HEARTBEAT is protocol-agnostic and handled here; every other kind is
    /// routed to `protocol`. Dead nodes ignore everything.
    pub fn receive(
        &self,
        message: Message,
        protocol: &dyn ElectionProtocol,
        transport: &dyn Transport,
    ) -> Vec<Action> {
        if !self.is_alive() {
            return vec![];
        }

        match message {
            Message::Heartbeat { sender } => self.on_heartbeat(sender, transport.now()),
            other => protocol.on_message(self, other, transport),
        }
    }

    /// Accept a heartbeat from the believed leader, or from any higher node
    /// when no leader is known.
    fn on_heartbeat(&self, sender: NodeId, now: Duration) -> Vec<Action> {
        let id = self.id;
        self.update(|state| match state.coordinator {
            Some(leader) if leader == sender => {
                state.last_heard = Some(now);
                vec![]
            }
            None if sender > id => {
                state.coordinator = Some(sender);
                state.in_election = false;
                state.election_started = None;
                state.last_heard = Some(now);
                vec![]
            }
            None => {
                debug!(node = %id, sender = %sender, "Leaderless and outranking sender, electing");
                vec![Action::StartElection]
            }
            Some(leader) if leader == id => {
                // Someone else is leading while we think we are.
                debug!(node = %id, other = %sender, "Heard foreign leader, re-electing");
                vec![Action::StartElection]
            }
            Some(leader) => {
                debug!(
                    node = %id,
                    believed = %leader,
                    sender = %sender,
                    "Ignoring heartbeat from non-coordinator"
                );
                vec![]
            }
        })
    }
}
