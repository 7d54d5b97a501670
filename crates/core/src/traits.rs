//! Core traits: the transport seam and the protocol state machine.

use crate::{Action, ProcessNode};
use elector_types::{DeliveryResult, Message, NodeId};
use std::collections::HashSet;
use std::time::Duration;

/// Message transport and membership view.
///
/// The transport is the single source of truth for who exists and who is
/// alive. Delivery never fails loudly: a dead or unknown target is reported
/// through [`DeliveryResult`] and the caller carries on.
pub trait Transport: Send + Sync {
    /// Hand `message` to `target` if it exists and is alive.
    fn deliver(&self, target: NodeId, message: Message) -> DeliveryResult;

    /// All member ids, ascending.
    fn members(&self) -> &[NodeId];

    /// Whether `id` exists and is alive.
    fn is_alive(&self, id: NodeId) -> bool;

    /// Ring successor of `id`, regardless of liveness.
    fn successor(&self, id: NodeId) -> Option<NodeId>;

    /// Current virtual time.
    fn now(&self) -> Duration;

    // Derived methods

    /// Nearest alive node following `id` on the ring.
    ///
    /// Dead nodes are skipped, not removed. The walk is bounded by a visited
    /// set, so it terminates with `None` when nothing on the cycle is alive.
    /// When `id` is the only survivor the walk comes back to `id` itself.
    fn next_alive(&self, id: NodeId) -> Option<NodeId> {
        let mut visited = HashSet::new();
        let mut next = self.successor(id);
        while let Some(candidate) = next {
            if !visited.insert(candidate) {
                return None;
            }
            if self.is_alive(candidate) {
                return Some(candidate);
            }
            next = self.successor(candidate);
        }
        None
    }

    /// Members with a higher id than `id`, ascending.
    fn higher_than(&self, id: NodeId) -> Vec<NodeId> {
        self.members().iter().copied().filter(|m| *m > id).collect()
    }

    /// Deliver `message` to every member except `from`.
    ///
    /// Returns the number of successful deliveries.
    fn broadcast(&self, from: NodeId, message: Message) -> usize {
        let targets: Vec<NodeId> = self.members().iter().copied().filter(|m| *m != from).collect();
        targets
            .into_iter()
            .filter(|target| self.deliver(*target, message.clone()).is_delivered())
            .count()
    }
}

/// An election algorithm, expressed as handlers over [`ProcessNode`] state.
///
/// Implementations are stateless with respect to nodes: all per-node state
/// lives in the node itself, so one protocol instance serves the whole
/// network and may be called from several threads at once.
///
/// # Guarantees expected of implementations
///
/// - **Idempotent start**: `start_election` on a node already electing is a no-op
/// - **Lock discipline**: never deliver while holding the node lock
/// - **No panics** on unexpected messages; log and ignore instead
pub trait ElectionProtocol: Send + Sync {
    /// Short protocol name for logs and reports.
    fn name(&self) -> &'static str;

    /// Move `node` from idle to electing.
    fn start_election(&self, node: &ProcessNode, transport: &dyn Transport) -> Vec<Action>;

    /// Handle an inbound ELECTION, OK or COORDINATOR.
    fn on_message(
        &self,
        node: &ProcessNode,
        message: Message,
        transport: &dyn Transport,
    ) -> Vec<Action>;

    /// Periodic housekeeping (e.g. re-election timeouts).
    fn on_tick(&self, _node: &ProcessNode, _transport: &dyn Transport) -> Vec<Action> {
        vec![]
    }

    /// Whether an alive node following a lower id than its own breaks this
    /// protocol's guarantees.
    fn forbids_lower_coordinator(&self) -> bool {
        false
    }
}
