//! Protocol invariant violations.

use crate::NodeId;
use serde::Serialize;
use thiserror::Error;

/// A broken election invariant, detected by inspecting node state.
///
/// These never abort a simulation; they are returned by agreement checks
/// and asserted on in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum InvariantViolation {
    /// Two alive nodes believe in different coordinators at quiescence.
    #[error("{first} believes {first_leader:?} but {second} believes {second_leader:?}")]
    Disagreement {
        first: NodeId,
        first_leader: Option<NodeId>,
        second: NodeId,
        second_leader: Option<NodeId>,
    },

    /// A node's coordinator names an id that is not a member of the network.
    #[error("{node} believes in unknown coordinator {coordinator}")]
    UnknownCoordinator { node: NodeId, coordinator: NodeId },

    /// An alive node accepted a coordinator with a lower id than its own.
    #[error("{node} accepted lower coordinator {coordinator}")]
    LowerCoordinator { node: NodeId, coordinator: NodeId },
}
