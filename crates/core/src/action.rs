//! Follow-up work requested by protocol handlers.

use elector_types::{Message, NodeId};

/// Something a protocol handler asks the network to do on behalf of the
/// node that produced it.
///
/// Handlers may send messages themselves when they need the delivery result
/// (bully counts answers). Hop-by-hop traffic that would otherwise nest one
/// handler inside the next goes through [`Action::Forward`], which the
/// network delivers after the handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run this node's own election after the current handler returns.
    ///
    /// With direct delivery this goes through the bounded dispatch queue;
    /// with mailbox delivery the node's own task runs it inline.
    StartElection,

    /// This node determined the election winner.
    LeaderElected { leader: NodeId },

    /// A ring election message came back around; `candidates` is the list
    /// as it completed its lap.
    LapCompleted { candidates: Vec<NodeId> },

    /// Deliver `message` to `to` once the current handler has returned.
    ///
    /// Under direct delivery the network runs forwarded messages from a
    /// work list, so a message travelling the whole ring never stacks one
    /// handler call per hop.
    Forward { to: NodeId, message: Message },
}
