//! Protocol messages exchanged between simulated nodes.

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A message between two nodes.
///
/// This is an in-process value, not a wire format. Each variant carries only
/// the payload its kind needs, so handlers match exhaustively over the four
/// kinds instead of inspecting loosely-typed tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Start (or forward) an election.
    ///
    /// `candidates` is the ordered list of ids collected so far by the ring
    /// protocol; the bully protocol sends `None`.
    Election {
        sender: NodeId,
        candidates: Option<Vec<NodeId>>,
    },

    /// Acknowledgement from a higher node: "I'm alive, stand down".
    Ok { sender: NodeId },

    /// Announcement of the elected coordinator.
    ///
    /// In the bully protocol `leader == sender`. In the ring protocol the
    /// announcement is forwarded hop by hop, so `sender` is the previous hop.
    Coordinator { sender: NodeId, leader: NodeId },

    /// Periodic liveness signal from the current leader.
    Heartbeat { sender: NodeId },
}

impl Message {
    /// Bully-style election request.
    pub fn election(sender: NodeId) -> Self {
        Message::Election {
            sender,
            candidates: None,
        }
    }

    /// Ring election carrying the candidate list.
    pub fn ring_election(sender: NodeId, candidates: Vec<NodeId>) -> Self {
        Message::Election {
            sender,
            candidates: Some(candidates),
        }
    }

    /// Coordinator announcement for `leader`, sent by `sender`.
    pub fn coordinator(sender: NodeId, leader: NodeId) -> Self {
        Message::Coordinator { sender, leader }
    }

    /// Get the node that sent this message.
    pub fn sender(&self) -> NodeId {
        match self {
            Message::Election { sender, .. }
            | Message::Ok { sender }
            | Message::Coordinator { sender, .. }
            | Message::Heartbeat { sender } => *sender,
        }
    }

    /// Get the kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Election { .. } => MessageKind::Election,
            Message::Ok { .. } => MessageKind::Ok,
            Message::Coordinator { .. } => MessageKind::Coordinator,
            Message::Heartbeat { .. } => MessageKind::Heartbeat,
        }
    }
}

/// Payload-free discriminant of [`Message`], used for counters and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageKind {
    Election,
    Ok,
    Coordinator,
    Heartbeat,
}

impl MessageKind {
    /// All kinds, in declaration order.
    pub const ALL: [MessageKind; 4] = [
        MessageKind::Election,
        MessageKind::Ok,
        MessageKind::Coordinator,
        MessageKind::Heartbeat,
    ];

    /// Get a human-readable name for this message type.
    pub fn type_name(self) -> &'static str {
        match self {
            MessageKind::Election => "ELECTION",
            MessageKind::Ok => "OK",
            MessageKind::Coordinator => "COORDINATOR",
            MessageKind::Heartbeat => "HEARTBEAT",
        }
    }

    /// Dense index for per-kind counter arrays.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
