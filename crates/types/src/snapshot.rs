//! Read-only node views for reporting.

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observational view of a node at one instant.
///
/// Snapshots are for reports and assertions only; nothing in the protocol
/// reads them back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub alive: bool,
    pub coordinator: Option<NodeId>,
    pub in_election: bool,
}

impl NodeSnapshot {
    /// Whether this node is alive and believes it is the coordinator.
    pub fn is_coordinator(&self) -> bool {
        self.alive && self.coordinator == Some(self.id)
    }
}

impl fmt::Display for NodeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.alive { "alive" } else { "dead" };
        match self.coordinator {
            Some(leader) => write!(f, "{}: {}, coordinator={}", self.id, status, leader)?,
            None => write!(f, "{}: {}, no coordinator", self.id, status)?,
        }
        if self.is_coordinator() {
            write!(f, " [COORDINATOR]")?;
        }
        Ok(())
    }
}
