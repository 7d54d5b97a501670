//! Delivery outcomes.

use serde::{Deserialize, Serialize};

/// Outcome of handing a message to the transport.
///
/// A dead or unknown target is ordinary simulation behavior, not a fault:
/// the caller inspects the value and carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryResult {
    /// The target was alive and the message was handed to it.
    Delivered,
    /// The target exists but is currently crashed.
    TargetDead,
    /// No node with that id exists.
    TargetUnknown,
}

impl DeliveryResult {
    /// Whether the message reached its target.
    ///
    /// `TargetDead` and `TargetUnknown` are indistinguishable to protocols.
    pub fn is_delivered(self) -> bool {
        matches!(self, DeliveryResult::Delivered)
    }
}
