//! Core types shared by every crate of the election simulator.
//!
//! Nothing in here knows about liveness, scheduling or protocol rules. The
//! types describe *what* moves between nodes ([`Message`]), *who* the nodes
//! are ([`NodeId`]) and what an observer may read back ([`NodeSnapshot`]).

mod delivery;
mod error;
mod identifiers;
mod message;
mod snapshot;

pub use delivery::DeliveryResult;
pub use error::InvariantViolation;
pub use identifiers::NodeId;
pub use message::{Message, MessageKind};
pub use snapshot::NodeSnapshot;
