//! Core election abstractions.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Network                              │
//! │   registry · ring successors · clock · lease · stats         │
//! │                                                              │
//! │   deliver(target, msg) ──► alive? ──► Direct:  receive now   │
//! │                               │      Mailbox: push FIFO      │
//! │                               └─► DeliveryResult             │
//! └───────────────┬──────────────────────────────┬───────────────┘
//!                 │                              │
//!                 ▼                              ▼
//!   ┌──────────────────────────┐   ┌──────────────────────────────┐
//!   │ ProcessNode::receive     │──►│ ElectionProtocol (bully/ring)│
//!   │ per-node lock, HEARTBEAT │   │ returns Vec<Action>          │
//!   └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! Protocols are written once against the [`Transport`] trait and run
//! unchanged under both execution models: direct delivery with a bounded
//! dispatch queue (reactive) and per-node mailboxes drained once per tick
//! (cooperative).

mod action;
mod clock;
mod dispatch;
mod lease;
mod network;
mod node;
mod stats;
mod traits;

pub use action::Action;
pub use clock::SimClock;
pub use dispatch::{DispatchQueue, Waker};
pub use lease::LeaderLease;
pub use network::{DeliveryMode, InitialCoordinator, Network, NetworkConfig, NetworkError};
pub use node::{NodeState, ProcessNode};
pub use stats::{ElectionLog, TransportStats};
pub use traits::{ElectionProtocol, Transport};
