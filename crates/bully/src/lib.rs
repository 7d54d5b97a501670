//! Bully election.
//!
//! The highest surviving id always wins by contacting every higher peer
//! directly.
//!
//! # State machine
//!
//! ```text
//!            coordinator unreachable / heartbeat timeout /
//!            ELECTION from a lower id / lower COORDINATOR
//!   Idle ───────────────────────────────────────────────► Electing
//!    ▲                                                       │
//!    │   COORDINATOR received          no higher node answered│
//!    ├────────────────────── Waiting ◄── some higher node     │
//!    │                          │        answered             ▼
//!    │                          │ re-election timeout    Coordinator
//!    │                          └──────────► Electing         │
//!    └──────────────── broadcast COORDINATOR ◄────────────────┘
//! ```
//!
//! Everything is driven through [`ElectionProtocol`](elector_core::ElectionProtocol):
//!
//! - `start_election` → ELECTION to every higher member; self-elect if none answers
//! - `on_message(ELECTION)` from a lower id → OK back, then run an own election
//! - `on_message(COORDINATOR)` → adopt, or bully back if the announced id is lower
//! - `on_tick` → restart an election that waited too long for COORDINATOR

mod config;
mod protocol;

pub use config::BullyConfig;
pub use protocol::BullyProtocol;
