//! Ring election.
//!
//! A candidate list circulates the successor cycle until it comes back to a
//! node already on it; that node picks the maximum and starts the
//! COORDINATOR lap.
//!
//! # State machine
//!
//! ```text
//!                 start_election
//!   Idle ────────────────────────────► Circulating
//!    ▲     ELECTION [self] to next_alive     │
//!    │                                       │ own id found in the list
//!    │                                       ▼
//!    │                        winner = max(candidates)
//!    │                        COORDINATOR lap to next_alive
//!    └───────────────────────────────────────┘
//! ```
//!
//! Dead nodes stay on the cycle and are skipped by
//! [`Transport::next_alive`](elector_core::Transport::next_alive). A
//! COORDINATOR is forwarded only while the receiver's belief changes, so the
//! announcement stops after at most one extra lap. Nodes past the halting
//! point keep their old belief until their heartbeat timeout fires.

mod config;
mod protocol;

pub use config::RingConfig;
pub use protocol::RingProtocol;
