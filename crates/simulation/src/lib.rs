//! Deterministic and concurrent simulation runners.
//!
//! This crate drives an [`elector_core::Network`] through discrete steps:
//! faults are injected, nodes react, leaders send heartbeats and the
//! virtual clock moves on. Two execution models share the same protocols.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Simulator                         │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  FaultInjector (ChaCha8Rng + FaultScript)          │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ crash / recover             │
//! │                           ▼                             │
//! │  ┌──────────────────────────┐ ┌───────────────────────┐ │
//! │  │ CooperativeRunner        │ │ ReactiveRunner        │ │
//! │  │ mailboxes, id order,     │ │ direct delivery,      │ │
//! │  │ one thread, replayable   │ │ tokio worker pool     │ │
//! │  └────────────┬─────────────┘ └───────────┬───────────┘ │
//! │               └──────────────┬────────────┘             │
//! │                              ▼                          │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  HeartbeatMonitor → clock advance → next step      │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! A run ends at its step budget or when its cancellation token fires;
//! either way every task is stopped before the [`SimulationReport`] is taken.

mod config;
mod cooperative;
mod faults;
mod heartbeat;
mod reactive;
mod report;
mod runner;

pub use config::{ConfigError, ExecutionModel, ProtocolChoice, SimulationConfig};
pub use cooperative::CooperativeRunner;
pub use faults::{FaultConfig, FaultEvent, FaultInjector, FaultRecord, FaultScript, RecoveryPolicy};
pub use heartbeat::{HeartbeatConfig, HeartbeatMonitor};
pub use reactive::ReactiveRunner;
pub use report::{LeaderRecord, MessageCount, SimulationReport};
pub use runner::{SimulationError, Simulator};
