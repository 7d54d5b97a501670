//! Configuration types for a simulation run.

use crate::{FaultConfig, FaultScript, HeartbeatConfig};
use elector_bully::BullyConfig;
use elector_core::{DeliveryMode, InitialCoordinator, NetworkConfig};
use elector_ring::RingConfig;
use elector_types::NodeId;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Which election algorithm every node runs.
#[derive(Clone, Debug)]
pub enum ProtocolChoice {
    /// Bully election.
    Bully(BullyConfig),
    /// Ring election.
    Ring(RingConfig),
}

impl ProtocolChoice {
    /// Short protocol name.
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolChoice::Bully(_) => "bully",
            ProtocolChoice::Ring(_) => "ring",
        }
    }
}

impl Default for ProtocolChoice {
    fn default() -> Self {
        ProtocolChoice::Bully(BullyConfig::default())
    }
}

/// How node tasks are scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionModel {
    /// Mailboxes drained once per tick in id order. Deterministic.
    #[default]
    Cooperative,

    /// Direct delivery; counter-elections run on a tokio worker pool.
    Reactive,
}

impl ExecutionModel {
    /// Delivery mode the network must use for this model.
    pub fn delivery(self) -> DeliveryMode {
        match self {
            ExecutionModel::Cooperative => DeliveryMode::Mailbox,
            ExecutionModel::Reactive => DeliveryMode::Direct,
        }
    }
}

/// Invalid simulation settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },

    #[error("heartbeat interval must be non-zero")]
    ZeroHeartbeatInterval,

    #[error("heartbeat timeout ({timeout:?}) must exceed the interval ({interval:?})")]
    TimeoutBelowInterval {
        interval: Duration,
        timeout: Duration,
    },

    #[error("step duration must be non-zero")]
    ZeroStepDuration,

    #[error("simulation needs at least one step")]
    ZeroSteps,

    #[error("reactive model needs at least one worker")]
    ZeroWorkers,

    #[error("simulation needs at least one node")]
    NoNodes,
}

/// Configuration for a simulation run.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Member ids.
    pub ids: Vec<NodeId>,

    /// Optional explicit ring order.
    pub ring_order: Option<Vec<NodeId>>,

    /// Initial coordinator belief.
    pub initial_coordinator: InitialCoordinator,

    /// Election algorithm.
    pub protocol: ProtocolChoice,

    /// Execution model.
    pub model: ExecutionModel,

    /// Number of discrete steps to run.
    pub steps: u64,

    /// Virtual time per step.
    pub step_duration: Duration,

    /// Leader heartbeat settings.
    pub heartbeat: HeartbeatConfig,

    /// Random crash/recovery settings.
    pub faults: FaultConfig,

    /// Scripted crash/recovery events.
    pub script: FaultScript,

    /// Random seed for deterministic fault injection.
    pub seed: u64,

    /// Worker tasks serving elections (reactive model).
    pub workers: usize,
}

impl SimulationConfig {
    /// Create a configuration for the given member ids.
    pub fn new(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            ring_order: None,
            initial_coordinator: InitialCoordinator::None,
            protocol: ProtocolChoice::default(),
            model: ExecutionModel::default(),
            steps: 15,
            step_duration: Duration::from_millis(100),
            heartbeat: HeartbeatConfig::default(),
            faults: FaultConfig::default(),
            script: FaultScript::default(),
            seed: 42,
            workers: 4,
        }
    }

    /// Set the initial coordinator belief.
    pub fn with_initial_coordinator(mut self, initial: InitialCoordinator) -> Self {
        self.initial_coordinator = initial;
        self
    }

    /// Set an explicit ring order.
    pub fn with_ring_order(mut self, order: Vec<NodeId>) -> Self {
        self.ring_order = Some(order);
        self
    }

    /// Set the election algorithm.
    pub fn with_protocol(mut self, protocol: ProtocolChoice) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the execution model.
    pub fn with_model(mut self, model: ExecutionModel) -> Self {
        self.model = model;
        self
    }

    /// Set the number of steps.
    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    /// Set the virtual time per step.
    pub fn with_step_duration(mut self, step: Duration) -> Self {
        self.step_duration = step;
        self
    }

    /// Set the heartbeat configuration.
    pub fn with_heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Set the fault configuration.
    pub fn with_faults(mut self, faults: FaultConfig) -> Self {
        self.faults = faults;
        self
    }

    /// Set the fault script.
    pub fn with_script(mut self, script: FaultScript) -> Self {
        self.script = script;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of reactive workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ids.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        if self.steps == 0 {
            return Err(ConfigError::ZeroSteps);
        }
        if self.step_duration.is_zero() {
            return Err(ConfigError::ZeroStepDuration);
        }
        if self.model == ExecutionModel::Reactive && self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        self.heartbeat.validate()?;
        self.faults.validate()
    }

    /// Network configuration for this run.
    pub fn to_network_config(&self) -> NetworkConfig {
        let config = NetworkConfig::with_ids(self.ids.iter().copied())
            .with_initial_coordinator(self.initial_coordinator)
            .with_delivery(self.model.delivery());
        match &self.ring_order {
            Some(order) => config.with_ring_order(order.clone()),
            None => config,
        }
    }
}

impl Default for SimulationConfig {
    /// Four nodes `1..=4`, leaderless, bully, cooperative.
    fn default() -> Self {
        Self::new(NodeId::many([1, 2, 3, 4]))
    }
}
