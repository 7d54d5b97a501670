//! Command-line arguments and their mapping onto a simulation config.

use clap::{Parser, ValueEnum};
use elector_bully::BullyConfig;
use elector_core::InitialCoordinator;
use elector_ring::RingConfig;
use elector_simulation::{
    ConfigError, ExecutionModel, FaultConfig, FaultEvent, FaultScript, HeartbeatConfig,
    ProtocolChoice, RecoveryPolicy, SimulationConfig,
};
use elector_types::NodeId;
use std::str::FromStr;
use thiserror::Error;

/// Election algorithm selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProtocolArg {
    Bully,
    Ring,
}

/// Execution model selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModelArg {
    /// Deterministic tick-driven mailboxes
    Cooperative,
    /// Direct delivery on a tokio worker pool
    Reactive,
}

/// Initial coordinator belief.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InitialArg {
    /// Every node starts following the highest id
    Highest,
    /// Every node starts leaderless
    None,
}

/// A `STEP:ID` pair from `--crash` or `--recover`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptedFault {
    pub step: u64,
    pub id: NodeId,
}

impl FromStr for ScriptedFault {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (step, id) = s
            .split_once(':')
            .ok_or_else(|| format!("Expected STEP:ID, got: {}", s))?;
        let step = step
            .trim()
            .parse()
            .map_err(|_| format!("Invalid step: {}", step))?;
        let id = id
            .trim()
            .parse()
            .map_err(|_| format!("Invalid node id: {}", id))?;
        Ok(Self {
            step,
            id: NodeId(id),
        })
    }
}

/// Errors turning arguments into a runnable configuration.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("scripted fault names unknown node {0}")]
    UnknownNode(NodeId),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Parser, Debug)]
#[command(name = "elector-sim")]
#[command(about = "Simulate bully and ring leader election under crash faults")]
#[command(version)]
pub struct Cli {
    /// Election algorithm
    #[arg(short, long, value_enum, default_value = "bully")]
    pub protocol: ProtocolArg,

    /// Execution model
    #[arg(short, long, value_enum, default_value = "cooperative")]
    pub model: ModelArg,

    /// Node ids (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4")]
    pub ids: Vec<u64>,

    /// Ring successor order (comma-separated, defaults to ascending ids)
    #[arg(long, value_delimiter = ',')]
    pub ring_order: Option<Vec<u64>>,

    /// Coordinator every node believes in at start
    #[arg(long, value_enum, default_value = "none")]
    pub initial: InitialArg,

    /// Number of steps to run
    #[arg(short, long, default_value = "15")]
    pub steps: u64,

    /// Virtual time per step (e.g., "100ms", "1s")
    #[arg(long, default_value = "100ms")]
    pub step: humantime::Duration,

    /// Interval between leader heartbeats
    #[arg(long, default_value = "300ms")]
    pub heartbeat_interval: humantime::Duration,

    /// Silence after which followers start an election
    #[arg(long, default_value = "1s")]
    pub heartbeat_timeout: humantime::Duration,

    /// Wait for COORDINATOR (bully) or a full lap (ring) before retrying
    /// [default: 500ms for bully, 1s for ring]
    #[arg(long, conflicts_with = "no_election_timeout")]
    pub election_timeout: Option<humantime::Duration>,

    /// Never retry a pending election
    #[arg(long)]
    pub no_election_timeout: bool,

    /// Per-step crash probability of each alive node (0.0 to 1.0)
    #[arg(long, default_value = "0.02")]
    pub p_crash: f64,

    /// Per-step recovery probability of each dead node (0.0 to 1.0)
    #[arg(long, default_value = "0.01")]
    pub p_recover: f64,

    /// Recovered nodes wait for the heartbeat timeout instead of electing
    #[arg(long)]
    pub passive_recovery: bool,

    /// Crash a node at a step (STEP:ID, repeatable)
    #[arg(long, value_name = "STEP:ID")]
    pub crash: Vec<ScriptedFault>,

    /// Recover a node at a step (STEP:ID, repeatable)
    #[arg(long, value_name = "STEP:ID")]
    pub recover: Vec<ScriptedFault>,

    /// Random seed for fault injection
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Election workers (reactive model)
    #[arg(short, long, default_value = "4")]
    pub workers: usize,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Build and validate the simulation configuration.
    pub fn to_config(&self) -> Result<SimulationConfig, CliError> {
        let ids = NodeId::many(self.ids.iter().copied());

        let protocol = match self.protocol {
            ProtocolArg::Bully => {
                let mut config = BullyConfig::default();
                if self.no_election_timeout {
                    config = config.without_reelection_timeout();
                } else if let Some(timeout) = self.election_timeout {
                    config = config.with_reelection_timeout(*timeout);
                }
                ProtocolChoice::Bully(config)
            }
            ProtocolArg::Ring => {
                let mut config = RingConfig::default();
                if self.no_election_timeout {
                    config = config.without_lap_timeout();
                } else if let Some(timeout) = self.election_timeout {
                    config = config.with_lap_timeout(*timeout);
                }
                ProtocolChoice::Ring(config)
            }
        };

        let model = match self.model {
            ModelArg::Cooperative => ExecutionModel::Cooperative,
            ModelArg::Reactive => ExecutionModel::Reactive,
        };

        let initial = match self.initial {
            InitialArg::Highest => InitialCoordinator::Highest,
            InitialArg::None => InitialCoordinator::None,
        };

        let recovery = if self.passive_recovery {
            RecoveryPolicy::Passive
        } else {
            RecoveryPolicy::Elect
        };
        let faults = FaultConfig::default()
            .with_crash_probability(self.p_crash)
            .with_recover_probability(self.p_recover)
            .with_recovery(recovery);

        let heartbeat = HeartbeatConfig::default()
            .with_interval(*self.heartbeat_interval)
            .with_timeout(*self.heartbeat_timeout);

        let mut script = FaultScript::new();
        let scripted = self
            .crash
            .iter()
            .map(|f| (f.step, FaultEvent::Crash(f.id)))
            .chain(self.recover.iter().map(|f| (f.step, FaultEvent::Recover(f.id))));
        for (step, event) in scripted {
            if !ids.contains(&event.node()) {
                return Err(CliError::UnknownNode(event.node()));
            }
            script = script.at(step, event);
        }

        let mut config = SimulationConfig::new(ids)
            .with_protocol(protocol)
            .with_model(model)
            .with_initial_coordinator(initial)
            .with_steps(self.steps)
            .with_step_duration(*self.step)
            .with_heartbeat(heartbeat)
            .with_faults(faults)
            .with_script(script)
            .with_seed(self.seed)
            .with_workers(self.workers);
        if let Some(order) = &self.ring_order {
            config = config.with_ring_order(NodeId::many(order.iter().copied()));
        }

        config.validate()?;
        Ok(config)
    }
}
