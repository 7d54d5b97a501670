//! Crash and recovery injection.

use crate::ConfigError;
use elector_core::{Network, Transport};
use elector_types::NodeId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// What a recovered node does first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Start its own election right away, so a revived node never sits on
    /// a stale coordinator belief.
    #[default]
    Elect,

    /// Do nothing; the heartbeat timeout eventually catches up.
    Passive,
}

/// Random fault settings.
#[derive(Clone, Debug)]
pub struct FaultConfig {
    /// Per-step probability that an alive node crashes.
    pub p_crash: f64,

    /// Per-step probability that a dead node recovers.
    pub p_recover: f64,

    /// Behaviour of recovered nodes.
    pub recovery: RecoveryPolicy,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            p_crash: 0.02,
            p_recover: 0.01,
            recovery: RecoveryPolicy::default(),
        }
    }
}

impl FaultConfig {
    /// No random faults at all.
    pub fn none() -> Self {
        Self {
            p_crash: 0.0,
            p_recover: 0.0,
            ..Self::default()
        }
    }

    /// Set the crash probability.
    pub fn with_crash_probability(mut self, p: f64) -> Self {
        self.p_crash = p;
        self
    }

    /// Set the recovery probability.
    pub fn with_recover_probability(mut self, p: f64) -> Self {
        self.p_recover = p;
        self
    }

    /// Set the recovery policy.
    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    /// Check both probabilities lie in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("p_crash", self.p_crash), ("p_recover", self.p_recover)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }
        Ok(())
    }
}

/// A single liveness change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum FaultEvent {
    Crash(NodeId),
    Recover(NodeId),
}

impl FaultEvent {
    /// The node affected.
    pub fn node(self) -> NodeId {
        match self {
            FaultEvent::Crash(id) | FaultEvent::Recover(id) => id,
        }
    }
}

/// A fault that actually changed a node's liveness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FaultRecord {
    pub step: u64,
    pub time: Duration,
    pub event: FaultEvent,
    /// Whether it came from the script rather than a random draw.
    pub scripted: bool,
}

/// Explicit faults keyed by step number.
#[derive(Clone, Debug, Default)]
pub struct FaultScript {
    events: BTreeMap<u64, Vec<FaultEvent>>,
}

impl FaultScript {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `event` at `step`.
    pub fn at(mut self, step: u64, event: FaultEvent) -> Self {
        self.events.entry(step).or_default().push(event);
        self
    }

    /// Crash `id` at `step`.
    pub fn crash(self, step: u64, id: NodeId) -> Self {
        self.at(step, FaultEvent::Crash(id))
    }

    /// Recover `id` at `step`.
    pub fn recover(self, step: u64, id: NodeId) -> Self {
        self.at(step, FaultEvent::Recover(id))
    }

    /// Events scheduled for `step`, in insertion order.
    pub fn events_at(&self, step: u64) -> &[FaultEvent] {
        self.events.get(&step).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the script holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Applies scripted and random faults to a network, one step at a time.
///
/// The generator is injected, so a seeded [`ChaCha8Rng`] makes every run
/// replayable. Nodes are visited in ascending id order and a value is drawn
/// only for nodes whose state makes the draw relevant.
#[derive(Debug)]
pub struct FaultInjector<R = ChaCha8Rng> {
    config: FaultConfig,
    script: FaultScript,
    rng: R,
}

impl FaultInjector<ChaCha8Rng> {
    /// Create an injector driven by a ChaCha8 generator seeded with `seed`.
    pub fn seeded(config: FaultConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::new(config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> FaultInjector<R> {
    /// Create an injector with an explicit generator.
    pub fn new(config: FaultConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            script: FaultScript::default(),
            rng,
        })
    }

    /// Replace the fault script.
    pub fn with_script(mut self, script: FaultScript) -> Self {
        self.script = script;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    /// Apply step `step`: scripted events first, then one crash pass over
    /// alive nodes and one recovery pass over dead nodes.
    ///
    /// Returns the faults that changed a node's liveness.
    pub fn step(&mut self, step: u64, network: &Network) -> Vec<FaultRecord> {
        let mut applied = Vec::new();

        for event in self.script.events_at(step) {
            if let Some(record) = self.apply(step, *event, true, network) {
                applied.push(record);
            } else {
                debug!(step, ?event, "Scripted fault had no effect");
            }
        }

        let members = network.members().to_vec();
        for id in &members {
            if network.is_alive(*id) && self.rng.gen_bool(self.config.p_crash) {
                applied.extend(self.apply(step, FaultEvent::Crash(*id), false, network));
            }
        }
        for id in &members {
            if !network.is_alive(*id) && self.rng.gen_bool(self.config.p_recover) {
                applied.extend(self.apply(step, FaultEvent::Recover(*id), false, network));
            }
        }

        applied
    }

    fn apply(
        &self,
        step: u64,
        event: FaultEvent,
        scripted: bool,
        network: &Network,
    ) -> Option<FaultRecord> {
        let id = event.node();
        let recover = matches!(event, FaultEvent::Recover(_));
        if !network.set_alive(id, recover) {
            return None;
        }

        if recover && self.config.recovery == RecoveryPolicy::Elect {
            info!(node = %id, "Recovered node starting election");
            network.request_election(id);
        }

        Some(FaultRecord {
            step,
            time: network.now(),
            event,
            scripted,
        })
    }
}
