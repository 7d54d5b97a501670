//! Final state of a simulation run.

use crate::{ExecutionModel, FaultRecord};
use elector_core::Network;
use elector_types::{InvariantViolation, MessageKind, NodeId, NodeSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Delivered and dropped counts for one message kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageCount {
    pub delivered: u64,
    pub dropped: u64,
}

/// A declared election winner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderRecord {
    pub time: Duration,
    /// Node that declared the winner.
    pub announcer: NodeId,
    pub leader: NodeId,
}

/// Everything observed at the end of a run.
///
/// Taken after every task has stopped, so nothing races the snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub protocol: String,
    pub model: ExecutionModel,
    pub seed: u64,
    pub steps_run: u64,
    pub final_time: Duration,
    pub snapshot: Vec<NodeSnapshot>,
    /// Coordinator every alive node agrees on, if they agree.
    pub agreed_leader: Option<NodeId>,
    pub violations: Vec<InvariantViolation>,
    pub faults: Vec<FaultRecord>,
    pub messages: BTreeMap<MessageKind, MessageCount>,
    pub elections_started: u64,
    pub leaders: Vec<LeaderRecord>,
    /// Candidate lists of completed ring laps.
    pub laps: Vec<Vec<NodeId>>,
}

impl SimulationReport {
    /// Collect the report from a network at rest.
    pub fn collect(
        network: &Network,
        model: ExecutionModel,
        seed: u64,
        steps_run: u64,
        faults: Vec<FaultRecord>,
    ) -> Self {
        let protocol = network.protocol();

        let mut violations = Vec::new();
        let agreed_leader = match network.check_agreement() {
            Ok(leader) => leader,
            Err(violation) => {
                violations.push(violation);
                None
            }
        };
        // A ring winner can be outranked by a node that recovered after the lap.
        if protocol.forbids_lower_coordinator() {
            violations.extend(network.lower_coordinators());
        }

        let messages = network
            .stats()
            .summary()
            .into_iter()
            .map(|(kind, (delivered, dropped))| (kind, MessageCount { delivered, dropped }))
            .collect();

        let log = network.stats().log();
        let leaders = log
            .leaders
            .iter()
            .map(|(time, announcer, leader)| LeaderRecord {
                time: *time,
                announcer: *announcer,
                leader: *leader,
            })
            .collect();

        Self {
            protocol: protocol.name().to_string(),
            model,
            seed,
            steps_run,
            final_time: network.clock().now(),
            snapshot: network.snapshot(),
            agreed_leader,
            violations,
            faults,
            messages,
            elections_started: network.elections_started(),
            leaders,
            laps: log.laps,
        }
    }

    /// Whether every alive node agrees on a coordinator and no invariant broke.
    pub fn is_converged(&self) -> bool {
        self.agreed_leader.is_some() && self.violations.is_empty()
    }

    /// Ids alive at the end of the run.
    pub fn alive(&self) -> Vec<NodeId> {
        self.snapshot.iter().filter(|s| s.alive).map(|s| s.id).collect()
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({:?}) seed={} steps={} time={:?}",
            self.protocol, self.model, self.seed, self.steps_run, self.final_time
        )?;
        for node in &self.snapshot {
            writeln!(f, "  {node}")?;
        }
        match self.agreed_leader {
            Some(leader) => writeln!(f, "agreed leader: {leader}")?,
            None => writeln!(f, "agreed leader: none")?,
        }
        writeln!(
            f,
            "elections started: {}, faults: {}",
            self.elections_started,
            self.faults.len()
        )?;
        for (kind, count) in &self.messages {
            writeln!(
                f,
                "  {kind:<12} delivered={:<6} dropped={}",
                count.delivered, count.dropped
            )?;
        }
        for violation in &self.violations {
            writeln!(f, "VIOLATION: {violation}")?;
        }
        Ok(())
    }
}
