//! Deterministic tick-driven runner over mailboxes.

use crate::{FaultInjector, FaultRecord, HeartbeatMonitor};
use elector_core::{Network, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs a mailbox network one tick at a time on the calling thread.
///
/// Each node is a task that only gets to run at its slot in the tick, so
/// tick boundaries are the only suspension points and a fixed seed replays
/// the exact same run. Per tick:
///
/// 1. scripted and random faults
/// 2. every node in id order: dead nodes discard their mailbox, alive
///    nodes drain it FIFO, check their leader's heartbeat and run the
///    protocol's periodic checks
/// 3. the leader's heartbeat
/// 4. the clock advances one step
pub struct CooperativeRunner {
    network: Arc<Network>,
    heartbeat: HeartbeatMonitor,
    faults: FaultInjector,
    step_duration: Duration,
    steps_run: u64,
    fault_log: Vec<FaultRecord>,
}

impl CooperativeRunner {
    /// Create a runner.
    pub fn new(
        network: Arc<Network>,
        heartbeat: HeartbeatMonitor,
        faults: FaultInjector,
        step_duration: Duration,
    ) -> Self {
        Self {
            network,
            heartbeat,
            faults,
            step_duration,
            steps_run: 0,
            fault_log: Vec::new(),
        }
    }

    /// The network being driven.
    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    /// Number of completed ticks.
    pub fn steps_run(&self) -> u64 {
        self.steps_run
    }

    /// Every fault applied so far.
    pub fn fault_log(&self) -> &[FaultRecord] {
        &self.fault_log
    }

    /// Consume the runner, returning the fault log.
    pub fn into_fault_log(self) -> Vec<FaultRecord> {
        self.fault_log
    }

    /// Run one tick. Returns the faults applied during it.
    pub fn step(&mut self) -> Vec<FaultRecord> {
        let step = self.steps_run;
        let network = self.network.as_ref();

        let faults = self.faults.step(step, network);

        for id in network.members().to_vec() {
            // Discards instead of handling when the node is dead.
            network.drain_mailbox(id);
            if network.is_alive(id) {
                self.heartbeat.check(network, id);
                network.tick_node(id);
            }
        }
        // Direct-delivery networks defer counter-elections; run them here.
        network.run_until_idle();

        self.heartbeat.emit(network);
        let now = network.advance(self.step_duration);

        debug!(step, now = ?now, faults = faults.len(), "Tick complete");
        self.steps_run += 1;
        self.fault_log.extend(faults.iter().cloned());
        faults
    }

    /// Run up to `steps` ticks, stopping early once `cancel` fires.
    ///
    /// Returns the number of ticks run by this call.
    pub fn run(&mut self, steps: u64, cancel: &CancellationToken) -> u64 {
        let mut ran = 0;
        while ran < steps {
            if cancel.is_cancelled() {
                info!(ran, "Cooperative run cancelled");
                break;
            }
            self.step();
            ran += 1;
        }
        ran
    }
}

impl std::fmt::Debug for CooperativeRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooperativeRunner")
            .field("network", &self.network)
            .field("steps_run", &self.steps_run)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FaultConfig, FaultScript, HeartbeatConfig};
    use elector_bully::BullyProtocol;
    use elector_core::{DeliveryMode, InitialCoordinator, NetworkConfig};
    use elector_ring::RingProtocol;
    use elector_test_helpers::{assert_converged, build_network, ids, kill, revive, settle};
    use elector_types::NodeId;
    use tracing_test::traced_test;

    fn runner(initial: InitialCoordinator, script: FaultScript) -> CooperativeRunner {
        let config = NetworkConfig::with_ids(NodeId::many([1, 2, 3, 4]))
            .with_delivery(DeliveryMode::Mailbox)
            .with_initial_coordinator(initial);
        let network = Arc::new(build_network(config, Arc::new(BullyProtocol::default())));
        let faults = FaultInjector::seeded(FaultConfig::none(), 42)
            .unwrap()
            .with_script(script);
        CooperativeRunner::new(
            network,
            HeartbeatMonitor::new(HeartbeatConfig::default()),
            faults,
            Duration::from_millis(100),
        )
    }

    #[traced_test]
    #[test]
    fn test_leaderless_start_elects_highest() {
        let mut runner = runner(InitialCoordinator::None, FaultScript::new());
        assert_eq!(runner.run(5, &CancellationToken::new()), 5);

        assert_converged(runner.network(), NodeId(4));
        assert_eq!(runner.network().lease().leader, Some(NodeId(4)));
        assert_eq!(runner.network().now(), Duration::from_millis(500));
    }

    #[traced_test]
    #[test]
    fn test_follower_timeout_replaces_dead_leader() {
        let script = FaultScript::new().crash(1, NodeId(4));
        let mut runner = runner(InitialCoordinator::Highest, script);

        runner.run(30, &CancellationToken::new());

        let network = runner.network();
        assert_converged(network, NodeId(3));
        assert_eq!(runner.fault_log().len(), 1);
        assert!(network.stats().log().leaders.iter().any(|(_, _, l)| *l == NodeId(3)));
    }

    #[traced_test]
    #[test]
    fn test_recovered_leader_takes_over_again() {
        let script = FaultScript::new()
            .crash(1, NodeId(4))
            .recover(20, NodeId(4));
        let mut runner = runner(InitialCoordinator::Highest, script);

        runner.run(30, &CancellationToken::new());
        assert_converged(runner.network(), NodeId(4));
    }

    #[traced_test]
    #[test]
    fn test_follower_past_halted_coordinator_lap_catches_up() {
        let config = NetworkConfig::new(5).with_delivery(DeliveryMode::Mailbox);
        let network = Arc::new(build_network(config, Arc::new(RingProtocol::default())));

        // P3 is dead but P0 still follows it; P4 came back believing it
        // leads; P1 has no leader; P2 already follows P4.
        kill(&network, &[3, 4]);
        revive(&network, &[4]);
        network.node(NodeId(0)).unwrap().adopt_leader(NodeId(3), Duration::ZERO);
        network.node(NodeId(1)).unwrap().update(|state| state.coordinator = None);

        network.trigger_election(NodeId(1));
        settle(&network);
        assert_eq!(network.stats().log().laps, vec![ids(&[1, 2, 4, 0])]);
        // The announcement stopped at P2 and never reached P0.
        assert_eq!(network.node(NodeId(0)).unwrap().coordinator(), Some(NodeId(3)));

        let faults = FaultInjector::seeded(FaultConfig::none(), 42).unwrap();
        let mut runner = CooperativeRunner::new(
            network.clone(),
            HeartbeatMonitor::new(HeartbeatConfig::default()),
            faults,
            Duration::from_millis(100),
        );
        runner.run(15, &CancellationToken::new());

        assert_converged(&network, NodeId(4));
        assert_eq!(network.stats().log().laps.len(), 2);
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut runner = runner(InitialCoordinator::Highest, FaultScript::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(runner.run(10, &cancel), 0);
        assert_eq!(runner.steps_run(), 0);
    }
}
