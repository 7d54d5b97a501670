//! Simulation orchestration.

use crate::{
    ConfigError, CooperativeRunner, ExecutionModel, FaultInjector, HeartbeatMonitor,
    ProtocolChoice, ReactiveRunner, SimulationConfig, SimulationReport,
};
use elector_bully::BullyProtocol;
use elector_core::{ElectionProtocol, Network, NetworkError};
use elector_ring::RingProtocol;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Errors setting up a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid network: {0}")]
    Network(#[from] NetworkError),
}

/// Drives one simulation run from a [`SimulationConfig`].
///
/// Every run builds its own [`Network`], so simulators never share state and
/// several may run side by side.
#[derive(Debug)]
pub struct Simulator {
    config: SimulationConfig,
    cancel: CancellationToken,
}

impl Simulator {
    /// Validate `config` and create a simulator.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Token that stops the run at the next step boundary.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Build a fresh network for this configuration.
    pub fn build_network(&self) -> Result<Arc<Network>, SimulationError> {
        let protocol: Arc<dyn ElectionProtocol> = match &self.config.protocol {
            ProtocolChoice::Bully(config) => Arc::new(BullyProtocol::new(config.clone())),
            ProtocolChoice::Ring(config) => Arc::new(RingProtocol::new(config.clone())),
        };
        let network = Network::new(self.config.to_network_config(), protocol)?;
        Ok(Arc::new(network))
    }

    /// Run with the configured execution model.
    pub async fn run(&self) -> Result<SimulationReport, SimulationError> {
        match self.config.model {
            ExecutionModel::Cooperative => self.run_cooperative(),
            ExecutionModel::Reactive => self.run_reactive().await,
        }
    }

    /// Run the deterministic mailbox model on the calling thread.
    pub fn run_cooperative(&self) -> Result<SimulationReport, SimulationError> {
        let config = &self.config;
        let network = self.build_network()?;
        let faults = FaultInjector::seeded(config.faults.clone(), config.seed)?
            .with_script(config.script.clone());

        info!(
            protocol = config.protocol.name(),
            nodes = config.ids.len(),
            steps = config.steps,
            seed = config.seed,
            "Starting cooperative simulation"
        );

        let mut runner = CooperativeRunner::new(
            network.clone(),
            HeartbeatMonitor::new(config.heartbeat.clone()),
            faults,
            config.step_duration,
        );
        let steps_run = runner.run(config.steps, &self.cancel);

        Ok(SimulationReport::collect(
            &network,
            ExecutionModel::Cooperative,
            config.seed,
            steps_run,
            runner.into_fault_log(),
        ))
    }

    /// Run the direct-delivery model on a tokio worker pool.
    ///
    /// Each step: faults, then every alive node checks its coordinator and
    /// heartbeat and runs the protocol's periodic checks, then the leaders
    /// send heartbeats; the step ends once no election work is left.
    pub async fn run_reactive(&self) -> Result<SimulationReport, SimulationError> {
        let config = &self.config;
        let network = self.build_network()?;
        let mut faults = FaultInjector::seeded(config.faults.clone(), config.seed)?
            .with_script(config.script.clone());
        let mut heartbeat = HeartbeatMonitor::new(config.heartbeat.clone());

        info!(
            protocol = config.protocol.name(),
            nodes = config.ids.len(),
            steps = config.steps,
            workers = config.workers,
            "Starting reactive simulation"
        );

        let runner = ReactiveRunner::start(network.clone(), config.workers);
        let mut fault_log = Vec::new();
        let mut steps_run = 0;

        for step in 0..config.steps {
            if self.cancel.is_cancelled() {
                info!(step, "Reactive run cancelled");
                break;
            }

            fault_log.extend(faults.step(step, &network));

            for id in network.alive_ids() {
                if !network.check_coordinator(id) {
                    debug!(node = %id, "Coordinator unreachable");
                    network.request_election(id);
                } else {
                    heartbeat.check(&network, id);
                }
                network.tick_node(id);
            }
            heartbeat.emit(&network);

            tokio::select! {
                _ = runner.wait_idle() => {}
                _ = self.cancel.cancelled() => {}
            }
            network.advance(config.step_duration);
            steps_run += 1;
        }

        // Stop every worker before reading the final state.
        runner.shutdown().await;

        Ok(SimulationReport::collect(
            &network,
            ExecutionModel::Reactive,
            config.seed,
            steps_run,
            fault_log,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FaultConfig, FaultScript};
    use elector_core::InitialCoordinator;
    use elector_ring::RingConfig;
    use elector_types::NodeId;
    use tracing_test::traced_test;

    #[test]
    fn test_rejects_invalid_config() {
        let config = SimulationConfig::default().with_steps(0);
        assert!(matches!(
            Simulator::new(config),
            Err(SimulationError::Config(ConfigError::ZeroSteps))
        ));
    }

    #[test]
    fn test_bad_ring_order_surfaces_network_error() {
        let config = SimulationConfig::default().with_ring_order(NodeId::many([1, 2]));
        let simulator = Simulator::new(config).unwrap();
        assert!(matches!(
            simulator.run_cooperative(),
            Err(SimulationError::Network(NetworkError::RingMismatch))
        ));
    }

    #[traced_test]
    #[test]
    fn test_cooperative_ring_without_faults() {
        let config = SimulationConfig::default()
            .with_protocol(ProtocolChoice::Ring(RingConfig::default()))
            .with_faults(FaultConfig::none())
            .with_steps(20);
        let report = Simulator::new(config).unwrap().run_cooperative().unwrap();

        assert!(report.is_converged(), "{report}");
        assert_eq!(report.agreed_leader, Some(NodeId(4)));
        assert_eq!(report.steps_run, 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reactive_run_follows_script() {
        let script = FaultScript::new().crash(3, NodeId(4));
        let config = SimulationConfig::default()
            .with_model(ExecutionModel::Reactive)
            .with_initial_coordinator(InitialCoordinator::Highest)
            .with_faults(FaultConfig::none())
            .with_script(script)
            .with_steps(10);
        let report = Simulator::new(config).unwrap().run().await.unwrap();

        assert!(report.is_converged(), "{report}");
        assert_eq!(report.agreed_leader, Some(NodeId(3)));
        assert_eq!(report.faults.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_stops_run_early() {
        let simulator = Simulator::new(
            SimulationConfig::default()
                .with_model(ExecutionModel::Reactive)
                .with_steps(1_000),
        )
        .unwrap();
        simulator.cancel_token().cancel();

        let report = simulator.run().await.unwrap();
        assert_eq!(report.steps_run, 0);
    }
}
