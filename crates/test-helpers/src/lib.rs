//! Test helpers for elector.
//!
//! Fixtures shared by the protocol and simulation tests: network
//! construction, crash/recover shorthands, running a network to
//! quiescence and asserting that it converged.

use elector_core::{DeliveryMode, ElectionProtocol, Network, NetworkConfig};
use elector_types::NodeId;
use std::sync::Arc;

/// Upper bound on mailbox rounds before [`settle`] gives up.
pub const MAX_SETTLE_ROUNDS: usize = 1_000;

/// Build a network, panicking on an invalid config.
pub fn build_network(config: NetworkConfig, protocol: Arc<dyn ElectionProtocol>) -> Network {
    Network::new(config, protocol).expect("test network config should be valid")
}

/// Crash every listed node.
pub fn kill(network: &Network, ids: &[u64]) {
    for id in ids {
        network.set_alive(NodeId(*id), false);
    }
}

/// Revive every listed node.
pub fn revive(network: &Network, ids: &[u64]) {
    for id in ids {
        network.set_alive(NodeId(*id), true);
    }
}

/// Run the network until no election work is left.
///
/// Direct delivery runs the dispatch queue on the calling thread. Mailbox
/// delivery drains every mailbox in id order, round after round, until a
/// whole round handles nothing. Returns the number of elections run or
/// messages handled.
pub fn settle(network: &Network) -> usize {
    match network.delivery_mode() {
        DeliveryMode::Direct => network.run_until_idle(),
        DeliveryMode::Mailbox => {
            let ids: Vec<NodeId> = network.nodes().map(|n| n.id()).collect();
            let mut total = 0;
            for _ in 0..MAX_SETTLE_ROUNDS {
                let handled: usize = ids.iter().map(|id| network.drain_mailbox(*id)).sum();
                if handled == 0 {
                    return total;
                }
                total += handled;
            }
            panic!("network did not settle within {MAX_SETTLE_ROUNDS} rounds");
        }
    }
}

/// Assert every alive node agrees on `expected` and none is mid-election.
pub fn assert_converged(network: &Network, expected: NodeId) {
    assert_eq!(
        network.check_agreement(),
        Ok(Some(expected)),
        "snapshot: {:?}",
        network.snapshot()
    );
    for node in network.nodes().filter(|n| n.is_alive()) {
        assert!(
            !node.in_election(),
            "{} still electing after convergence",
            node.id()
        );
    }
}

/// Ids of the form `NodeId(n)` for every `n` in `ids`.
pub fn ids(ids: &[u64]) -> Vec<NodeId> {
    NodeId::many(ids.iter().copied())
}
