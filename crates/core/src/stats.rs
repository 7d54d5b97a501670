//! Transport counters and election log.

use elector_types::{MessageKind, NodeId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters collected by the network while a simulation runs.
///
/// Message counters are plain atomics so that direct (reactive) delivery
/// takes no shared lock; the election log is observational only.
#[derive(Debug, Default)]
pub struct TransportStats {
    delivered: [AtomicU64; 4],
    dropped: [AtomicU64; 4],
    log: Mutex<ElectionLog>,
}

/// Winners and ring laps, in the order they were observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElectionLog {
    /// `(time, announcer, leader)` for every declared winner.
    pub leaders: Vec<(Duration, NodeId, NodeId)>,
    /// Candidate lists of completed ring laps.
    pub laps: Vec<Vec<NodeId>>,
}

impl TransportStats {
    pub(crate) fn record_delivery(&self, kind: MessageKind, delivered: bool) {
        let counters = if delivered {
            &self.delivered
        } else {
            &self.dropped
        };
        counters[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_leader(&self, at: Duration, announcer: NodeId, leader: NodeId) {
        self.log.lock().leaders.push((at, announcer, leader));
    }

    pub(crate) fn record_lap(&self, candidates: Vec<NodeId>) {
        self.log.lock().laps.push(candidates);
    }

    /// Messages of `kind` that reached a live target.
    pub fn delivered(&self, kind: MessageKind) -> u64 {
        self.delivered[kind.index()].load(Ordering::Relaxed)
    }

    /// Messages of `kind` addressed to a dead or unknown target.
    pub fn dropped(&self, kind: MessageKind) -> u64 {
        self.dropped[kind.index()].load(Ordering::Relaxed)
    }

    /// Total messages delivered, all kinds.
    pub fn total_delivered(&self) -> u64 {
        MessageKind::ALL.iter().map(|k| self.delivered(*k)).sum()
    }

    /// Copy of the election log.
    pub fn log(&self) -> ElectionLog {
        self.log.lock().clone()
    }

    /// Per-kind `(delivered, dropped)` counts.
    pub fn summary(&self) -> BTreeMap<MessageKind, (u64, u64)> {
        MessageKind::ALL
            .iter()
            .map(|k| (*k, (self.delivered(*k), self.dropped(*k))))
            .collect()
    }
}
