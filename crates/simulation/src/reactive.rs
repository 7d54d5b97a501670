//! Worker pool serving counter-elections under direct delivery.

use elector_core::Network;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// A fixed pool of tokio tasks running the elections that handlers request.
///
/// Handlers never spawn: an ELECTION that calls for a counter-election only
/// queues the receiver on the network's dispatch queue, which holds at most
/// one entry per node. Workers pop from that queue, so the amount of
/// in-flight work is bounded by the pool size and the membership, however
/// many messages arrive.
///
/// Workers observe cancellation between elections, never inside one.
pub struct ReactiveRunner {
    network: Arc<Network>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    idle: Arc<Notify>,
    workers: usize,
}

impl ReactiveRunner {
    /// Spawn `workers` election workers for `network`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(network: Arc<Network>, workers: usize) -> Self {
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let work = Arc::new(Notify::new());
        let idle = Arc::new(Notify::new());

        let wake = work.clone();
        network
            .dispatch()
            .set_waker(Arc::new(move || wake.notify_one()));

        for index in 0..workers {
            tracker.spawn(worker(
                index,
                network.clone(),
                cancel.clone(),
                work.clone(),
                idle.clone(),
            ));
        }
        // Pick up anything queued before the waker was installed.
        work.notify_one();

        info!(workers, "Reactive runner started");
        Self {
            network,
            cancel,
            tracker,
            idle,
            workers,
        }
    }

    /// The network being served.
    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Token that stops every worker at its next suspension point.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait until no election is queued or running, or the runner is
    /// cancelled.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a wakeup between the check and
            // the await is not lost.
            notified.as_mut().enable();

            if self.network.dispatch().is_idle() || self.cancel.is_cancelled() {
                return;
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = self.cancel.cancelled() => return,
            }
        }
    }

    /// Cancel every worker and wait for all of them to stop.
    ///
    /// Queued elections that have not started are dropped.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        let dispatch = self.network.dispatch();
        dispatch.clear_waker();
        let dropped = dispatch.len();
        dispatch.clear();
        info!(dropped, "Reactive runner stopped");
    }
}

impl std::fmt::Debug for ReactiveRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveRunner")
            .field("workers", &self.workers)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

async fn worker(
    index: usize,
    network: Arc<Network>,
    cancel: CancellationToken,
    work: Arc<Notify>,
    idle: Arc<Notify>,
) {
    let mut ran = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = work.notified() => {}
        }

        while !cancel.is_cancelled() && network.run_next_dispatched() {
            ran += 1;
            tokio::task::yield_now().await;
        }

        if network.dispatch().is_idle() {
            idle.notify_waiters();
        }
    }
    debug!(worker = index, ran, "Election worker stopped");
}
