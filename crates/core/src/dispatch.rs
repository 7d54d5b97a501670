//! Bounded queue of deferred elections.

use elector_types::NodeId;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Callback invoked whenever new work is queued.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Elections waiting to run outside the handler that requested them.
///
/// A node appears at most once in the queue, so the queue never holds more
/// than one entry per member no matter how many ELECTION messages arrive.
/// The `running` count is kept under the same lock as the queue so that
/// [`DispatchQueue::is_idle`] never observes a job between "popped" and
/// "started".
#[derive(Default)]
pub struct DispatchQueue {
    inner: Mutex<QueueState>,
    waker: Mutex<Option<Waker>>,
}

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<NodeId>,
    queued: HashSet<NodeId>,
    running: usize,
}

impl DispatchQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the callback used to wake workers.
    pub fn set_waker(&self, waker: Waker) {
        *self.waker.lock() = Some(waker);
    }

    /// Remove the wake callback.
    pub fn clear_waker(&self) {
        self.waker.lock().take();
    }

    /// Queue an election for `node`.
    ///
    /// Returns `false` if one is already queued.
    pub fn push(&self, node: NodeId) -> bool {
        let pushed = {
            let mut inner = self.inner.lock();
            if inner.queued.insert(node) {
                inner.queue.push_back(node);
                true
            } else {
                false
            }
        };
        if pushed {
            let waker = self.waker.lock().clone();
            if let Some(wake) = waker {
                wake();
            }
        }
        pushed
    }

    /// Take the next queued election and mark it running.
    ///
    /// Every `Some` must be matched by a call to [`DispatchQueue::finish`].
    pub fn pop(&self) -> Option<NodeId> {
        let mut inner = self.inner.lock();
        let node = inner.queue.pop_front()?;
        inner.queued.remove(&node);
        inner.running += 1;
        Some(node)
    }

    /// Mark a popped election as finished.
    pub fn finish(&self) {
        let mut inner = self.inner.lock();
        inner.running = inner.running.saturating_sub(1);
    }

    /// Nothing queued and nothing running.
    pub fn is_idle(&self) -> bool {
        let inner = self.inner.lock();
        inner.queue.is_empty() && inner.running == 0
    }

    /// Number of queued (not yet running) elections.
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all queued elections.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.queue.clear();
        inner.queued.clear();
    }
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("inner", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_one_entry_per_node() {
        let queue = DispatchQueue::new();
        assert!(queue.push(NodeId(1)));
        assert!(queue.push(NodeId(2)));
        assert!(!queue.push(NodeId(1)));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop(), Some(NodeId(1)));
        // Once popped the node may be queued again.
        assert!(queue.push(NodeId(1)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_idle_tracks_running_jobs() {
        let queue = DispatchQueue::new();
        assert!(queue.is_idle());

        queue.push(NodeId(3));
        assert!(!queue.is_idle());

        let node = queue.pop();
        assert_eq!(node, Some(NodeId(3)));
        assert!(queue.is_empty());
        assert!(!queue.is_idle(), "popped job is still running");

        queue.finish();
        assert!(queue.is_idle());
    }

    #[test]
    fn test_waker_called_on_push() {
        let queue = DispatchQueue::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        queue.set_waker(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        queue.push(NodeId(1));
        queue.push(NodeId(1));
        queue.push(NodeId(2));
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }
}
