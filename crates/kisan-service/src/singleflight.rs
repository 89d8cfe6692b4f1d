//! Per-key coalescing of concurrent fetches.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// The shared fetch task panicked or was cancelled by the runtime.
#[derive(Debug, Clone, Error)]
#[error("In-flight task failed: {0}")]
pub struct TaskFailed(String);

type SharedTask<V> = Shared<BoxFuture<'static, Result<V, TaskFailed>>>;

struct Slot<V> {
    id: u64,
    task: SharedTask<V>,
}

/// Registry of in-flight tasks keyed by `K`.
///
/// The first caller for a key spawns the work; callers arriving while it
/// runs await the same result. The work runs on its own task, so it
/// completes even when every caller is cancelled, and its slot is removed
/// as soon as it finishes.
pub struct InFlight<K, V> {
    slots: Arc<Mutex<HashMap<K, Slot<V>>>>,
    next_id: AtomicU64,
}

impl<K, V> InFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Returns the number of keys with a running task.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns true when nothing is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Runs `work` for `key`, or joins the task already running for it.
    ///
    /// Returns the result and whether this caller joined an existing task.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> (Result<V, TaskFailed>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (task, joined) = {
            let mut slots = self.slots.lock();
            if let Some(slot) = slots.get(&key) {
                (slot.task.clone(), true)
            } else {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let registry = Arc::clone(&self.slots);
                let slot_key = key.clone();
                let fut = work();

                // The slot is inserted before the lock is released, so the
                // guard always finds it. Dropping the guard also runs on panic.
                let handle = tokio::spawn(async move {
                    let _guard = SlotGuard {
                        slots: registry,
                        key: slot_key,
                        id,
                    };
                    fut.await
                });

                let task = handle
                    .map(|joined| joined.map_err(|e| TaskFailed(e.to_string())))
                    .boxed()
                    .shared();
                slots.insert(
                    key,
                    Slot {
                        id,
                        task: task.clone(),
                    },
                );
                (task, false)
            }
        };

        if joined {
            debug!("Joined in-flight task");
        }

        (task.await, joined)
    }
}

/// Removes a finished task's slot, unless a newer task already replaced it.
struct SlotGuard<K: Eq + Hash, V> {
    slots: Arc<Mutex<HashMap<K, Slot<V>>>>,
    key: K,
    id: u64,
}

impl<K: Eq + Hash, V> Drop for SlotGuard<K, V> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        if slots.get(&self.key).is_some_and(|slot| slot.id == self.id) {
            slots.remove(&self.key);
        }
    }
}

impl<K, V> Default for InFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for InFlight<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("in_flight", &self.slots.lock().len())
            .finish()
    }
}
