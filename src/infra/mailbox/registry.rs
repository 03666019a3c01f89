//! Keyed rendezvous between producers and blocked consumers.
//!
//! A [`QueueRegistry`] maps keys to [`BlockingQueue`]s. The first consumer to
//! dequeue on a key creates its queue; the last one to leave removes it.
//! Producers can only deliver to keys that currently have a consumer, so an
//! `enqueue` against an unknown key fails with [`QueueError::NoConsumer`]
//! instead of leaving an item nobody will collect.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::core::QueueError;
use crate::infra::queue::BlockingQueue;

struct ConsumerSlot<T> {
    queue: Arc<BlockingQueue<T>>,
    consumers: usize,
}

struct RegistryState<K, T> {
    queues: HashMap<K, ConsumerSlot<T>>,
    closed: bool,
    shutdown_complete: bool,
}

/// Registry of per-key blocking queues.
///
/// Shared between producers and consumers through an `Arc`.
pub struct QueueRegistry<K, T> {
    state: Mutex<RegistryState<K, T>>,
    shutdown_done: Condvar,
}

impl<K, T> QueueRegistry<K, T>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Create an open, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                queues: HashMap::new(),
                closed: false,
                shutdown_complete: false,
            }),
            shutdown_done: Condvar::new(),
        }
    }

    /// Deliver `item` to the consumers waiting on `key`.
    ///
    /// # Errors
    ///
    /// - `QueueError::RegistryClosed` after [`shutdown`](Self::shutdown)
    /// - `QueueError::NoConsumer` if nobody is waiting on `key`
    /// - `QueueError::Shutdown` if the key's queue is shutting down
    pub fn enqueue(&self, key: &K, item: T) -> Result<(), QueueError> {
        let state = self.state.lock();
        if state.closed {
            return Err(QueueError::RegistryClosed);
        }
        let Some(slot) = state.queues.get(key) else {
            warn!(key = ?key, "no consumer waiting, rejecting item");
            return Err(QueueError::NoConsumer(format!("{key:?}")));
        };
        slot.queue.enqueue(item)?;
        debug!(key = ?key, "enqueued item");
        Ok(())
    }

    /// Wait up to `timeout` for an item on `key` (`Duration::ZERO` waits
    /// indefinitely). Returns `None` on timeout or shutdown.
    pub fn dequeue(&self, key: K, timeout: Duration) -> Option<T> {
        let queue = {
            let mut state = self.state.lock();
            if state.closed {
                return None;
            }
            let slot = state.queues.entry(key.clone()).or_insert_with(|| {
                debug!(key = ?key, "creating queue for first consumer");
                ConsumerSlot {
                    queue: Arc::new(BlockingQueue::new()),
                    consumers: 0,
                }
            });
            slot.consumers += 1;
            Arc::clone(&slot.queue)
        };

        let item = queue.dequeue(timeout);
        self.detach(&key, &queue);
        item
    }

    /// [`dequeue`](Self::dequeue) without a deadline.
    pub fn dequeue_blocking(&self, key: K) -> Option<T> {
        self.dequeue(key, Duration::ZERO)
    }

    fn detach(&self, key: &K, queue: &Arc<BlockingQueue<T>>) {
        let mut state = self.state.lock();
        let Some(slot) = state.queues.get_mut(key) else {
            return;
        };
        if !Arc::ptr_eq(&slot.queue, queue) {
            return;
        }

        slot.consumers -= 1;
        if slot.consumers == 0 {
            if let Some(slot) = state.queues.remove(key) {
                let undelivered = slot.queue.len();
                if undelivered > 0 {
                    warn!(key = ?key, undelivered, "removing queue with undelivered items");
                } else {
                    debug!(key = ?key, "removed queue after last consumer left");
                }
            }
        }
    }

    /// Close the registry and shut down every queue.
    ///
    /// Blocked consumers return `None`. Queues are drained outside the
    /// registry lock, so consumers can detach while this runs. A second call
    /// waits for the first to finish.
    pub fn shutdown(&self) {
        let queues: Vec<Arc<BlockingQueue<T>>> = {
            let mut state = self.state.lock();
            if state.closed {
                drop(state);
                self.wait_for_shutdown();
                return;
            }
            state.closed = true;
            state
                .queues
                .values()
                .map(|slot| Arc::clone(&slot.queue))
                .collect()
        };

        info!(queues = queues.len(), "shutting down queue registry");
        for queue in &queues {
            queue.shutdown();
        }

        self.state.lock().shutdown_complete = true;
        self.shutdown_done.notify_all();
        info!("queue registry shut down");
    }

    /// Block until [`shutdown`](Self::shutdown) has completed.
    pub fn wait_for_shutdown(&self) {
        let mut state = self.state.lock();
        while !state.shutdown_complete {
            self.shutdown_done.wait(&mut state);
        }
    }

    /// Whether the registry no longer accepts work.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of live queues.
    #[must_use]
    pub fn queue_count(&self) -> usize {
        self.state.lock().queues.len()
    }

    /// Consumers attached to `key`.
    #[must_use]
    pub fn consumer_count(&self, key: &K) -> usize {
        self.state
            .lock()
            .queues
            .get(key)
            .map_or(0, |slot| slot.consumers)
    }
}

impl<K, T> Default for QueueRegistry<K, T>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> fmt::Debug for QueueRegistry<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("QueueRegistry")
            .field("queues", &state.queues.len())
            .field("closed", &state.closed)
            .finish()
    }
}
