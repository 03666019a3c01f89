//! FIFO hand-off queue with timed dequeue and draining shutdown.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::core::QueueError;

struct QueueState<T> {
    items: VecDeque<T>,
    /// Consumers blocked in `dequeue`.
    waiting: usize,
    shutdown: bool,
    /// Set while `shutdown` waits for consumers to leave.
    draining: bool,
}

/// Single producer/consumer queue.
///
/// Consumers block in [`dequeue`](Self::dequeue) until an item arrives, the
/// deadline passes or the queue shuts down. [`shutdown`](Self::shutdown) wakes
/// every blocked consumer and returns only once all of them have left.
pub struct BlockingQueue<T> {
    state: Mutex<QueueState<T>>,
    item_ready: Condvar,
    drained: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Create an empty, open queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                waiting: 0,
                shutdown: false,
                draining: false,
            }),
            item_ready: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    /// Append an item and wake one consumer.
    ///
    /// # Errors
    ///
    /// `QueueError::Shutdown` once the queue has been shut down.
    pub fn enqueue(&self, item: T) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Err(QueueError::Shutdown);
        }
        state.items.push_back(item);
        drop(state);

        self.item_ready.notify_one();
        Ok(())
    }

    /// Take the oldest item, waiting up to `timeout` (`Duration::ZERO` waits
    /// indefinitely). Returns `None` on timeout or shutdown.
    pub fn dequeue(&self, timeout: Duration) -> Option<T> {
        let deadline = if timeout.is_zero() {
            None
        } else {
            Instant::now().checked_add(timeout)
        };

        let mut state = self.state.lock();
        if state.shutdown {
            return None;
        }
        if let Some(item) = state.items.pop_front() {
            return Some(item);
        }

        state.waiting += 1;
        let item = loop {
            if state.shutdown {
                break None;
            }
            if let Some(item) = state.items.pop_front() {
                break Some(item);
            }
            match deadline {
                None => self.item_ready.wait(&mut state),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        break None;
                    }
                    self.item_ready.wait_until(&mut state, deadline);
                }
            }
        };
        state.waiting -= 1;

        if state.waiting == 0 && state.draining {
            self.drained.notify_all();
        }
        item
    }

    /// Reject further items, wake every blocked consumer and wait until all
    /// of them have returned.
    ///
    /// Items still queued are not delivered.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        state.draining = true;
        self.item_ready.notify_all();

        while state.waiting > 0 {
            self.drained.wait(&mut state);
        }
        state.draining = false;
        debug!(undelivered = state.items.len(), "queue shut down");
        drop(state);

        self.drained.notify_all();
    }

    /// Number of consumers blocked in `dequeue`.
    ///
    /// Waits for an in-progress shutdown drain to finish first, so the result
    /// is zero once the queue is shut down.
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        let mut state = self.state.lock();
        while state.draining {
            self.drained.wait(&mut state);
        }
        state.waiting
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether no item is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockingQueue")
            .field("len", &state.items.len())
            .field("waiting", &state.waiting)
            .field("shutdown", &state.shutdown)
            .finish()
    }
}
