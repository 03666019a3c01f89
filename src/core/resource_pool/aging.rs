//! Background task that recycles idle resources after a period of inactivity.
//!
//! The task sleeps on a control channel for one idle-cleanup interval. A
//! `Reschedule` message restarts the sleep with the current interval and a
//! `Stop` message (or a dropped sender) ends the task.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, warn};

use super::PoolShared;
use crate::core::{ResourceError, ResourceFactory};

/// Control messages for the aging thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgingSignal {
    /// The interval changed; restart the sleep.
    Reschedule,
    /// Exit the loop.
    Stop,
}

/// Handle to a running aging thread.
pub(super) struct AgingTask {
    control: Sender<AgingSignal>,
    handle: Option<JoinHandle<()>>,
}

impl AgingTask {
    pub(super) fn spawn<F: ResourceFactory>(
        shared: Arc<PoolShared<F>>,
    ) -> Result<Self, ResourceError> {
        let (control, signals) = crossbeam_channel::unbounded();
        let pool_id = shared.id;

        let handle = thread::Builder::new()
            .name(format!("pool-aging-{pool_id}"))
            .spawn(move || run(&shared, &signals))
            .map_err(|e| ResourceError::Internal(format!("failed to spawn aging thread: {e}")))?;

        Ok(Self {
            control,
            handle: Some(handle),
        })
    }

    pub(super) fn reschedule(&self) {
        let _ = self.control.send(AgingSignal::Reschedule);
    }

    /// Signal the thread to exit and wait for it.
    pub(super) fn stop(mut self) {
        let _ = self.control.send(AgingSignal::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("resource pool aging thread panicked");
            }
        }
    }
}

impl Drop for AgingTask {
    fn drop(&mut self) {
        // Non-blocking; `stop` is the joining path.
        let _ = self.control.send(AgingSignal::Stop);
    }
}

fn run<F: ResourceFactory>(shared: &PoolShared<F>, signals: &Receiver<AgingSignal>) {
    info!(
        pool_id = shared.id,
        interval_secs = shared.idle_cleanup_interval().as_secs(),
        "starting resource pool aging task"
    );

    loop {
        let interval = shared.idle_cleanup_interval();
        match signals.recv_timeout(interval) {
            Ok(AgingSignal::Reschedule) => {
                debug!(pool_id = shared.id, "aging interval changed, rescheduling");
                continue;
            }
            Ok(AgingSignal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if !shared.cleanup_required() {
            debug!(pool_id = shared.id, "pool recently used, skipping cleanup");
            continue;
        }

        match shared.cleanup_idle() {
            Ok(idle) => info!(pool_id = shared.id, idle, "recycled idle resources"),
            Err(e) => error!(pool_id = shared.id, error = %e, "idle resource cleanup failed"),
        }
    }

    info!(pool_id = shared.id, "resource pool aging task exiting");
}
