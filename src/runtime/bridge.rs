//! Tokio bridge for the blocking pool and registry calls.
//!
//! Both functions move the blocking wait onto tokio's blocking thread pool
//! with `spawn_blocking`, so the calling task yields instead of parking a
//! reactor thread.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::core::{Lease, ResourceError, ResourceFactory, ResourcePool};
use crate::infra::QueueRegistry;

/// Acquire from `pool` without blocking the async runtime.
///
/// The blocking wait keeps running if the returned future is dropped. A lease
/// it obtains after that point is dropped with the finished task, which hands
/// the slot back to the pool.
///
/// # Errors
///
/// Whatever [`ResourcePool::acquire`] returns, or `ResourceError::Internal`
/// if the blocking task was cancelled or panicked.
pub async fn acquire_async<F: ResourceFactory>(
    pool: Arc<ResourcePool<F>>,
    timeout: Duration,
) -> Result<Lease<F::Resource>, ResourceError> {
    tokio::task::spawn_blocking(move || pool.acquire(timeout))
        .await
        .map_err(|e| ResourceError::Internal(format!("acquire task failed: {e}")))?
}

/// Dequeue from `registry` without blocking the async runtime.
///
/// A panic inside the blocking call is resumed on the caller; a cancelled
/// task yields `None`.
pub async fn dequeue_async<K, T>(
    registry: Arc<QueueRegistry<K, T>>,
    key: K,
    timeout: Duration,
) -> Option<T>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(move || registry.dequeue(key, timeout)).await {
        Ok(item) => item,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            warn!(error = %e, "dequeue task cancelled");
            None
        }
    }
}
