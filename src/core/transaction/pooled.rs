//! Save contexts backed by a [`ResourcePool`].

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{ContextSource, SaveContext};
use crate::core::{ContextError, Lease, ResourceFactory, ResourcePool, TransactionalResource};

/// Context source that leases one pooled resource per cycle.
pub struct PooledContextSource<F: ResourceFactory> {
    pool: Arc<ResourcePool<F>>,
    timeout: Option<Duration>,
}

impl<F: ResourceFactory> PooledContextSource<F> {
    /// Acquire with an explicit timeout (`Duration::ZERO` waits indefinitely).
    pub const fn new(pool: Arc<ResourcePool<F>>, timeout: Duration) -> Self {
        Self {
            pool,
            timeout: Some(timeout),
        }
    }

    /// Acquire with the pool's configured maximum wait time.
    pub const fn with_default_timeout(pool: Arc<ResourcePool<F>>) -> Self {
        Self {
            pool,
            timeout: None,
        }
    }

    /// The backing pool.
    pub const fn pool(&self) -> &Arc<ResourcePool<F>> {
        &self.pool
    }
}

/// A leased resource used as a save context.
pub struct PooledContext<F: ResourceFactory> {
    lease: Lease<F::Resource>,
    invalidated: bool,
}

impl<F: ResourceFactory> PooledContext<F> {
    /// Whether the resource will be destroyed on release.
    #[must_use]
    pub const fn is_invalidated(&self) -> bool {
        self.invalidated
    }
}

impl<F: ResourceFactory> Deref for PooledContext<F> {
    type Target = F::Resource;

    fn deref(&self) -> &F::Resource {
        &self.lease
    }
}

impl<F: ResourceFactory> DerefMut for PooledContext<F> {
    fn deref_mut(&mut self) -> &mut F::Resource {
        &mut self.lease
    }
}

impl<F> SaveContext for PooledContext<F>
where
    F: ResourceFactory,
    F::Resource: TransactionalResource,
{
    fn commit(&mut self) -> Result<(), ContextError> {
        self.lease.commit().map_err(ContextError::Commit)
    }

    fn rollback(&mut self) -> Result<(), ContextError> {
        self.lease.rollback().map_err(ContextError::Rollback)
    }

    fn invalidate(&mut self) {
        self.invalidated = true;
    }
}

impl<F> ContextSource for PooledContextSource<F>
where
    F: ResourceFactory,
    F::Resource: TransactionalResource,
{
    type Context = PooledContext<F>;

    fn acquire_context(&self) -> Result<PooledContext<F>, ContextError> {
        let lease = match self.timeout {
            Some(timeout) => self.pool.acquire(timeout)?,
            None => self.pool.acquire_default()?,
        };
        debug!(pool_id = self.pool.id(), resource_id = %lease.id(), "acquired save context");
        Ok(PooledContext {
            lease,
            invalidated: false,
        })
    }

    fn release_context(&self, context: PooledContext<F>) -> Result<(), ContextError> {
        let result = if context.invalidated {
            self.pool.invalidate(context.lease)
        } else {
            self.pool.release(context.lease)
        };
        result.map_err(|e| ContextError::Release(e.to_string()))
    }
}
