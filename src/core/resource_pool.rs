//! Blocking resource pool with validation, bounded growth and idle aging.
//!
//! A [`ResourcePool`] hands out interchangeable resources (database
//! connections, sockets, ...) produced by a [`ResourceFactory`]. Callers block
//! in [`ResourcePool::acquire`] until a resource is free, a new one may be
//! created under `max_size`, or the deadline passes.
//!
//! Design:
//! - One `parking_lot::Mutex` guards both collections and every counter that
//!   decides whether a caller must wait; a single `Condvar` is signalled when
//!   capacity comes back.
//! - Checked-out resources live in the caller's [`Lease`]; the pool tracks
//!   them by [`ResourceId`] so foreign or stale leases are rejected. A lease
//!   dropped without being handed back destroys its resource and frees the
//!   slot, so a cancelled caller never leaks capacity.
//! - A background aging task (see [`aging`]) trims idle resources back to the
//!   initial size when the pool has not been used for a while.

mod aging;

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::PoolConfig;
use crate::core::{ResourceError, ResourceFactory};

use aging::AgingTask;

/// Acquisition timeout used when none is configured.
pub const DEFAULT_MAX_WAIT_TIME: Duration = Duration::from_secs(60);

/// Inactivity period after which idle resources are recycled, when none is configured.
pub const DEFAULT_IDLE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a resource within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Return path from a dropped [`Lease`] to the pool that issued it.
trait LeaseReturn<R>: Send + Sync {
    fn return_dropped(&self, id: ResourceId, resource: R);
}

/// A resource checked out of a pool.
///
/// Dereferences to the resource. Hand it back with [`ResourcePool::release`],
/// or with [`ResourcePool::invalidate`] when it must not be reused. A lease
/// that is dropped instead (a cancelled future, a panic) destroys its resource
/// and frees the slot in its pool.
#[must_use = "a lease must be released or invalidated to return capacity to its pool"]
pub struct Lease<R> {
    pool_id: u64,
    id: ResourceId,
    /// `Some` until the lease is consumed by `into_parts` or dropped.
    resource: Option<R>,
    home: Weak<dyn LeaseReturn<R>>,
}

impl<R> Lease<R> {
    /// Identity of the leased resource.
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    /// Identity of the pool that issued this lease.
    pub const fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Consume the lease without running the drop path.
    fn into_parts(mut self) -> (ResourceId, R) {
        match self.resource.take() {
            Some(resource) => (self.id, resource),
            None => unreachable!("lease resource is present until the lease is consumed"),
        }
    }
}

impl<R> Deref for Lease<R> {
    type Target = R;

    fn deref(&self) -> &R {
        match &self.resource {
            Some(resource) => resource,
            None => unreachable!("lease resource is present until the lease is consumed"),
        }
    }
}

impl<R> DerefMut for Lease<R> {
    fn deref_mut(&mut self) -> &mut R {
        match &mut self.resource {
            Some(resource) => resource,
            None => unreachable!("lease resource is present until the lease is consumed"),
        }
    }
}

impl<R> Drop for Lease<R> {
    fn drop(&mut self) {
        let Some(resource) = self.resource.take() else {
            return;
        };
        if let Some(home) = self.home.upgrade() {
            home.return_dropped(self.id, resource);
        }
    }
}

impl<R> fmt::Debug for Lease<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("pool_id", &self.pool_id)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of a pool's sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Resources kept warm after aging.
    pub init_size: usize,
    /// Hard cap on checked-out resources.
    pub max_size: usize,
    /// Idle resources ready to hand out.
    pub available: usize,
    /// Resources currently checked out.
    pub acquired: usize,
    /// Default acquisition timeout in milliseconds.
    pub max_wait_ms: u64,
    /// Whether the pool is being torn down.
    pub being_destroyed: bool,
}

impl fmt::Display for PoolStatus {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pool[init-size={}, max-size={}, available={}, acquired={}, max-wait-time={} sec]",
            self.init_size,
            self.max_size,
            self.available,
            self.acquired,
            self.max_wait_ms as f64 / 1000.0
        )
    }
}

/// Lifetime counters plus current sizing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolStats {
    /// Resources created by the factory.
    pub created: u64,
    /// Resources destroyed (invalid, aged out, invalidated or torn down).
    pub destroyed: u64,
    /// Successful acquisitions.
    pub acquisitions: u64,
    /// Acquisitions that gave up at their deadline.
    pub timeouts: u64,
    /// Idle resources that failed validation.
    pub failed_validations: u64,
    /// Idle resources ready to hand out.
    pub available: usize,
    /// Resources currently checked out.
    pub acquired: usize,
    /// Hard cap on checked-out resources.
    pub max_size: usize,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
struct PoolCounters {
    created: AtomicU64,
    destroyed: AtomicU64,
    acquisitions: AtomicU64,
    timeouts: AtomicU64,
    failed_validations: AtomicU64,
}

struct IdleResource<R> {
    id: ResourceId,
    resource: R,
}

struct PoolState<R> {
    available: VecDeque<IdleResource<R>>,
    acquired: HashSet<ResourceId>,
    next_resource_id: u64,
    init_size: usize,
    max_size: usize,
    max_wait: Duration,
    idle_cleanup: Duration,
    last_access: Instant,
    being_destroyed: bool,
}

impl<R> PoolState<R> {
    fn status(&self) -> PoolStatus {
        PoolStatus {
            init_size: self.init_size,
            max_size: self.max_size,
            available: self.available.len(),
            acquired: self.acquired.len(),
            max_wait_ms: duration_ms(self.max_wait),
            being_destroyed: self.being_destroyed,
        }
    }
}

/// State shared between the pool handle and its aging task.
struct PoolShared<F: ResourceFactory> {
    id: u64,
    factory: F,
    state: Mutex<PoolState<F::Resource>>,
    /// Signalled when a resource is returned or capacity is freed.
    resource_returned: Condvar,
    counters: PoolCounters,
}

impl<F: ResourceFactory> PoolShared<F> {
    fn create_locked(
        &self,
        state: &mut PoolState<F::Resource>,
    ) -> Result<IdleResource<F::Resource>, ResourceError> {
        let resource = self.factory.create()?;
        state.next_resource_id += 1;
        let id = ResourceId(state.next_resource_id);
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        debug!(pool_id = self.id, resource_id = %id, "created resource");
        Ok(IdleResource { id, resource })
    }

    fn destroy_logged(&self, id: ResourceId, resource: F::Resource) {
        self.counters.destroyed.fetch_add(1, Ordering::Relaxed);
        match self.factory.destroy(resource) {
            Ok(()) => debug!(pool_id = self.id, resource_id = %id, "destroyed resource"),
            Err(e) => error!(
                pool_id = self.id,
                resource_id = %id,
                error = %e,
                "failed to destroy resource"
            ),
        }
    }

    fn check_out(
        self: &Arc<Self>,
        state: &mut PoolState<F::Resource>,
        idle: IdleResource<F::Resource>,
    ) -> Lease<F::Resource> {
        state.acquired.insert(idle.id);
        state.last_access = Instant::now();
        self.counters.acquisitions.fetch_add(1, Ordering::Relaxed);
        debug!(pool_id = self.id, resource_id = %idle.id, status = %state.status(), "resource acquired");
        let home: Weak<dyn LeaseReturn<F::Resource>> = Arc::downgrade(self) as Weak<PoolShared<F>>;
        Lease {
            pool_id: self.id,
            id: idle.id,
            resource: Some(idle.resource),
            home,
        }
    }

    /// Single non-blocking attempt. `Ok(None)` means the caller has to wait.
    fn acquire_internal(
        self: &Arc<Self>,
        state: &mut PoolState<F::Resource>,
    ) -> Result<Option<Lease<F::Resource>>, ResourceError> {
        if state.being_destroyed {
            return Err(ResourceError::BeingDestroyed);
        }

        while let Some(mut idle) = state.available.pop_front() {
            if self.factory.validate(&mut idle.resource) {
                return Ok(Some(self.check_out(state, idle)));
            }
            warn!(pool_id = self.id, resource_id = %idle.id, "found an invalid resource, destroying it");
            self.counters.failed_validations.fetch_add(1, Ordering::Relaxed);
            self.destroy_logged(idle.id, idle.resource);
        }

        if state.acquired.len() >= state.max_size {
            debug!(pool_id = self.id, status = %state.status(), "pool exhausted");
            return Ok(None);
        }

        let idle = self.create_locked(state)?;
        Ok(Some(self.check_out(state, idle)))
    }

    fn idle_cleanup_interval(&self) -> Duration {
        self.state.lock().idle_cleanup
    }

    fn cleanup_required(&self) -> bool {
        let state = self.state.lock();
        !state.being_destroyed && state.last_access.elapsed() >= state.idle_cleanup
    }

    /// Replace every idle resource and refill up to `init_size - acquired`.
    /// Checked-out resources are left alone.
    fn cleanup_idle(&self) -> Result<usize, ResourceError> {
        let mut state = self.state.lock();
        if state.being_destroyed {
            return Ok(0);
        }
        debug!(pool_id = self.id, status = %state.status(), "before pool cleanup");

        while let Some(idle) = state.available.pop_front() {
            self.destroy_logged(idle.id, idle.resource);
        }

        let min_count = state.init_size.saturating_sub(state.acquired.len());
        while state.available.len() < min_count {
            let idle = self.create_locked(&mut state)?;
            state.available.push_back(idle);
        }

        debug!(pool_id = self.id, status = %state.status(), "after pool cleanup");
        Ok(state.available.len())
    }
}

impl<F: ResourceFactory> LeaseReturn<F::Resource> for PoolShared<F> {
    /// A lease dropped without `release` or `invalidate`. Its state is
    /// unknown, so the resource is destroyed and the slot freed.
    fn return_dropped(&self, id: ResourceId, resource: F::Resource) {
        let mut state = self.state.lock();
        let tracked = state.acquired.remove(&id);
        warn!(
            pool_id = self.id,
            resource_id = %id,
            tracked,
            "lease dropped without release, destroying resource"
        );
        self.destroy_logged(id, resource);
        drop(state);

        self.resource_returned.notify_one();
    }
}

/// Pool of interchangeable resources with blocking, time-bounded acquisition.
///
/// # Example
///
/// ```rust,ignore
/// use std::time::Duration;
/// use resource_core::config::PoolConfig;
/// use resource_core::core::ResourcePool;
///
/// let pool = ResourcePool::new(MyConnections::new(url), &PoolConfig::new(10, 2))?;
/// let conn = pool.acquire(Duration::from_millis(500))?;
/// conn.execute("SELECT 1")?;
/// pool.release(conn)?;
/// ```
pub struct ResourcePool<F: ResourceFactory> {
    shared: Arc<PoolShared<F>>,
    aging: Mutex<Option<AgingTask>>,
}

impl<F: ResourceFactory> ResourcePool<F> {
    /// Create a pool, pre-create `init_size` resources and start the aging task.
    ///
    /// An `init_size` larger than `max_size` is clamped with a warning.
    ///
    /// # Errors
    ///
    /// - `ResourceError::InvalidConfig` if `max_size` is zero
    /// - any error returned by the factory while pre-creating resources
    /// - `ResourceError::Internal` if the aging thread cannot be spawned
    pub fn new(factory: F, config: &PoolConfig) -> Result<Self, ResourceError> {
        config.validate().map_err(ResourceError::InvalidConfig)?;

        let mut init_size = config.init_size;
        if init_size > config.max_size {
            warn!(
                init_size,
                max_size = config.max_size,
                "initial pool size is greater than maximum size, using maximum size instead"
            );
            init_size = config.max_size;
        }

        let shared = Arc::new(PoolShared {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            factory,
            state: Mutex::new(PoolState {
                available: VecDeque::with_capacity(config.max_size),
                acquired: HashSet::with_capacity(config.max_size),
                next_resource_id: 0,
                init_size,
                max_size: config.max_size,
                max_wait: config.max_wait(),
                idle_cleanup: config.idle_cleanup_interval(),
                last_access: Instant::now(),
                being_destroyed: false,
            }),
            resource_returned: Condvar::new(),
            counters: PoolCounters::default(),
        });

        {
            let mut state = shared.state.lock();
            for _ in 0..init_size {
                match shared.create_locked(&mut state) {
                    Ok(idle) => state.available.push_back(idle),
                    Err(e) => {
                        while let Some(idle) = state.available.pop_front() {
                            shared.destroy_logged(idle.id, idle.resource);
                        }
                        return Err(e);
                    }
                }
            }
        }

        let aging = match AgingTask::spawn(Arc::clone(&shared)) {
            Ok(task) => task,
            Err(e) => {
                let drained = std::mem::take(&mut shared.state.lock().available);
                for idle in drained {
                    shared.destroy_logged(idle.id, idle.resource);
                }
                return Err(e);
            }
        };

        info!(
            pool_id = shared.id,
            max_size = config.max_size,
            init_size,
            "constructed resource pool"
        );

        Ok(Self {
            shared,
            aging: Mutex::new(Some(aging)),
        })
    }

    /// Process-unique identity of this pool.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Acquire a resource, waiting up to `timeout` for one to become free.
    ///
    /// `Duration::ZERO` waits indefinitely.
    ///
    /// # Errors
    ///
    /// - `ResourceError::Timeout` if nothing became available in time
    /// - `ResourceError::BeingDestroyed` if the pool is (or becomes) torn down
    /// - any factory error raised while creating a new resource
    pub fn acquire(&self, timeout: Duration) -> Result<Lease<F::Resource>, ResourceError> {
        let entered = Instant::now();
        let deadline = if timeout.is_zero() {
            None
        } else {
            entered.checked_add(timeout)
        };

        debug!(
            pool_id = self.shared.id,
            timeout_ms = duration_ms(timeout),
            "trying to acquire resource"
        );

        let mut state = self.shared.state.lock();
        loop {
            if let Some(lease) = self.shared.acquire_internal(&mut state)? {
                return Ok(lease);
            }

            match deadline {
                None => self.shared.resource_returned.wait(&mut state),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        self.shared.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                        let status = state.status();
                        warn!(pool_id = self.shared.id, %status, "acquire timed out");
                        return Err(ResourceError::Timeout {
                            waited_ms: duration_ms(entered.elapsed()),
                            status: status.to_string(),
                        });
                    }
                    self.shared
                        .resource_returned
                        .wait_until(&mut state, deadline);
                }
            }
        }
    }

    /// Acquire using the pool's configured maximum wait time.
    ///
    /// # Errors
    ///
    /// Same as [`acquire`](Self::acquire).
    pub fn acquire_default(&self) -> Result<Lease<F::Resource>, ResourceError> {
        let timeout = self.shared.state.lock().max_wait;
        self.acquire(timeout)
    }

    /// Acquire without waiting.
    ///
    /// # Errors
    ///
    /// - `ResourceError::Exhausted` if every resource is checked out
    /// - `ResourceError::BeingDestroyed` if the pool is torn down
    /// - any factory error raised while creating a new resource
    pub fn try_acquire(&self) -> Result<Lease<F::Resource>, ResourceError> {
        let mut state = self.shared.state.lock();
        self.shared
            .acquire_internal(&mut state)?
            .ok_or(ResourceError::Exhausted)
    }

    /// Return a resource to the pool and wake one waiter.
    ///
    /// If the pool is being destroyed the resource is destroyed instead of
    /// being re-pooled, and the call still succeeds.
    ///
    /// # Errors
    ///
    /// `ResourceError::NotOwned` if the lease was not issued by this pool.
    /// The lease is then dropped, which destroys the resource in the pool
    /// that issued it.
    pub fn release(&self, lease: Lease<F::Resource>) -> Result<(), ResourceError> {
        self.check_owner(&lease)?;
        let (id, resource) = lease.into_parts();

        let mut state = self.shared.state.lock();
        if state.being_destroyed {
            warn!(
                pool_id = self.shared.id,
                resource_id = %id,
                "resource returned while pool being destroyed"
            );
            self.shared.destroy_logged(id, resource);
            return Ok(());
        }

        if !state.acquired.remove(&id) {
            error!(pool_id = self.shared.id, resource_id = %id, "released resource is not checked out");
            self.shared.destroy_logged(id, resource);
            return Err(ResourceError::NotOwned);
        }

        state.available.push_back(IdleResource { id, resource });
        debug!(pool_id = self.shared.id, resource_id = %id, status = %state.status(), "resource returned");
        drop(state);

        self.shared.resource_returned.notify_one();
        Ok(())
    }

    /// Destroy a checked-out resource instead of re-pooling it.
    ///
    /// Frees one unit of capacity, so one waiter is woken.
    ///
    /// # Errors
    ///
    /// `ResourceError::NotOwned` if the lease was not issued by this pool.
    pub fn invalidate(&self, lease: Lease<F::Resource>) -> Result<(), ResourceError> {
        self.check_owner(&lease)?;
        let (id, resource) = lease.into_parts();

        let mut state = self.shared.state.lock();
        if !state.being_destroyed && !state.acquired.remove(&id) {
            self.shared.destroy_logged(id, resource);
            return Err(ResourceError::NotOwned);
        }
        info!(pool_id = self.shared.id, resource_id = %id, "invalidating resource");
        self.shared.destroy_logged(id, resource);
        drop(state);

        self.shared.resource_returned.notify_one();
        Ok(())
    }

    fn check_owner(&self, lease: &Lease<F::Resource>) -> Result<(), ResourceError> {
        if lease.pool_id == self.shared.id {
            Ok(())
        } else {
            error!(
                pool_id = self.shared.id,
                lease_pool_id = lease.pool_id,
                resource_id = %lease.id,
                "resource was not acquired from this pool"
            );
            Err(ResourceError::NotOwned)
        }
    }

    /// Whether a caller could obtain a resource without exceeding `max_size`.
    #[must_use]
    pub fn is_available(&self) -> bool {
        let state = self.shared.state.lock();
        !state.being_destroyed && state.acquired.len() < state.max_size
    }

    /// Whether `lease` is currently checked out of this pool.
    #[must_use]
    pub fn is_pool_resource(&self, lease: &Lease<F::Resource>) -> bool {
        lease.pool_id == self.shared.id && self.shared.state.lock().acquired.contains(&lease.id)
    }

    /// Whether [`destroy_all`](Self::destroy_all) has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.shared.state.lock().being_destroyed
    }

    /// Tear the pool down.
    ///
    /// Idempotent. All waiters are woken and fail with `BeingDestroyed`, the
    /// aging task is stopped and joined, and every idle resource is destroyed.
    /// Resources still checked out are destroyed when they are released.
    pub fn destroy_all(&self) {
        let drained = {
            let mut state = self.shared.state.lock();
            if state.being_destroyed {
                return;
            }
            info!(pool_id = self.shared.id, status = %state.status(), "destroying the resource pool");
            state.being_destroyed = true;

            let outstanding = state.acquired.len();
            if outstanding > 0 {
                warn!(
                    pool_id = self.shared.id,
                    outstanding,
                    "resources still checked out will be destroyed on release"
                );
            }
            state.acquired.clear();
            std::mem::take(&mut state.available)
        };
        self.shared.resource_returned.notify_all();

        if let Some(task) = self.aging.lock().take() {
            task.stop();
        }

        for idle in drained {
            self.shared.destroy_logged(idle.id, idle.resource);
        }

        info!(pool_id = self.shared.id, "destroyed the resource pool");
    }

    /// Change the hard cap. Zero is rejected and the current value kept.
    pub fn set_max_pool_size(&self, max_size: usize) {
        if max_size == 0 {
            error!(
                pool_id = self.shared.id,
                current = self.shared.state.lock().max_size,
                "invalid max pool size 0, keeping the current value"
            );
            return;
        }
        let old = std::mem::replace(&mut self.shared.state.lock().max_size, max_size);
        info!(pool_id = self.shared.id, old, new = max_size, "replaced max pool size");
        // A larger cap may unblock waiters.
        self.shared.resource_returned.notify_all();
    }

    /// Set the default acquisition timeout in seconds. Zero restores the default.
    pub fn set_max_wait_time(&self, seconds: u64) {
        let wait = if seconds > 0 {
            Duration::from_secs(seconds)
        } else {
            DEFAULT_MAX_WAIT_TIME
        };
        self.shared.state.lock().max_wait = wait;
        info!(pool_id = self.shared.id, seconds = wait.as_secs(), "maximum resource wait time set");
    }

    /// Set the idle period, in minutes, before aging recycles idle resources.
    /// Zero is ignored.
    pub fn set_idle_cleanup_time(&self, minutes: u64) {
        if minutes > 0 {
            self.set_idle_cleanup_interval(Duration::from_secs(minutes.saturating_mul(60)));
        }
    }

    /// Set the aging interval precisely. Zero is ignored.
    ///
    /// The aging task is rescheduled immediately rather than at the end of
    /// its current sleep.
    pub fn set_idle_cleanup_interval(&self, interval: Duration) {
        if interval.is_zero() {
            warn!(pool_id = self.shared.id, "ignoring zero idle cleanup interval");
            return;
        }
        self.shared.state.lock().idle_cleanup = interval;
        info!(
            pool_id = self.shared.id,
            interval_ms = duration_ms(interval),
            "idle cleanup interval set"
        );
        if let Some(task) = self.aging.lock().as_ref() {
            task.reschedule();
        }
    }

    /// Force an aging pass regardless of recent activity.
    ///
    /// Returns the number of idle resources after the pass.
    ///
    /// # Errors
    ///
    /// Any factory error raised while recreating resources.
    pub fn cleanup_idle(&self) -> Result<usize, ResourceError> {
        self.shared.cleanup_idle()
    }

    /// Current sizing snapshot.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.shared.state.lock().status()
    }

    /// Lifetime counters plus current sizing.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let status = self.status();
        let counters = &self.shared.counters;
        PoolStats {
            created: counters.created.load(Ordering::Relaxed),
            destroyed: counters.destroyed.load(Ordering::Relaxed),
            acquisitions: counters.acquisitions.load(Ordering::Relaxed),
            timeouts: counters.timeouts.load(Ordering::Relaxed),
            failed_validations: counters.failed_validations.load(Ordering::Relaxed),
            available: status.available,
            acquired: status.acquired,
            max_size: status.max_size,
        }
    }
}

impl<F: ResourceFactory> Drop for ResourcePool<F> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

impl<F: ResourceFactory> fmt::Debug for ResourcePool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("id", &self.shared.id)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::thread;

    /// Factory handing out numbered resources and counting lifecycle calls.
    #[derive(Clone, Default)]
    struct CountingFactory {
        created: Arc<AtomicUsize>,
        destroyed: Arc<AtomicUsize>,
        reject_all: Arc<AtomicBool>,
    }

    impl ResourceFactory for CountingFactory {
        type Resource = usize;

        fn create(&self) -> Result<usize, ResourceError> {
            Ok(self.created.fetch_add(1, Ordering::SeqCst))
        }

        fn validate(&self, _resource: &mut usize) -> bool {
            !self.reject_all.load(Ordering::SeqCst)
        }

        fn destroy(&self, _resource: usize) -> Result<(), ResourceError> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingFactory;

    impl ResourceFactory for FailingFactory {
        type Resource = ();

        fn create(&self) -> Result<(), ResourceError> {
            Err(ResourceError::Creation("database unreachable".into()))
        }

        fn validate(&self, _resource: &mut ()) -> bool {
            true
        }

        fn destroy(&self, _resource: ()) -> Result<(), ResourceError> {
            Ok(())
        }
    }

    #[test]
    fn test_prewarms_init_size() {
        let factory = CountingFactory::default();
        let pool = ResourcePool::new(factory.clone(), &PoolConfig::new(5, 3)).unwrap();

        assert_eq!(factory.created.load(Ordering::SeqCst), 3);
        let status = pool.status();
        assert_eq!(status.available, 3);
        assert_eq!(status.acquired, 0);
    }

    #[test]
    fn test_init_size_clamped_to_max() {
        let factory = CountingFactory::default();
        let pool = ResourcePool::new(factory.clone(), &PoolConfig::new(2, 10)).unwrap();

        assert_eq!(pool.status().init_size, 2);
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let result = ResourcePool::new(CountingFactory::default(), &PoolConfig::new(0, 0));
        assert!(matches!(result, Err(ResourceError::InvalidConfig(_))));
    }

    #[test]
    fn test_creation_failure_propagates() {
        let result = ResourcePool::new(FailingFactory, &PoolConfig::new(2, 1));
        assert!(matches!(result, Err(ResourceError::Creation(_))));

        let pool = ResourcePool::new(FailingFactory, &PoolConfig::new(2, 0)).unwrap();
        assert!(matches!(pool.try_acquire(), Err(ResourceError::Creation(_))));
    }

    #[test]
    fn test_acquire_reuses_released_resource() {
        let factory = CountingFactory::default();
        let pool = ResourcePool::new(factory.clone(), &PoolConfig::new(2, 1)).unwrap();

        let lease = pool.acquire(Duration::from_millis(100)).unwrap();
        let first = *lease;
        let id = lease.id();
        pool.release(lease).unwrap();

        let again = pool.acquire(Duration::from_millis(100)).unwrap();
        assert_eq!(*again, first);
        assert_eq!(again.id(), id);
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        pool.release(again).unwrap();
    }

    #[test]
    fn test_grows_lazily_up_to_max() {
        let factory = CountingFactory::default();
        let pool = ResourcePool::new(factory.clone(), &PoolConfig::new(3, 0)).unwrap();

        let a = pool.try_acquire().unwrap();
        let b = pool.try_acquire().unwrap();
        let c = pool.try_acquire().unwrap();
        assert!(!pool.is_available());
        assert!(matches!(pool.try_acquire(), Err(ResourceError::Exhausted)));
        assert_eq!(factory.created.load(Ordering::SeqCst), 3);

        for lease in [a, b, c] {
            pool.release(lease).unwrap();
        }
        assert!(pool.is_available());
        assert_eq!(pool.status().available, 3);
    }

    #[test]
    fn test_invalid_resources_are_destroyed_and_replaced() {
        let factory = CountingFactory::default();
        let pool = ResourcePool::new(factory.clone(), &PoolConfig::new(4, 3)).unwrap();

        factory.reject_all.store(true, Ordering::SeqCst);
        let lease = pool.try_acquire().unwrap();

        // All three idle resources failed validation; a fresh one was created.
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 3);
        assert_eq!(factory.created.load(Ordering::SeqCst), 4);
        assert_eq!(pool.stats().failed_validations, 3);
        pool.release(lease).unwrap();
    }

    #[test]
    fn test_release_foreign_lease_is_not_owned() {
        let pool_a = ResourcePool::new(CountingFactory::default(), &PoolConfig::new(1, 0)).unwrap();
        let pool_b = ResourcePool::new(CountingFactory::default(), &PoolConfig::new(1, 0)).unwrap();

        let lease = pool_a.try_acquire().unwrap();
        assert!(!pool_b.is_pool_resource(&lease));
        assert!(pool_a.is_pool_resource(&lease));
        assert!(matches!(pool_b.release(lease), Err(ResourceError::NotOwned)));

        // The rejected lease went back to the pool that issued it.
        assert_eq!(pool_a.status().acquired, 0);
        assert!(pool_a.is_available());
    }

    #[test]
    fn test_dropped_lease_frees_capacity() {
        let factory = CountingFactory::default();
        let pool = ResourcePool::new(factory.clone(), &PoolConfig::new(1, 1)).unwrap();

        let lease = pool.try_acquire().unwrap();
        assert!(matches!(pool.try_acquire(), Err(ResourceError::Exhausted)));
        drop(lease);

        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(pool.status().acquired, 0);
        let fresh = pool.try_acquire().unwrap();
        assert_eq!(*fresh, 1);
        pool.release(fresh).unwrap();
    }

    #[test]
    fn test_dropped_lease_wakes_waiter() {
        let pool = Arc::new(ResourcePool::new(CountingFactory::default(), &PoolConfig::new(1, 1)).unwrap());
        let held = pool.try_acquire().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let lease = pool.acquire(Duration::from_secs(5))?;
                pool.release(lease)
            })
        };

        thread::sleep(Duration::from_millis(50));
        drop(held);
        waiter.join().unwrap().unwrap();
        assert_eq!(pool.status().acquired, 0);
    }

    #[test]
    fn test_lease_outliving_pool_is_dropped_quietly() {
        let factory = CountingFactory::default();
        let pool = ResourcePool::new(factory.clone(), &PoolConfig::new(1, 1)).unwrap();
        let lease = pool.try_acquire().unwrap();

        drop(pool);
        drop(lease);
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalidate_frees_capacity() {
        let factory = CountingFactory::default();
        let pool = ResourcePool::new(factory.clone(), &PoolConfig::new(1, 1)).unwrap();

        let lease = pool.try_acquire().unwrap();
        pool.invalidate(lease).unwrap();

        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
        let status = pool.status();
        assert_eq!(status.acquired, 0);
        assert_eq!(status.available, 0);

        let fresh = pool.try_acquire().unwrap();
        assert_eq!(*fresh, 1);
        pool.release(fresh).unwrap();
    }

    #[test]
    fn test_acquire_times_out() {
        let pool = ResourcePool::new(CountingFactory::default(), &PoolConfig::new(1, 1)).unwrap();
        let held = pool.try_acquire().unwrap();

        let started = Instant::now();
        let result = pool.acquire(Duration::from_millis(100));
        let elapsed = started.elapsed();

        match result {
            Err(ResourceError::Timeout { waited_ms, status }) => {
                assert!(waited_ms >= 100);
                assert!(status.contains("acquired=1"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(elapsed >= Duration::from_millis(100));
        assert_eq!(pool.stats().timeouts, 1);
        pool.release(held).unwrap();
    }

    #[test]
    fn test_waiter_woken_by_release() {
        let pool = Arc::new(ResourcePool::new(CountingFactory::default(), &PoolConfig::new(1, 1)).unwrap());
        let held = pool.try_acquire().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let lease = pool.acquire(Duration::from_secs(5)).unwrap();
                let value = *lease;
                pool.release(lease).unwrap();
                value
            })
        };

        thread::sleep(Duration::from_millis(50));
        let value = *held;
        pool.release(held).unwrap();
        assert_eq!(waiter.join().unwrap(), value);
    }

    #[test]
    fn test_destroy_all_fails_waiters_fast() {
        let factory = CountingFactory::default();
        let pool = Arc::new(ResourcePool::new(factory.clone(), &PoolConfig::new(1, 1)).unwrap());
        let held = pool.try_acquire().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.acquire(Duration::ZERO))
        };

        thread::sleep(Duration::from_millis(50));
        pool.destroy_all();
        assert!(matches!(waiter.join().unwrap(), Err(ResourceError::BeingDestroyed)));

        // Idempotent, and late releases destroy rather than re-pool.
        pool.destroy_all();
        pool.release(held).unwrap();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
        assert!(!pool.is_available());
        assert!(matches!(pool.try_acquire(), Err(ResourceError::BeingDestroyed)));
    }

    #[test]
    fn test_set_max_pool_size() {
        let pool = ResourcePool::new(CountingFactory::default(), &PoolConfig::new(1, 0)).unwrap();
        pool.set_max_pool_size(0);
        assert_eq!(pool.status().max_size, 1);

        let first = pool.try_acquire().unwrap();
        assert!(!pool.is_available());
        pool.set_max_pool_size(2);
        let second = pool.try_acquire().unwrap();
        pool.release(first).unwrap();
        pool.release(second).unwrap();
    }

    #[test]
    fn test_set_max_wait_time() {
        let pool = ResourcePool::new(CountingFactory::default(), &PoolConfig::new(1, 0)).unwrap();
        pool.set_max_wait_time(5);
        assert_eq!(pool.status().max_wait_ms, 5_000);
        pool.set_max_wait_time(0);
        assert_eq!(pool.status().max_wait_ms, 60_000);
    }

    #[test]
    fn test_cleanup_idle_keeps_checked_out_resources() {
        let factory = CountingFactory::default();
        let pool = ResourcePool::new(factory.clone(), &PoolConfig::new(5, 3)).unwrap();

        let a = pool.try_acquire().unwrap();
        let b = pool.try_acquire().unwrap();
        let c = pool.try_acquire().unwrap();
        let d = pool.try_acquire().unwrap();
        pool.release(c).unwrap();
        pool.release(d).unwrap();
        assert_eq!(pool.status().available, 2);

        // init 3 - acquired 2 = 1 idle resource kept, freshly created.
        let restored = pool.cleanup_idle().unwrap();
        assert_eq!(restored, 1);
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 2);
        assert_eq!(pool.status().acquired, 2);

        pool.release(a).unwrap();
        pool.release(b).unwrap();
    }

    #[test]
    fn test_display_status() {
        let pool = ResourcePool::new(CountingFactory::default(), &PoolConfig::new(4, 2)).unwrap();
        assert_eq!(
            pool.status().to_string(),
            "Pool[init-size=2, max-size=4, available=2, acquired=0, max-wait-time=60 sec]"
        );
    }

    #[test]
    fn test_drop_destroys_idle_resources() {
        let factory = CountingFactory::default();
        {
            let _pool = ResourcePool::new(factory.clone(), &PoolConfig::new(3, 3)).unwrap();
        }
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 3);
    }
}
