//! Builders to construct resource pools from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::config::{PoolConfig, PoolsConfig};
use crate::core::{ResourceError, ResourceFactory, ResourcePool};

/// Build every named pool in `cfg`, asking `factory_fn` for each pool's factory.
///
/// Pools are returned behind `Arc` so they can be shared with context sources
/// and worker threads. If any pool fails to build, the pools already built are
/// dropped (and therefore destroyed) before the error is returned.
///
/// # Errors
///
/// - `ResourceError::InvalidConfig` if `cfg` fails validation
/// - any error returned by `factory_fn` or by pool construction
pub fn build_pools<F, FF>(
    cfg: &PoolsConfig,
    mut factory_fn: FF,
) -> Result<HashMap<String, Arc<ResourcePool<F>>>, ResourceError>
where
    F: ResourceFactory,
    FF: FnMut(&str, &PoolConfig) -> Result<F, ResourceError>,
{
    cfg.validate().map_err(ResourceError::InvalidConfig)?;

    let mut pools = HashMap::with_capacity(cfg.pools.len());
    for (name, pool_cfg) in &cfg.pools {
        let factory = factory_fn(name, pool_cfg)?;
        let pool = ResourcePool::new(factory, pool_cfg)?;
        info!(pool = %name, pool_id = pool.id(), "built resource pool");
        pools.insert(name.clone(), Arc::new(pool));
    }

    Ok(pools)
}
