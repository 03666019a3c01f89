//! Tests for builder modules

use resource_core::builders::build_pools;
use resource_core::config::{PoolConfig, PoolsConfig};
use resource_core::core::{ResourceError, ResourceFactory};
use std::collections::HashMap;

#[derive(Debug)]
struct Named(String);

impl ResourceFactory for Named {
    type Resource = String;

    fn create(&self) -> Result<String, ResourceError> {
        Ok(self.0.clone())
    }

    fn validate(&self, _resource: &mut String) -> bool {
        true
    }

    fn destroy(&self, _resource: String) -> Result<(), ResourceError> {
        Ok(())
    }
}

fn two_pools() -> PoolsConfig {
    let mut pools = HashMap::new();
    pools.insert("primary".to_string(), PoolConfig::new(4, 2));
    pools.insert("replica".to_string(), PoolConfig::new(2, 0));
    PoolsConfig { pools }
}

#[test]
fn test_build_pools_creates_each_named_pool() {
    let pools = build_pools(&two_pools(), |name, _cfg| Ok(Named(name.to_string()))).unwrap();
    assert_eq!(pools.len(), 2);

    let primary = &pools["primary"];
    assert_eq!(primary.status().available, 2);
    assert_eq!(primary.status().max_size, 4);

    let lease = pools["replica"].try_acquire().unwrap();
    assert_eq!(lease.as_str(), "replica");
    pools["replica"].release(lease).unwrap();
}

#[test]
fn test_build_pools_propagates_factory_error() {
    let result = build_pools(&two_pools(), |name, _cfg| {
        if name == "replica" {
            Err(ResourceError::Creation("replica offline".into()))
        } else {
            Ok(Named(name.to_string()))
        }
    });
    assert!(matches!(result, Err(ResourceError::Creation(_))));
}

#[test]
fn test_build_pools_rejects_invalid_config() {
    let result = build_pools(&PoolsConfig::default(), |name, _cfg| Ok(Named(name.to_string())));
    assert!(matches!(result, Err(ResourceError::InvalidConfig(_))));
}
