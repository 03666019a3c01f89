//! Tests for configuration validation

use resource_core::config::{PoolConfig, PoolsConfig};
use std::time::Duration;

#[test]
fn test_pool_config_validation() {
    assert!(PoolConfig::new(10, 2).validate().is_ok());
    assert!(PoolConfig::new(0, 0).validate().is_err());
}

#[test]
fn test_pool_config_builders() {
    let cfg = PoolConfig::new(4, 1)
        .with_max_wait_secs(5)
        .with_idle_cleanup_minutes(10);
    assert_eq!(cfg.max_wait(), Duration::from_secs(5));
    assert_eq!(cfg.idle_cleanup_interval(), Duration::from_secs(600));
}

#[test]
fn test_pools_config_from_json() {
    let json = r#"{
        "pools": {
            "orders": { "max_size": 8, "init_size": 2, "max_wait_secs": 10 },
            "billing": { "max_size": 2 }
        }
    }"#;

    let cfg = PoolsConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.pools.len(), 2);

    let orders = &cfg.pools["orders"];
    assert_eq!(orders.max_size, 8);
    assert_eq!(orders.init_size, 2);
    assert_eq!(orders.max_wait_secs, 10);
    assert_eq!(orders.idle_cleanup_minutes, 60);

    let billing = &cfg.pools["billing"];
    assert_eq!(billing.init_size, 0);
    assert_eq!(billing.max_wait_secs, 60);
}

#[test]
fn test_pools_config_rejects_invalid() {
    let err = PoolsConfig::from_json_str(r#"{ "pools": { "bad": { "max_size": 0 } } }"#).unwrap_err();
    assert!(err.to_string().contains("bad"));

    let err = PoolsConfig::from_json_str(r#"{ "pools": {} }"#).unwrap_err();
    assert!(err.to_string().contains("at least one pool"));

    assert!(PoolsConfig::from_json_str("not json").is_err());
}

#[test]
fn test_pool_config_round_trips_through_serde() {
    let cfg = PoolConfig::new(3, 1).with_max_wait_secs(7);
    let json = serde_json::to_string(&cfg).unwrap();
    let back: PoolConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cfg);
}
