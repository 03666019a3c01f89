//! Configuration models for resource pools.

pub mod pool;

pub use pool::{PoolConfig, PoolsConfig};
