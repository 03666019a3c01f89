//! # Resource Core
//!
//! Blocking resource pools, keyed hand-off queues and local commit/rollback
//! transactions for services that juggle scarce resources such as database
//! connections.
//!
//! ## Core Problem Solved
//!
//! Connection-heavy services keep hitting the same three problems:
//!
//! - **Scarce resources**: connections are expensive to create and must be capped, validated and recycled
//! - **Request/reply rendezvous**: a worker thread must hand a result to exactly the thread waiting for it
//! - **Save-then-commit**: several in-memory objects must persist through one connection and commit together
//!
//! ## Key Features
//!
//! - **Blocking Pool**: time-bounded acquisition with validation, lazy growth up to a hard cap, and idle aging
//! - **Keyed Queues**: consumers create a queue on demand; producers can only deliver to a waiting consumer
//! - **Transactions**: ordered `save` over registered participants, context commit, guaranteed release
//! - **Graceful Shutdown**: pool teardown and registry shutdown wake every waiter and never leave one stranded
//! - **Async Bridge**: `tokio` wrappers that run blocking calls on the blocking thread pool
//!
//! ## ResourcePool
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use resource_core::config::PoolConfig;
//! use resource_core::core::ResourcePool;
//!
//! let pool = ResourcePool::new(PgConnections::new(url), &PoolConfig::new(10, 2))?;
//!
//! let conn = pool.acquire(Duration::from_secs(5))?;
//! conn.execute("UPDATE orders SET state = 'sent' WHERE id = $1", &[&id])?;
//! pool.release(conn)?;
//! ```
//!
//! ## QueueRegistry
//!
//! ```rust,ignore
//! use resource_core::infra::QueueRegistry;
//! use resource_core::util::CorrelationId;
//!
//! let replies: Arc<QueueRegistry<CorrelationId, Reply>> = Arc::new(QueueRegistry::new());
//!
//! // Requesting thread
//! let reply = replies.dequeue(request_id, Duration::from_secs(30));
//!
//! // Worker thread
//! replies.enqueue(&request_id, reply)?;
//! ```
//!
//! ## Transaction
//!
//! ```rust,ignore
//! use resource_core::core::{PooledContextSource, Transaction};
//!
//! let txn = Transaction::new(PooledContextSource::new(Arc::clone(&pool), Duration::from_secs(5)));
//! txn.add(order);
//! txn.add(invoice);
//! txn.commit()?;
//! ```
//!
//! For complete examples, see:
//! - `tests/transaction_test.rs` - pool-backed commit and rollback
//! - `tests/queue_registry_test.rs` - producer/consumer rendezvous

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Resource pools, factories, transactions and their errors.
pub mod core;
/// Configuration models for pools.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Blocking queues and the keyed queue registry.
pub mod infra;
/// Async runtime bridge.
pub mod runtime;
/// Shared utilities.
pub mod util;
