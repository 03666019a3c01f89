//! Core pooling and transaction abstractions.

pub mod error;
pub mod factory;
pub mod resource_pool;
pub mod transaction;

pub use error::{
    AppResult, ContextError, FailureCause, ParticipantError, QueueError, ResourceError,
    TransactionError,
};
pub use factory::{ResourceFactory, TransactionalResource};
pub use resource_pool::{
    Lease, PoolStats, PoolStatus, ResourceId, ResourcePool, DEFAULT_IDLE_CLEANUP_INTERVAL,
    DEFAULT_MAX_WAIT_TIME,
};
pub use transaction::{
    ContextSource, NoHooks, Participant, PooledContext, PooledContextSource, SaveContext,
    Transaction, TransactionHooks, TransactionId,
};
