//! Error types for pool, queue and transaction operations.

use thiserror::Error;

use crate::core::transaction::TransactionId;

/// Errors produced by resource pools.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// No resource became available before the deadline.
    #[error("timed out after {waited_ms} ms waiting for a resource; {status}")]
    Timeout {
        /// Milliseconds actually spent waiting.
        waited_ms: u64,
        /// Pool status at the moment the wait gave up.
        status: String,
    },
    /// A no-wait acquisition found nothing available.
    #[error("resource pool exhausted")]
    Exhausted,
    /// The lease was not acquired from this pool, or was already returned.
    #[error("resource was not acquired from this pool")]
    NotOwned,
    /// The pool is being torn down.
    #[error("resource pool is being destroyed")]
    BeingDestroyed,
    /// The factory failed to create a resource.
    #[error("failed to create resource: {0}")]
    Creation(String),
    /// The factory failed to destroy a resource.
    #[error("failed to destroy resource: {0}")]
    Destruction(String),
    /// Pool configuration rejected at construction.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
    /// Internal failure (async bridge task panicked or was cancelled).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors produced by blocking queues and the queue registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue has been shut down.
    #[error("queue has been shut down")]
    Shutdown,
    /// The registry has been shut down; no new items are accepted.
    #[error("queue registry has shut down")]
    RegistryClosed,
    /// No consumer is waiting on the key, so there is no queue to deliver to.
    #[error("no consumer waiting on key [{0}]")]
    NoConsumer(String),
}

/// Failure reported by a transaction participant.
#[derive(Debug, Error)]
pub enum ParticipantError {
    /// `save` could not persist the participant.
    #[error("save failed: {0}")]
    SaveFailed(String),
    /// `undo` could not revert the participant.
    #[error("undo failed: {0}")]
    UndoFailed(String),
}

/// Failure raised by a save context or its source.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The backing resource could not be acquired.
    #[error(transparent)]
    Acquire(#[from] ResourceError),
    /// The context's own commit failed.
    #[error("context commit failed: {0}")]
    Commit(String),
    /// The context's own rollback failed.
    #[error("context rollback failed: {0}")]
    Rollback(String),
    /// The context could not be handed back to its source.
    #[error("context release failed: {0}")]
    Release(String),
}

/// Underlying reason a commit or rollback failed.
#[derive(Debug, Error)]
pub enum FailureCause {
    /// A participant failed.
    #[error(transparent)]
    Participant(#[from] ParticipantError),
    /// The save context failed.
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Errors surfaced by [`Transaction`](crate::core::Transaction).
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Commit did not complete. Participants saved before the failure are not undone.
    #[error("transaction {id} commit failed after {saved} participant(s) saved: {cause}")]
    CommitFailed {
        /// Transaction identity.
        id: TransactionId,
        /// Number of participants whose `save` succeeded before the failure.
        saved: usize,
        /// What went wrong.
        #[source]
        cause: FailureCause,
    },
    /// The context-level rollback did not complete.
    #[error("transaction {id} rollback failed: {cause}")]
    RollbackFailed {
        /// Transaction identity.
        id: TransactionId,
        /// What went wrong.
        #[source]
        cause: FailureCause,
    },
}

impl TransactionError {
    /// Transaction the error belongs to.
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        match self {
            Self::CommitFailed { id, .. } | Self::RollbackFailed { id, .. } => *id,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
