//! Tests for error types

use resource_core::core::{
    ContextError, FailureCause, ParticipantError, QueueError, ResourceError, TransactionError,
};
use std::error::Error;

#[test]
fn test_timeout_error_carries_status() {
    let err = ResourceError::Timeout {
        waited_ms: 200,
        status: "Pool[init-size=1, max-size=1, available=0, acquired=1, max-wait-time=60 sec]".into(),
    };
    assert_eq!(
        format!("{}", err),
        "timed out after 200 ms waiting for a resource; Pool[init-size=1, max-size=1, available=0, acquired=1, max-wait-time=60 sec]"
    );
}

#[test]
fn test_simple_resource_errors() {
    assert_eq!(format!("{}", ResourceError::Exhausted), "resource pool exhausted");
    assert_eq!(format!("{}", ResourceError::NotOwned), "resource was not acquired from this pool");
    assert_eq!(format!("{}", ResourceError::BeingDestroyed), "resource pool is being destroyed");
    assert_eq!(
        format!("{}", ResourceError::Creation("refused".into())),
        "failed to create resource: refused"
    );
}

#[test]
fn test_queue_errors() {
    assert_eq!(format!("{}", QueueError::Shutdown), "queue has been shut down");
    assert_eq!(format!("{}", QueueError::RegistryClosed), "queue registry has shut down");
    assert_eq!(
        format!("{}", QueueError::NoConsumer("X".into())),
        "no consumer waiting on key [X]"
    );
}

#[test]
fn test_context_acquire_is_transparent() {
    let err: ContextError = ResourceError::Exhausted.into();
    assert_eq!(format!("{}", err), "resource pool exhausted");
}

#[test]
fn test_transaction_error_source_chain() {
    let txn = resource_core::core::Transaction::new(NeverSource);
    let err = TransactionError::CommitFailed {
        id: txn.id(),
        saved: 2,
        cause: FailureCause::Participant(ParticipantError::SaveFailed("row locked".into())),
    };

    assert_eq!(err.id(), txn.id());
    let text = format!("{}", err);
    assert!(text.contains("after 2 participant(s) saved"));
    assert!(text.ends_with("save failed: row locked"));
    let source = err.source().map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("save failed: row locked"));
}

/// Context source that is never asked for a context.
struct NeverSource;

struct NeverContext;

impl resource_core::core::SaveContext for NeverContext {
    fn commit(&mut self) -> Result<(), ContextError> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ContextError> {
        Ok(())
    }

    fn invalidate(&mut self) {}
}

impl resource_core::core::ContextSource for NeverSource {
    type Context = NeverContext;

    fn acquire_context(&self) -> Result<NeverContext, ContextError> {
        Err(ContextError::Acquire(ResourceError::Exhausted))
    }

    fn release_context(&self, _context: NeverContext) -> Result<(), ContextError> {
        Ok(())
    }
}
