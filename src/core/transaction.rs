//! Local commit/rollback over a list of registered participants.
//!
//! A [`Transaction`] acquires one save context from a [`ContextSource`],
//! asks every [`Participant`] to save itself into it in registration order,
//! commits the context and hands it back to the source. The context is
//! released on every exit path, including a panicking participant or hook;
//! a context that saw a failure is invalidated first so its resource is not
//! reused.
//!
//! This is a single-resource protocol. Participants saved before a failure
//! are not undone automatically; [`TransactionError::CommitFailed`] reports
//! how many saved so the caller can compensate.

mod pooled;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::{ContextError, ParticipantError, TransactionError};

pub use pooled::{PooledContext, PooledContextSource};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, monotonically increasing transaction identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TransactionId(u64);

impl TransactionId {
    fn next() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// Transactional handle wrapping one resource for one commit/rollback cycle.
pub trait SaveContext: Send + 'static {
    /// Make everything saved through this context durable.
    ///
    /// # Errors
    ///
    /// `ContextError::Commit` when the underlying resource refuses.
    fn commit(&mut self) -> Result<(), ContextError>;

    /// Discard everything saved through this context.
    ///
    /// # Errors
    ///
    /// `ContextError::Rollback` when the underlying resource refuses.
    fn rollback(&mut self) -> Result<(), ContextError>;

    /// Mark the wrapped resource as unusable; releasing the context then
    /// destroys it instead of re-pooling it.
    fn invalidate(&mut self);
}

/// Supplier of save contexts.
pub trait ContextSource: Send + Sync {
    /// Context handed to participants.
    type Context: SaveContext;

    /// Obtain a context, usually by acquiring a pooled resource.
    ///
    /// # Errors
    ///
    /// Any [`ContextError`]; pool failures arrive as `ContextError::Acquire`.
    fn acquire_context(&self) -> Result<Self::Context, ContextError>;

    /// Hand a context back once the cycle is over.
    ///
    /// # Errors
    ///
    /// `ContextError::Release`; the transaction logs and swallows it.
    fn release_context(&self, context: Self::Context) -> Result<(), ContextError>;
}

/// An object that persists itself as part of a transaction.
///
/// Participants are shared (`Arc`) and identified by pointer, so
/// implementations keep any mutable state behind their own lock.
pub trait Participant<C>: Send + Sync {
    /// Write this participant's changes through `context`.
    ///
    /// # Errors
    ///
    /// `ParticipantError::SaveFailed`; aborts the commit.
    fn save(&self, context: &mut C) -> Result<(), ParticipantError>;

    /// Revert this participant's in-memory changes.
    ///
    /// # Errors
    ///
    /// `ParticipantError::UndoFailed`; logged and skipped during rollback.
    fn undo(&self, id: TransactionId) -> Result<(), ParticipantError>;
}

/// Callbacks around commit and rollback. Every method defaults to a no-op.
pub trait TransactionHooks: Send + Sync {
    /// Runs after the context is acquired and before the first `save`.
    fn before_commit(&self, _id: TransactionId) {}

    /// Runs after the context committed and before participants are cleared.
    fn after_commit(&self, _id: TransactionId) {}

    /// Runs before the first `undo`.
    fn before_rollback(&self, _id: TransactionId) {}

    /// Runs after the last `undo`.
    fn after_rollback(&self, _id: TransactionId) {}

    /// Keep the participant list after rollback so it can be retried.
    fn retain_after_rollback(&self) -> bool {
        false
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl TransactionHooks for NoHooks {}

type ParticipantList<C> = Vec<Arc<dyn Participant<C>>>;

/// A local transaction over a set of participants.
///
/// # Example
///
/// ```rust,ignore
/// let source = PooledContextSource::new(Arc::clone(&pool), Duration::from_secs(5));
/// let txn = Transaction::new(source);
/// txn.add(Arc::new(order));
/// txn.add(Arc::new(invoice));
/// if let Err(e) = txn.commit() {
///     tracing::error!(error = %e, "order submission failed");
///     txn.rollback();
/// }
/// ```
pub struct Transaction<S: ContextSource, H: TransactionHooks = NoHooks> {
    id: TransactionId,
    source: S,
    hooks: H,
    participants: Mutex<ParticipantList<S::Context>>,
    /// Serializes commit and rollback cycles on this instance.
    cycle: Mutex<()>,
}

impl<S: ContextSource> Transaction<S> {
    /// Transaction without hooks.
    pub fn new(source: S) -> Self {
        Self::with_hooks(source, NoHooks)
    }
}

impl<S: ContextSource, H: TransactionHooks> Transaction<S, H> {
    /// Transaction with custom hooks.
    pub fn with_hooks(source: S, hooks: H) -> Self {
        let id = TransactionId::next();
        debug!(txn_id = %id, "created transaction");
        Self {
            id,
            source,
            hooks,
            participants: Mutex::new(Vec::new()),
            cycle: Mutex::new(()),
        }
    }

    /// This transaction's identity.
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    /// The context source this transaction draws from.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Register a participant. Returns `false` if it was already registered.
    pub fn add(&self, participant: Arc<dyn Participant<S::Context>>) -> bool {
        let mut participants = self.participants.lock();
        if participants
            .iter()
            .any(|p| std::ptr::addr_eq(Arc::as_ptr(p), Arc::as_ptr(&participant)))
        {
            debug!(txn_id = %self.id, "participant already registered");
            return false;
        }
        participants.push(participant);
        true
    }

    /// Number of registered participants.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.participants.lock().len()
    }

    /// Whether no participant is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.lock().is_empty()
    }

    /// Save every participant and commit the context.
    ///
    /// The participant list is cleared on success. On failure the context is
    /// invalidated and already-saved participants are left as they are. A
    /// panic in a participant or hook invalidates and releases the context
    /// before it propagates.
    ///
    /// # Errors
    ///
    /// `TransactionError::CommitFailed` wrapping the context acquisition
    /// failure, the first participant save failure, or the context commit
    /// failure.
    pub fn commit(&self) -> Result<(), TransactionError> {
        let _cycle = self.cycle.lock();

        let context = self
            .source
            .acquire_context()
            .map_err(|e| TransactionError::CommitFailed {
                id: self.id,
                saved: 0,
                cause: e.into(),
            })?;

        let (mut context, outcome) =
            self.guarded(context, "commit", |context| self.save_all(context));
        if let Err(e) = &outcome {
            warn!(txn_id = %self.id, error = %e, "commit failed, invalidating save context");
            context.invalidate();
        }
        self.release(context);
        outcome
    }

    /// Run `work` against `context`. If it panics the context is invalidated
    /// and released, then the panic resumes.
    fn guarded<T>(
        &self,
        mut context: S::Context,
        phase: &'static str,
        work: impl FnOnce(&mut S::Context) -> T,
    ) -> (S::Context, T) {
        match panic::catch_unwind(AssertUnwindSafe(|| work(&mut context))) {
            Ok(value) => (context, value),
            Err(payload) => {
                error!(txn_id = %self.id, phase, "panic during transaction, invalidating save context");
                context.invalidate();
                self.release(context);
                panic::resume_unwind(payload)
            }
        }
    }

    fn save_all(&self, context: &mut S::Context) -> Result<(), TransactionError> {
        self.hooks.before_commit(self.id);

        let participants = self.participants.lock().clone();
        info!(txn_id = %self.id, participants = participants.len(), "committing transaction");

        for (saved, participant) in participants.iter().enumerate() {
            participant
                .save(context)
                .map_err(|e| TransactionError::CommitFailed {
                    id: self.id,
                    saved,
                    cause: e.into(),
                })?;
        }

        context
            .commit()
            .map_err(|e| TransactionError::CommitFailed {
                id: self.id,
                saved: participants.len(),
                cause: e.into(),
            })?;

        self.hooks.after_commit(self.id);
        self.forget(participants.len());
        info!(txn_id = %self.id, "transaction committed");
        Ok(())
    }

    /// Undo every participant without touching any context.
    ///
    /// Individual undo failures are logged and skipped.
    pub fn rollback(&self) {
        let _cycle = self.cycle.lock();
        self.undo_all();
    }

    /// Undo every participant, then roll back a freshly acquired context.
    ///
    /// The context is acquired first, then participants are undone, then the
    /// context rolls back. Participants are undone even when no context can
    /// be acquired; only the context rollback is skipped in that case.
    ///
    /// # Errors
    ///
    /// `TransactionError::RollbackFailed` if the context cannot be acquired
    /// or its own rollback fails. Participant undo failures are only logged.
    pub fn rollback_with_context(&self) -> Result<(), TransactionError> {
        let _cycle = self.cycle.lock();

        let context = match self.source.acquire_context() {
            Ok(context) => context,
            Err(e) => {
                warn!(txn_id = %self.id, error = %e, "no save context for rollback, undoing participants only");
                self.undo_all();
                return Err(TransactionError::RollbackFailed {
                    id: self.id,
                    cause: e.into(),
                });
            }
        };

        let (mut context, outcome) = self.guarded(context, "rollback", |context| {
            self.undo_all();
            context.rollback().map_err(|e| TransactionError::RollbackFailed {
                id: self.id,
                cause: e.into(),
            })
        });
        if let Err(e) = &outcome {
            warn!(txn_id = %self.id, error = %e, "context rollback failed, invalidating save context");
            context.invalidate();
        }
        self.release(context);
        outcome
    }

    fn undo_all(&self) {
        self.hooks.before_rollback(self.id);

        let participants = self.participants.lock().clone();
        info!(txn_id = %self.id, participants = participants.len(), "rolling back transaction");

        for (index, participant) in participants.iter().enumerate() {
            if let Err(e) = participant.undo(self.id) {
                warn!(txn_id = %self.id, index, error = %e, "participant undo failed, continuing");
            }
        }

        self.hooks.after_rollback(self.id);
        if !self.hooks.retain_after_rollback() {
            self.forget(participants.len());
        }
    }

    /// Drop the first `count` participants; later registrations survive.
    fn forget(&self, count: usize) {
        let mut participants = self.participants.lock();
        let count = count.min(participants.len());
        participants.drain(..count);
    }

    fn release(&self, context: S::Context) {
        if let Err(e) = self.source.release_context(context) {
            warn!(txn_id = %self.id, error = %e, "failed to release save context");
        }
    }
}

impl<S: ContextSource, H: TransactionHooks> fmt::Debug for Transaction<S, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("participants", &self.participant_count())
            .finish_non_exhaustive()
    }
}
