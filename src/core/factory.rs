//! Resource lifecycle capability injected into a [`ResourcePool`](super::ResourcePool).

use crate::core::ResourceError;

/// Creates, validates and destroys the concrete resources a pool manages.
///
/// The pool itself is resource-agnostic; everything it knows about a database
/// connection, socket or handle comes through this trait. `create` and
/// `validate` are invoked while the pool lock is held, so they must not call
/// back into the same pool.
///
/// # Example
///
/// ```rust
/// use resource_core::core::{ResourceError, ResourceFactory};
///
/// struct Sockets;
///
/// impl ResourceFactory for Sockets {
///     type Resource = std::net::UdpSocket;
///
///     fn create(&self) -> Result<Self::Resource, ResourceError> {
///         std::net::UdpSocket::bind("127.0.0.1:0")
///             .map_err(|e| ResourceError::Creation(e.to_string()))
///     }
///
///     fn validate(&self, socket: &mut Self::Resource) -> bool {
///         socket.local_addr().is_ok()
///     }
///
///     fn destroy(&self, socket: Self::Resource) -> Result<(), ResourceError> {
///         drop(socket);
///         Ok(())
///     }
/// }
/// ```
pub trait ResourceFactory: Send + Sync + 'static {
    /// The pooled resource type.
    type Resource: Send + 'static;

    /// Create a new resource.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Creation`] (or any other variant) when the
    /// resource cannot be built; the error propagates to the acquiring caller.
    fn create(&self) -> Result<Self::Resource, ResourceError>;

    /// Check that an idle resource is still usable before handing it out.
    fn validate(&self, resource: &mut Self::Resource) -> bool;

    /// Tear a resource down.
    ///
    /// # Errors
    ///
    /// Destruction failures are logged by the pool, never propagated to callers.
    fn destroy(&self, resource: Self::Resource) -> Result<(), ResourceError>;
}

/// Resource capable of committing or discarding the work done through it.
///
/// Implemented by connection types that back a
/// [`PooledContext`](crate::core::transaction::PooledContext).
pub trait TransactionalResource: Send + 'static {
    /// Make the pending work durable.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure.
    fn commit(&mut self) -> Result<(), String>;

    /// Discard the pending work.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure.
    fn rollback(&mut self) -> Result<(), String>;
}
