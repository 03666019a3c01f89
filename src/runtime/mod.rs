//! Runtime adapters for async callers.

#[cfg(feature = "tokio-runtime")]
pub mod bridge;

#[cfg(feature = "tokio-runtime")]
pub use bridge::{acquire_async, dequeue_async};
