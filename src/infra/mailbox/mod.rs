//! Keyed mailboxes built on blocking queues.

pub mod registry;

pub use registry::QueueRegistry;
