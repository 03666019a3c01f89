//! Hand-off queues and the keyed mailbox registry.

pub mod mailbox;
pub mod queue;

pub use mailbox::QueueRegistry;
pub use queue::BlockingQueue;
