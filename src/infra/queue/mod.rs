//! Queue primitives.

pub mod blocking;

pub use blocking::BlockingQueue;
