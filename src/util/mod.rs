//! Shared utilities.

pub mod ids;
pub mod telemetry;

pub use ids::CorrelationId;
pub use telemetry::{init_tracing, init_tracing_with_default};
