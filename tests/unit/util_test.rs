//! Tests for utility functions

use resource_core::util::{init_tracing, init_tracing_with_default, CorrelationId};
use std::collections::HashSet;

#[test]
fn test_correlation_ids_unique() {
    let ids: HashSet<_> = (0..1000).map(|_| CorrelationId::new()).collect();
    assert_eq!(ids.len(), 1000);
}

#[test]
fn test_correlation_id_serde_is_plain_uuid() {
    let id = CorrelationId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id));
    let back: CorrelationId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
    assert_eq!(back.as_uuid(), id.as_uuid());
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing_with_default("debug");
    init_tracing();
    tracing::info!("tracing initialised");
}
