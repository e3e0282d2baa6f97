//! Testing utilities for stagechain pipelines.
//!
//! This module provides:
//! - Mock middleware that records, short-circuits, or probes tokens
//! - A tracing subscriber initializer for tests

mod mocks;

pub use mocks::{
    ExecutionLog, RecordingMiddleware, ShortCircuitMiddleware, SlowMiddleware, TokenProbe,
};

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
