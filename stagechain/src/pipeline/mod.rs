//! Pipeline building and execution.
//!
//! This module provides:
//! - The open/frozen pipeline builder
//! - The composed, immutable pipeline
//! - One-shot runners that build and invoke in a single call

mod builder;
mod composed;
pub mod runner;

pub use builder::PipelineBuilder;
pub use composed::Pipeline;
pub use runner::{run, run_ignoring_context};
