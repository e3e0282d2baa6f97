//! # Stagechain
//!
//! Composable async middleware pipelines.
//!
//! A pipeline is an ordered chain of stages. Each stage receives a context
//! value, a single-use handle to the rest of the chain and a cancellation
//! token, and resolves to a result:
//!
//! - **Delegation**: call `next.run(context, cancel)` and optionally
//!   post-process what comes back
//! - **Short-circuit**: return a value without calling `next`
//! - **Ordering**: the first registered stage runs first and finishes last
//! - **Cancellation**: the token is forwarded untouched; stages opt in
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagechain::prelude::*;
//!
//! let builder = PipelineBuilder::new();
//! builder
//!     .register_fn(|ctx: String, next: Next<String, String>, cancel| {
//!         next.run(format!("{ctx}-A"), cancel)
//!     })?
//!     .register_fn(|ctx: String, next: Next<String, String>, cancel| {
//!         next.run(format!("{ctx}-B"), cancel)
//!     })?;
//!
//! let pipeline = builder.build_with(|ctx: String, _cancel| async move { ctx })?;
//! let result = pipeline.invoke("Hello".into(), CancellationToken::new()).await;
//! assert_eq!(result, "Hello-A-B");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod errors;
pub mod pipeline;
pub mod registry;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::errors::{Operation, PipelineError};
    pub use crate::pipeline::{run, run_ignoring_context, Pipeline, PipelineBuilder};
    pub use crate::registry::{BuilderRegistry, BuilderScope, Lifetime, RegistryConfig};
    pub use crate::stages::{FnMiddleware, Middleware, Next, SharedMiddleware};
}
