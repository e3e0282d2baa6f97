//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is threaded unchanged through every stage and
//! continuation call. Nothing in the chain polls it; stages opt in.

mod token;

pub use token::{CancelCallback, CancellationToken};
