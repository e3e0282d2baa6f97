//! Middleware trait and continuation handles.
//!
//! A middleware stage receives the current context, a single-use handle to
//! the rest of the chain, and the cancellation token. It may transform the
//! context, delegate through [`Next::run`], post-process the downstream
//! result, or return early without delegating.

use crate::cancellation::CancellationToken;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

/// A composed continuation: everything downstream of some point in the chain.
pub type Continuation<C, R> =
    Arc<dyn Fn(C, CancellationToken) -> BoxFuture<'static, R> + Send + Sync>;

/// A shareable, type-erased middleware stage.
pub type SharedMiddleware<C, R> = Arc<dyn Middleware<C, R>>;

/// Trait for pipeline stages.
#[async_trait]
pub trait Middleware<C, R>: Send + Sync {
    /// Returns a label for the stage, used in log records.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Processes the context.
    ///
    /// Calling `next.run(..)` delegates to the remaining chain; returning
    /// without calling it short-circuits and the returned value becomes the
    /// pipeline's result.
    async fn process(&self, context: C, next: Next<C, R>, cancel: CancellationToken) -> R;
}

/// Handle to the remainder of the chain, handed to each stage invocation.
///
/// `run` consumes the handle, so a stage can delegate at most once per
/// invocation.
pub struct Next<C, R> {
    downstream: Continuation<C, R>,
}

impl<C, R> Next<C, R> {
    pub(crate) fn new(downstream: Continuation<C, R>) -> Self {
        Self { downstream }
    }

    /// Runs the remaining chain with the given context and token.
    pub fn run(self, context: C, cancel: CancellationToken) -> BoxFuture<'static, R> {
        (self.downstream)(context, cancel)
    }
}

impl<C, R> Debug for Next<C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// An async function-based stage.
pub struct FnMiddleware<F> {
    name: String,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Wraps a function, labelling it with its type name.
    pub fn new(func: F) -> Self {
        Self {
            name: std::any::type_name::<F>().to_string(),
            func,
        }
    }

    /// Wraps a function under an explicit label.
    pub fn named(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<C, R, F, Fut> Middleware<C, R> for FnMiddleware<F>
where
    C: Send + 'static,
    R: Send + 'static,
    F: Fn(C, Next<C, R>, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, context: C, next: Next<C, R>, cancel: CancellationToken) -> R {
        (self.func)(context, next, cancel).await
    }
}

/// Partially applies a stage to its downstream continuation.
pub(crate) fn wrap_stage<C, R>(
    stage: SharedMiddleware<C, R>,
    downstream: Continuation<C, R>,
) -> Continuation<C, R>
where
    C: Send + 'static,
    R: Send + 'static,
{
    Arc::new(move |context: C, cancel: CancellationToken| {
        let stage = Arc::clone(&stage);
        let next = Next::new(Arc::clone(&downstream));
        async move { stage.process(context, next, cancel).await }.boxed()
    })
}

/// Turns a root action into the innermost continuation.
pub(crate) fn terminal<C, R, F, Fut>(root: F) -> Continuation<C, R>
where
    C: Send + 'static,
    R: Send + 'static,
    F: Fn(C, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let root = Arc::new(root);
    Arc::new(move |context: C, cancel: CancellationToken| {
        let root = Arc::clone(&root);
        async move { root(context, cancel).await }.boxed()
    })
}

/// The innermost continuation used when no root action is supplied.
pub(crate) fn default_terminal<C, R>() -> Continuation<C, R>
where
    C: Send + 'static,
    R: Default + Send + 'static,
{
    Arc::new(|_context: C, _cancel: CancellationToken| futures::future::ready(R::default()).boxed())
}
