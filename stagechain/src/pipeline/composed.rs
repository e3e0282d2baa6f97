//! The immutable, composed pipeline.

use crate::cancellation::CancellationToken;
use crate::stages::Continuation;
use futures::future::BoxFuture;
use tracing::trace;

/// A composed middleware chain.
///
/// Produced once by [`PipelineBuilder::build`](super::PipelineBuilder::build).
/// Holds no mutable state; clones share the same chain and may be invoked
/// concurrently without limit.
pub struct Pipeline<C, R> {
    chain: Continuation<C, R>,
    stage_count: usize,
}

impl<C, R> Pipeline<C, R> {
    pub(crate) fn new(chain: Continuation<C, R>, stage_count: usize) -> Self {
        Self { chain, stage_count }
    }

    /// Runs the full chain.
    ///
    /// The token is forwarded unchanged to every stage and to the root
    /// action; the pipeline itself never checks it.
    pub fn invoke(&self, context: C, cancel: CancellationToken) -> BoxFuture<'static, R> {
        trace!(stages = self.stage_count, cancelled = cancel.is_cancelled(), "Invoking pipeline");
        (self.chain)(context, cancel)
    }

    /// Runs the full chain with a fresh, never-cancelled token.
    pub fn invoke_default_token(&self, context: C) -> BoxFuture<'static, R> {
        self.invoke(context, CancellationToken::new())
    }

    /// Returns the number of stages in the chain, excluding the root action.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stage_count
    }
}

impl<C, R> Clone for Pipeline<C, R> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            stage_count: self.stage_count,
        }
    }
}

impl<C, R> std::fmt::Debug for Pipeline<C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stage_count", &self.stage_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::pipeline::PipelineBuilder;
    use crate::stages::Next;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_pipeline_is_reusable() {
        let builder = PipelineBuilder::new();
        builder
            .register_fn(|ctx: u32, next: Next<u32, u32>, cancel| next.run(ctx * 3, cancel))
            .unwrap();
        let pipeline = builder.build_with(|ctx: u32, _| async move { ctx + 1 }).unwrap();

        for _ in 0..3 {
            assert_eq!(pipeline.invoke_default_token(2).await, 7);
        }
    }

    #[tokio::test]
    async fn test_clones_run_concurrently() {
        let builder = PipelineBuilder::new();
        builder
            .register_fn(|ctx: u64, next: Next<u64, u64>, cancel| async move {
                tokio::task::yield_now().await;
                next.run(ctx + 1, cancel).await
            })
            .unwrap();
        let pipeline = builder.build_with(|ctx: u64, _| async move { ctx * 10 }).unwrap();

        let handles: Vec<_> = (0..20u64)
            .map(|i| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.invoke(i, CancellationToken::new()).await })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), (i as u64 + 1) * 10);
        }
    }

    #[test]
    fn test_debug_shows_stage_count() {
        let pipeline = PipelineBuilder::<(), ()>::new().build().unwrap();
        assert_eq!(format!("{pipeline:?}"), "Pipeline { stage_count: 0 }");
    }
}
