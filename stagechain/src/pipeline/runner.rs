//! One-shot helpers that build and invoke a pipeline in a single call.
//!
//! Both helpers validate their inputs synchronously and hand back the
//! pipeline's result future; nothing runs until that future is awaited.

use super::PipelineBuilder;
use crate::cancellation::CancellationToken;
use crate::errors::{PipelineError, Result};
use crate::stages::SharedMiddleware;
use futures::future::BoxFuture;
use std::future::Future;
use tracing::debug;

/// Builds a pipeline from `stages` around a context-aware root action and
/// invokes it immediately.
///
/// # Errors
///
/// * `Argument { param: "root_action" }` if `root_action` is `None`, checked
///   before anything else.
/// * `Argument { param: "stages" }` if any entry of `stages` is `None`; no
///   stage is registered or executed in that case.
pub fn run<C, R, I, S, F, Fut>(
    context: C,
    stages: I,
    root_action: Option<F>,
    cancel: CancellationToken,
) -> Result<BoxFuture<'static, R>>
where
    C: Send + 'static,
    R: Send + 'static,
    I: IntoIterator<Item = S>,
    S: Into<Option<SharedMiddleware<C, R>>>,
    F: Fn(C, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let root_action = root_action.ok_or(PipelineError::argument("root_action"))?;
    let stages = collect_stages(stages)?;

    let builder = PipelineBuilder::new();
    for stage in stages {
        builder.register(stage)?;
    }
    let pipeline = builder.build_with(root_action)?;

    debug!(stages = pipeline.stage_count(), "Running one-shot pipeline");
    Ok(pipeline.invoke(context, cancel))
}

/// Like [`run`], but the root action only receives the cancellation token.
///
/// Stages still see and may rewrite the context; the root action's output
/// does not depend on it.
///
/// # Errors
///
/// Same as [`run`].
pub fn run_ignoring_context<C, R, I, S, F, Fut>(
    context: C,
    stages: I,
    root_action: Option<F>,
    cancel: CancellationToken,
) -> Result<BoxFuture<'static, R>>
where
    C: Send + 'static,
    R: Send + 'static,
    I: IntoIterator<Item = S>,
    S: Into<Option<SharedMiddleware<C, R>>>,
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let root_action =
        root_action.map(|action| move |_context: C, cancel: CancellationToken| action(cancel));
    run(context, stages, root_action, cancel)
}

fn collect_stages<C, R, I, S>(stages: I) -> Result<Vec<SharedMiddleware<C, R>>>
where
    I: IntoIterator<Item = S>,
    S: Into<Option<SharedMiddleware<C, R>>>,
{
    stages
        .into_iter()
        .map(Into::into)
        .collect::<Option<Vec<_>>>()
        .ok_or(PipelineError::argument("stages"))
}
