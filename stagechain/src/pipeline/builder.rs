//! Pipeline builder with a one-way freeze.

use super::Pipeline;
use crate::cancellation::CancellationToken;
use crate::errors::{Operation, PipelineError, Result};
use crate::stages::{
    default_terminal, terminal, wrap_stage, Continuation, FnMiddleware, Next, SharedMiddleware,
};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

enum BuilderState<C, R> {
    Open(Vec<SharedMiddleware<C, R>>),
    Frozen,
}

/// Builder for composing middleware stages into a [`Pipeline`].
///
/// Stages run in registration order: the first registered stage is the
/// outermost one. All methods take `&self`; registration and building are
/// serialized by a single lock, so a builder can be shared across tasks.
/// Building moves the stage list out of the builder, after which every
/// further `register` or `build` fails with [`PipelineError::InvalidState`].
pub struct PipelineBuilder<C, R> {
    state: Mutex<BuilderState<C, R>>,
}

impl<C, R> PipelineBuilder<C, R>
where
    C: Send + 'static,
    R: Send + 'static,
{
    /// Creates a new, open builder with no stages.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BuilderState::Open(Vec::new())),
        }
    }

    /// Appends a stage to the chain.
    ///
    /// Accepts either a [`SharedMiddleware`] or an `Option` of one; `None`
    /// is rejected with an argument error naming `stage`.
    pub fn register<S>(&self, stage: S) -> Result<&Self>
    where
        S: Into<Option<SharedMiddleware<C, R>>>,
    {
        let Some(stage) = stage.into() else {
            return Err(PipelineError::argument("stage"));
        };

        let mut state = self.state.lock();
        match &mut *state {
            BuilderState::Open(stages) => {
                debug!(stage = stage.name(), position = stages.len(), "Registered stage");
                stages.push(stage);
                Ok(self)
            }
            BuilderState::Frozen => {
                warn!(stage = stage.name(), "Rejected registration on a built pipeline");
                Err(PipelineError::invalid_state(
                    Operation::Register,
                    "pipeline has already been built",
                ))
            }
        }
    }

    /// Appends an async function as a stage.
    pub fn register_fn<F, Fut>(&self, func: F) -> Result<&Self>
    where
        F: Fn(C, Next<C, R>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let stage: SharedMiddleware<C, R> = Arc::new(FnMiddleware::new(func));
        self.register(stage)
    }

    /// Freezes the builder and composes the pipeline.
    ///
    /// When no stage short-circuits, the pipeline resolves to `R::default()`.
    pub fn build(&self) -> Result<Pipeline<C, R>>
    where
        R: Default,
    {
        self.compose(default_terminal(), "default")
    }

    /// Freezes the builder and composes the pipeline around a root action.
    ///
    /// The root action is the innermost continuation: it receives the context
    /// as left by the last stage that delegated.
    pub fn build_with<F, Fut>(&self, root_action: F) -> Result<Pipeline<C, R>>
    where
        F: Fn(C, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        self.compose(terminal(root_action), "root_action")
    }

    fn compose(
        &self,
        innermost: Continuation<C, R>,
        terminal_kind: &'static str,
    ) -> Result<Pipeline<C, R>> {
        let stages = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, BuilderState::Frozen) {
                BuilderState::Open(stages) => stages,
                BuilderState::Frozen => {
                    warn!("Rejected second build");
                    return Err(PipelineError::invalid_state(
                        Operation::Build,
                        "pipeline has already been built",
                    ));
                }
            }
        };

        let stage_count = stages.len();
        let chain = stages
            .into_iter()
            .rev()
            .fold(innermost, |downstream, stage| wrap_stage(stage, downstream));

        debug!(stages = stage_count, terminal = terminal_kind, "Built pipeline");
        Ok(Pipeline::new(chain, stage_count))
    }

    /// Returns the number of registered stages (zero once frozen).
    #[must_use]
    pub fn len(&self) -> usize {
        match &*self.state.lock() {
            BuilderState::Open(stages) => stages.len(),
            BuilderState::Frozen => 0,
        }
    }

    /// Returns true if no stages are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the pipeline has been built.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        matches!(&*self.state.lock(), BuilderState::Frozen)
    }
}

impl<C, R> Default for PipelineBuilder<C, R>
where
    C: Send + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, R> std::fmt::Debug for PipelineBuilder<C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        let mut dbg = f.debug_struct("PipelineBuilder");
        match &*state {
            BuilderState::Open(stages) => dbg
                .field("state", &"open")
                .field("stages", &stages.iter().map(|s| s.name()).collect::<Vec<_>>()),
            BuilderState::Frozen => dbg.field("state", &"frozen"),
        };
        dbg.finish()
    }
}
