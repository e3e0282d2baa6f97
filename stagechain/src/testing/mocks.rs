//! Mock middleware for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cancellation::CancellationToken;
use crate::stages::{Middleware, Next};

/// A shared, ordered log of events written by test middleware.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns a copy of all entries in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns true if an entry equal to `entry` was recorded.
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().iter().any(|e| e == entry)
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// A middleware that records `"<name>:before"` and `"<name>:after"` around
/// its delegation.
#[derive(Debug)]
pub struct RecordingMiddleware {
    name: String,
    log: ExecutionLog,
}

impl RecordingMiddleware {
    /// Creates a recording middleware writing to `log`.
    #[must_use]
    pub fn new(name: impl Into<String>, log: ExecutionLog) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

#[async_trait]
impl<C, R> Middleware<C, R> for RecordingMiddleware
where
    C: Send + 'static,
    R: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, context: C, next: Next<C, R>, cancel: CancellationToken) -> R {
        self.log.push(format!("{}:before", self.name));
        let result = next.run(context, cancel).await;
        self.log.push(format!("{}:after", self.name));
        result
    }
}

/// A middleware that never delegates and returns a fixed value.
#[derive(Debug)]
pub struct ShortCircuitMiddleware<R> {
    value: R,
    call_count: AtomicUsize,
}

impl<R> ShortCircuitMiddleware<R> {
    /// Creates a middleware that always answers with `value`.
    #[must_use]
    pub fn new(value: R) -> Self {
        Self {
            value,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Returns the number of times the middleware ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C, R> Middleware<C, R> for ShortCircuitMiddleware<R>
where
    C: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "short_circuit"
    }

    async fn process(&self, _context: C, _next: Next<C, R>, _cancel: CancellationToken) -> R {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.value.clone()
    }
}

/// A middleware that checks it received a particular cancellation token.
#[derive(Debug)]
pub struct TokenProbe {
    expected: CancellationToken,
    matched: AtomicUsize,
    mismatched: AtomicUsize,
}

impl TokenProbe {
    /// Creates a probe expecting `expected`.
    #[must_use]
    pub fn new(expected: CancellationToken) -> Self {
        Self {
            expected,
            matched: AtomicUsize::new(0),
            mismatched: AtomicUsize::new(0),
        }
    }

    /// Returns how many invocations received the expected token.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.matched.load(Ordering::SeqCst)
    }

    /// Returns how many invocations received a different token.
    #[must_use]
    pub fn mismatched(&self) -> usize {
        self.mismatched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C, R> Middleware<C, R> for TokenProbe
where
    C: Send + 'static,
    R: Send + 'static,
{
    fn name(&self) -> &str {
        "token_probe"
    }

    async fn process(&self, context: C, next: Next<C, R>, cancel: CancellationToken) -> R {
        if cancel.same_as(&self.expected) {
            self.matched.fetch_add(1, Ordering::SeqCst);
        } else {
            self.mismatched.fetch_add(1, Ordering::SeqCst);
        }
        next.run(context, cancel).await
    }
}

/// A middleware that sleeps before delegating.
#[derive(Debug)]
pub struct SlowMiddleware {
    delay: Duration,
}

impl SlowMiddleware {
    /// Creates a slow middleware.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Creates a slow middleware with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait]
impl<C, R> Middleware<C, R> for SlowMiddleware
where
    C: Send + 'static,
    R: Send + 'static,
{
    fn name(&self) -> &str {
        "slow"
    }

    async fn process(&self, context: C, next: Next<C, R>, cancel: CancellationToken) -> R {
        tokio::time::sleep(self.delay).await;
        next.run(context, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineBuilder;
    use crate::stages::SharedMiddleware;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_recording_middleware_brackets_downstream() {
        let log = ExecutionLog::new();
        let builder = PipelineBuilder::<(), ()>::new();
        let stage: SharedMiddleware<(), ()> =
            Arc::new(RecordingMiddleware::new("a", log.clone()));
        builder.register(stage).unwrap();

        let inner = log.clone();
        let pipeline = builder
            .build_with(move |(), _| {
                inner.push("root");
                async {}
            })
            .unwrap();
        pipeline.invoke((), CancellationToken::new()).await;

        assert_eq!(log.entries(), vec!["a:before", "root", "a:after"]);
    }

    #[tokio::test]
    async fn test_short_circuit_counts_calls() {
        let stage = Arc::new(ShortCircuitMiddleware::new(9_i32));
        let shared: SharedMiddleware<i32, i32> = stage.clone();
        let builder = PipelineBuilder::new();
        builder.register(shared).unwrap();
        let pipeline = builder.build().unwrap();

        assert_eq!(pipeline.invoke(1, CancellationToken::new()).await, 9);
        assert_eq!(pipeline.invoke(2, CancellationToken::new()).await, 9);
        assert_eq!(stage.call_count(), 2);
    }

    #[tokio::test]
    async fn test_slow_middleware_still_delegates() {
        let builder = PipelineBuilder::<u8, u8>::new();
        let stage: SharedMiddleware<u8, u8> = Arc::new(SlowMiddleware::with_delay_ms(5));
        builder.register(stage).unwrap();
        let pipeline = builder.build_with(|c: u8, _| async move { c }).unwrap();

        assert_eq!(pipeline.invoke(4, CancellationToken::new()).await, 4);
    }

    #[test]
    fn test_execution_log_clear() {
        let log = ExecutionLog::new();
        log.push("x");
        assert!(log.contains("x"));
        log.clear();
        assert!(log.entries().is_empty());
    }
}
