//! Cancellation token for cooperative cancellation.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// A callback type for cancellation notifications.
pub type CancelCallback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct TokenState {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
    callbacks: Mutex<Vec<CancelCallback>>,
    notify: Notify,
}

/// A token for cooperative cancellation.
///
/// Clones share the same state, so a token handed to a pipeline can be
/// cancelled from anywhere else that holds a clone. The pipeline itself never
/// inspects the token; stages and root actions decide whether to honor it.
///
/// Cancellation is idempotent - only the first cancellation reason is kept.
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// Creates a new, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason.
    ///
    /// Only the first call has an effect. Registered callbacks run on the
    /// calling thread; panics inside them are logged and suppressed.
    pub fn cancel(&self, reason: impl Into<String>) {
        {
            let mut slot = self.state.reason.lock();
            if slot.is_some() {
                return;
            }
            let reason = reason.into();
            debug!(reason = %reason, "Cancellation requested");
            *slot = Some(reason);
            self.state.cancelled.store(true, Ordering::SeqCst);
        }

        self.state.notify.notify_waiters();

        let callbacks = std::mem::take(&mut *self.state.callbacks.lock());
        for callback in callbacks {
            invoke_callback(callback);
        }
    }

    /// Registers a callback to be invoked on cancellation.
    ///
    /// If already cancelled, the callback is invoked immediately.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut callbacks = self.state.callbacks.lock();
        if self.is_cancelled() {
            drop(callbacks);
            invoke_callback(Box::new(callback));
        } else {
            callbacks.push(Box::new(callback));
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.state.reason.lock().clone()
    }

    /// Waits until cancellation is requested.
    ///
    /// Resolves immediately if the token is already cancelled.
    pub async fn cancelled(&self) {
        let notified = self.state.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Returns true if both handles refer to the same cancellation state.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

fn invoke_callback(callback: CancelCallback) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)) {
        warn!("Cancellation callback panicked: {:?}", e);
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_token_default_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn test_token_cancel() {
        let token = CancellationToken::new();
        token.cancel("User requested");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("User requested".to_string()));
    }

    #[test]
    fn test_token_cancel_idempotent() {
        let token = CancellationToken::new();
        token.cancel("First reason");
        token.cancel("Second reason");

        assert_eq!(token.reason(), Some("First reason".to_string()));
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel("from clone");

        assert!(token.is_cancelled());
        assert!(token.same_as(&clone));
        assert!(!token.same_as(&CancellationToken::new()));
    }

    #[test]
    fn test_on_cancel_before_cancellation() {
        let token = CancellationToken::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        token.on_cancel(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 0);

        token.cancel("test");
        token.cancel("again");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_cancel_after_cancellation() {
        let token = CancellationToken::new();
        token.cancel("test");

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        token.on_cancel(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_panic_suppressed() {
        let token = CancellationToken::new();

        token.on_cancel(|| {
            panic!("Intentional panic");
        });

        token.cancel("test");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            waiter.reason()
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel("shutdown");

        let reason = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .expect("task should not panic");
        assert_eq!(reason, Some("shutdown".to_string()));
    }

    #[tokio::test]
    async fn test_cancelled_immediate_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel("done");

        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("should resolve immediately");
    }
}
