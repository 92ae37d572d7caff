//! Call-scoped cancellation and deadlines.
//!
//! Every engine operation takes a [`CallContext`]. Store queries issued on
//! behalf of the call are raced against the context's [`CancelToken`] and
//! deadline; whichever fires first aborts the query and fails the whole
//! call. A context never shortens a result silently.

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Cooperative cancellation signal shared between a caller and a traversal.
///
/// Clones observe the same signal. Cancelling is permanent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every holder of this token.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel() is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Cancellation and deadline for one engine call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: Option<CancelToken>,
    deadline: Option<(Instant, Duration)>,
}

impl CallContext {
    /// A context with no cancellation and no explicit deadline.
    ///
    /// The engine's configured `call_timeout` still applies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fail the call if it runs longer than `timeout` from now.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some((Instant::now() + timeout, timeout));
        self
    }

    /// Whether an explicit deadline was set.
    pub fn has_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    /// Copy of this context with `timeout` applied unless a deadline is already set.
    pub(crate) fn or_timeout(&self, timeout: Option<Duration>) -> Self {
        match (self.deadline, timeout) {
            (None, Some(timeout)) => self.clone().with_timeout(timeout),
            _ => self.clone(),
        }
    }

    /// Fail fast if the call has already been cancelled or timed out.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` or `Error::DeadlineExceeded`.
    pub fn check(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        if let Some((deadline, budget)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded(budget));
            }
        }
        Ok(())
    }

    /// Run `fut` unless the call is cancelled or its deadline passes first.
    ///
    /// The losing future is dropped, which aborts an in-flight store query.
    ///
    /// # Errors
    ///
    /// Returns the future's own error, `Error::Cancelled`, or
    /// `Error::DeadlineExceeded`.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let cancellable = async {
            match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => Err(Error::Cancelled),
                        result = fut => result,
                    }
                }
                None => fut.await,
            }
        };

        match self.deadline {
            Some((deadline, budget)) => tokio::time::timeout_at(deadline, cancellable)
                .await
                .map_err(|_| Error::DeadlineExceeded(budget))?,
            None => cancellable.await,
        }
    }
}
