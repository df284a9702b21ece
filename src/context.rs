use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CancelReason, LifxError};

/// Per-read deadline used by receive loops to poll for cancellation.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Cancellation signal and deadline carried by every blocking operation.
///
/// Clones share the same cancellation token, so cancelling one clone stops
/// every operation using any of them.
#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    poll_interval: Duration,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// Creates a context without a deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            poll_interval: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Creates a context that expires `timeout` from now.
    ///
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use std::time::Duration;
    /// use lifxlan::CallContext;
    ///
    /// let ctx = CallContext::with_timeout(Duration::ZERO);
    /// assert!(ctx.check().is_err());
    /// # }
    /// ```
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_after(timeout)
    }

    /// Wraps an existing cancellation token.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            ..Self::new()
        }
    }

    /// Tightens the deadline to at most `timeout` from now.
    #[must_use]
    pub fn deadline_after(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(candidate),
            None => candidate,
        });
        self
    }

    /// Overrides how long each socket read waits before rechecking cancellation.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns a child context that can be cancelled without affecting this one.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            poll_interval: self.poll_interval,
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every clone or child of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns why the context has ended, if it has.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        if self.token.is_cancelled() {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Fails with [`LifxError::Cancelled`] once the context has ended.
    ///
    /// # Errors
    ///
    /// Returns the cancellation reason as an error.
    pub fn check(&self) -> Result<(), LifxError> {
        match self.reason() {
            Some(reason) => Err(LifxError::Cancelled(reason)),
            None => Ok(()),
        }
    }

    /// Resolves when the context is cancelled or its deadline passes.
    pub async fn done(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.token.cancelled() => CancelReason::Cancelled,
                () = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelReason::Cancelled
            }
        }
    }
}
