//! Cancellable, optionally deadline-bound scope for one URL's work.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{RenderError, Result};

/// Created per URL and never shared across URLs. Dropping the context cancels it.
#[derive(Debug)]
pub struct ExecutionContext {
    label: String,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    token: CancellationToken,
    _guard: DropGuard,
}

impl ExecutionContext {
    /// The deadline starts counting now.
    pub fn new(label: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self::with_parent(&CancellationToken::new(), label, timeout)
    }

    /// Like [`ExecutionContext::new`], but also cancelled when `parent` is.
    pub fn with_parent(
        parent: &CancellationToken,
        label: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        let token = parent.child_token();
        Self {
            label: label.into(),
            timeout,
            deadline: timeout.map(|t| Instant::now() + t),
            _guard: token.clone().drop_guard(),
            token,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Handle for cancelling from elsewhere, e.g. a Ctrl-C listener.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `fut` until it completes, the deadline passes or the context is cancelled.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(RenderError::Cancelled(self.label.clone())),
            _ = deadline => Err(RenderError::Timeout {
                url: self.label.clone(),
                after: self.timeout.unwrap_or_default(),
            }),
            result = fut => result,
        }
    }
}
