//! Drives one job over every URL from a [`UrlSource`], strictly in order.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use url::Url;

use crate::context::ExecutionContext;
use crate::url_source::UrlSource;
use crate::{RenderError, Result};

mod javascript;
mod metadata;
mod snapshot;

pub use javascript::{resolve_script, JavascriptJob};
pub use metadata::MetadataJob;
pub use snapshot::SnapshotJob;

/// What to do when processing a URL fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first failing URL.
    #[default]
    Abort,
    /// Report the failure and move on; the run still fails at the end.
    Continue,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Budget for each URL, from session creation to the last output byte.
    pub timeout: Option<Duration>,
    pub error_policy: ErrorPolicy,
    /// Cancelling this stops the batch and interrupts the URL in flight.
    pub shutdown: CancellationToken,
}

/// Work done for one URL.
#[allow(async_fn_in_trait)]
pub trait UrlJob {
    async fn process(&mut self, ctx: &ExecutionContext, url: &Url, index: usize) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub failures: Vec<(Url, RenderError)>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.processed - self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Process every URL in order, one at a time.
///
/// Bad input URLs and cancellation always end the run with an error. Other
/// failures follow `options.error_policy`.
pub async fn run_batch<J: UrlJob>(
    source: &mut UrlSource,
    job: &mut J,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    while let Some(next) = next_url(source, &options.shutdown).await {
        let url = next?;
        let index = summary.processed;
        summary.processed += 1;

        let ctx = ExecutionContext::with_parent(&options.shutdown, url.as_str(), options.timeout);
        debug!(%url, index, "processing");
        match job.process(&ctx, &url, index).await {
            Ok(()) => {}
            Err(err @ RenderError::Cancelled(_)) => return Err(err),
            Err(err) if options.error_policy == ErrorPolicy::Abort => return Err(err),
            Err(err) => {
                error!(%url, "{err}");
                summary.failures.push((url, err));
            }
        }
    }

    if options.shutdown.is_cancelled() {
        return Err(RenderError::Cancelled("remaining URLs".into()));
    }
    Ok(summary)
}

async fn next_url(source: &mut UrlSource, shutdown: &CancellationToken) -> Option<Result<Url>> {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        next = source.next() => next,
    }
}
