//! Opens a renderer session for one URL, loads the page and guarantees release.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tracing::debug;
use url::Url;

use crate::context::ExecutionContext;
use crate::renderer::{Renderer, Session, SessionOptions};
use crate::{RenderError, Result};

/// Lifecycle of a session as it moves through [`run_in_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Loading,
    Loaded,
    Failed,
    TimedOut,
    Released,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Created => "created",
            SessionState::Loading => "loading",
            SessionState::Loaded => "loaded",
            SessionState::Failed => "failed",
            SessionState::TimedOut => "timed out",
            SessionState::Released => "released",
        };
        f.write_str(name)
    }
}

/// Future returned by the work done on a loaded session.
pub type SessionFuture<'s, T> = Pin<Box<dyn Future<Output = Result<T>> + 's>>;

/// Create a session, load `url`, wait for it, then run `action` on the loaded page.
///
/// Every step after creation runs inside `ctx`, so a deadline or cancellation
/// interrupts whichever step is in flight. The session is closed on every path,
/// including failures; an action error takes precedence over a close error.
pub async fn run_in_session<R, T, F>(
    renderer: &R,
    ctx: &ExecutionContext,
    url: &Url,
    options: &SessionOptions,
    action: F,
) -> Result<T>
where
    R: Renderer,
    F: for<'s> FnOnce(&'s mut R::Session) -> SessionFuture<'s, T>,
{
    let mut session = ctx
        .run(renderer.new_session(options))
        .await
        .map_err(|e| with_context(e, &format!("Unable to open a session for {url}")))?;
    transition(url, SessionState::Created);

    let outcome = async {
        load(&mut session, ctx, url, options).await?;
        ctx.run(action(&mut session))
            .await
            .map_err(|e| with_context(e, &format!("Unable to process {url}")))
    }
    .await;

    if let Err(err) = &outcome {
        let state = match err {
            RenderError::Timeout { .. } => SessionState::TimedOut,
            _ => SessionState::Failed,
        };
        transition(url, state);
    }

    let closed = session.close().await;
    transition(url, SessionState::Released);
    let value = outcome?;
    closed.map_err(|e| with_context(e, &format!("Unable to release the session for {url}")))?;
    Ok(value)
}

async fn load<S: Session>(
    session: &mut S,
    ctx: &ExecutionContext,
    url: &Url,
    options: &SessionOptions,
) -> Result<()> {
    transition(url, SessionState::Loading);
    debug!(url = %url, images = options.auto_load_images, "loading page");
    ctx.run(session.load(url))
        .await
        .map_err(|e| with_context(e, &format!("Unable to request {url}")))?;
    ctx.run(session.wait())
        .await
        .map_err(|e| with_context(e, &format!("Unable to load {url}")))?;
    transition(url, SessionState::Loaded);
    Ok(())
}

fn transition(url: &Url, state: SessionState) {
    debug!(url = %url, %state, "session state");
}

/// Prefix renderer failures with what was being attempted; other errors pass through.
fn with_context(err: RenderError, what: &str) -> RenderError {
    match err {
        RenderError::Renderer(msg) => RenderError::Renderer(format!("{what}: {msg}")),
        other => other,
    }
}
