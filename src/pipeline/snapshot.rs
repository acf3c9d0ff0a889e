use std::io::Write;

use tracing::debug;
use url::Url;

use super::UrlJob;
use crate::context::ExecutionContext;
use crate::renderer::{Renderer, Session, SessionOptions};
use crate::session::run_in_session;
use crate::snapshot::{encode, validate_capture, Destination, SnapshotResolver};
use crate::{RenderError, Result};

const STDOUT_NAME: &str = "<stdout>";

/// Captures each page and writes it to stdout or a templated file.
pub struct SnapshotJob<'r, R, W> {
    renderer: &'r R,
    options: SessionOptions,
    resolver: SnapshotResolver,
    stdout: W,
}

impl<'r, R: Renderer, W: Write> SnapshotJob<'r, R, W> {
    pub fn new(renderer: &'r R, options: SessionOptions, resolver: SnapshotResolver, stdout: W) -> Self {
        Self {
            renderer,
            options,
            resolver,
            stdout,
        }
    }
}

impl<R: Renderer, W: Write> UrlJob for SnapshotJob<'_, R, W> {
    async fn process(&mut self, ctx: &ExecutionContext, url: &Url, index: usize) -> Result<()> {
        let capture = run_in_session(self.renderer, ctx, url, &self.options, |session| {
            Box::pin(session.capture())
        })
        .await?;
        validate_capture(&capture)?;

        let destination = self.resolver.destination(url, index)?;
        let name = match &destination {
            Destination::Stdout { .. } => STDOUT_NAME.to_string(),
            Destination::File { path, .. } => path.display().to_string(),
        };
        let failed = |err: RenderError| match err {
            RenderError::Io(e) => RenderError::output(url, name.as_str(), e),
            RenderError::Image(e) => RenderError::output(url, name.as_str(), e),
            other => other,
        };

        // Nothing is created on disk until the image is fully encoded.
        let mut encoded = Vec::new();
        encode(destination.format(), &mut encoded, &capture, self.resolver.quality())
            .map_err(&failed)?;

        match &destination {
            Destination::Stdout { format } => {
                debug!(%url, %format, bytes = encoded.len(), "writing snapshot to stdout");
                self.stdout
                    .write_all(&encoded)
                    .and_then(|()| self.stdout.flush())
                    .map_err(|e| failed(e.into()))?;
            }
            Destination::File { path, format } => {
                debug!(%url, %format, path = %path.display(), bytes = encoded.len(), "writing snapshot to file");
                std::fs::write(path, &encoded).map_err(|e| failed(e.into()))?;
            }
        }
        Ok(())
    }
}
