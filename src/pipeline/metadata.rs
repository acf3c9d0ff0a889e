use std::io::Write;

use url::Url;

use super::UrlJob;
use crate::context::ExecutionContext;
use crate::metadata::{Metadata, Timing};
use crate::output::OutputFormatter;
use crate::renderer::{Renderer, Session, SessionOptions};
use crate::session::run_in_session;
use crate::Result;

/// Prints title, final URI and load timings for every page.
pub struct MetadataJob<'r, R, W> {
    renderer: &'r R,
    options: SessionOptions,
    formatter: OutputFormatter,
    out: W,
}

impl<'r, R: Renderer, W: Write> MetadataJob<'r, R, W> {
    pub fn new(renderer: &'r R, options: SessionOptions, formatter: OutputFormatter, out: W) -> Self {
        Self {
            renderer,
            options,
            formatter,
            out,
        }
    }
}

impl<R: Renderer, W: Write> UrlJob for MetadataJob<'_, R, W> {
    async fn process(&mut self, ctx: &ExecutionContext, url: &Url, _index: usize) -> Result<()> {
        let info = run_in_session(self.renderer, ctx, url, &self.options, |session| {
            Box::pin(session.page_info())
        })
        .await?;

        let metadata = Metadata {
            title: info.title,
            uri: info.uri,
            timing: Timing::from_durations(info.time_to_start, info.time_to_load, info.time_to_finish),
        };
        writeln!(self.out, "{}", self.formatter.format(&metadata)?)?;
        self.out.flush()?;
        Ok(())
    }
}
