use std::io;

use render_lib::pipeline::{resolve_script, JavascriptJob, MetadataJob, SnapshotJob};
use render_lib::renderer::Renderer;
use render_lib::{
    parse_args, run_batch, BatchSummary, OutputFormatter, Result, SnapshotResolver, UrlSource,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cli::Commands;
use crate::settings::RunSettings;

/// A subcommand with its templates compiled and its script read, ready to run.
///
/// Preparing happens before the renderer is started so that bad flags,
/// templates and URL arguments fail without launching a browser.
pub enum Prepared {
    Snapshot {
        resolver: SnapshotResolver,
        load_images: bool,
        urls: Vec<Url>,
    },
    Javascript {
        script: String,
        formatter: OutputFormatter,
        load_images: bool,
        urls: Vec<Url>,
    },
    Metadata {
        formatter: OutputFormatter,
        load_images: bool,
        urls: Vec<Url>,
    },
}

impl Prepared {
    pub fn from_command(command: Commands) -> Result<Self> {
        Ok(match command {
            Commands::Snapshot {
                format,
                quality,
                output,
                noimages,
                urls,
            } => Prepared::Snapshot {
                resolver: SnapshotResolver::new(format, output.as_deref(), quality)?,
                load_images: !noimages,
                urls: parse_args(&urls)?,
            },
            Commands::Javascript {
                js,
                format,
                images,
                urls,
            } => Prepared::Javascript {
                script: resolve_script(&js)?,
                formatter: OutputFormatter::new(&format)?,
                load_images: images,
                urls: parse_args(&urls)?,
            },
            Commands::Metadata {
                format,
                images,
                urls,
            } => Prepared::Metadata {
                formatter: OutputFormatter::new(&format)?,
                load_images: images,
                urls: parse_args(&urls)?,
            },
        })
    }

    /// Process every URL with `renderer`, writing results to stdout.
    pub async fn run<R: Renderer>(
        self,
        renderer: &R,
        settings: &RunSettings,
        shutdown: CancellationToken,
    ) -> Result<BatchSummary> {
        let options = settings.batch_options(shutdown);
        match self {
            Prepared::Snapshot {
                resolver,
                load_images,
                urls,
            } => {
                let mut source = UrlSource::from_urls_or_stdin(urls);
                let mut job = SnapshotJob::new(
                    renderer,
                    settings.session_options(load_images),
                    resolver,
                    io::stdout(),
                );
                run_batch(&mut source, &mut job, &options).await
            }
            Prepared::Javascript {
                script,
                formatter,
                load_images,
                urls,
            } => {
                let mut source = UrlSource::from_urls_or_stdin(urls);
                let mut job = JavascriptJob::new(
                    renderer,
                    settings.session_options(load_images),
                    script,
                    formatter,
                    io::stdout(),
                );
                run_batch(&mut source, &mut job, &options).await
            }
            Prepared::Metadata {
                formatter,
                load_images,
                urls,
            } => {
                let mut source = UrlSource::from_urls_or_stdin(urls);
                let mut job = MetadataJob::new(
                    renderer,
                    settings.session_options(load_images),
                    formatter,
                    io::stdout(),
                );
                run_batch(&mut source, &mut job, &options).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use render_lib::RenderError;

    use crate::cli::Cli;

    fn prepare(args: &[&str]) -> Result<Prepared> {
        let mut argv = vec!["render"];
        argv.extend_from_slice(args);
        Prepared::from_command(Cli::parse_from(argv).command)
    }

    #[test]
    fn image_flags_map_to_load_images() {
        match prepare(&["snapshot", "a.test"]).unwrap() {
            Prepared::Snapshot { load_images, .. } => assert!(load_images),
            _ => panic!("expected snapshot"),
        }
        match prepare(&["snapshot", "--noimages"]).unwrap() {
            Prepared::Snapshot { load_images, .. } => assert!(!load_images),
            _ => panic!("expected snapshot"),
        }
        match prepare(&["metadata"]).unwrap() {
            Prepared::Metadata { load_images, .. } => assert!(!load_images),
            _ => panic!("expected metadata"),
        }
        match prepare(&["javascript", "--js", "1", "--images"]).unwrap() {
            Prepared::Javascript { load_images, .. } => assert!(load_images),
            _ => panic!("expected javascript"),
        }
    }

    #[test]
    fn url_arguments_are_parsed_before_any_rendering() {
        match prepare(&["metadata", "example.com", "b.test:81/x"]).unwrap() {
            Prepared::Metadata { urls, .. } => {
                let urls: Vec<&str> = urls.iter().map(Url::as_str).collect();
                assert_eq!(urls, vec!["http://example.com/", "http://b.test:81/x"]);
            }
            _ => panic!("expected metadata"),
        }
        let err = prepare(&["snapshot", "example.com", "http://bad host"]).err().unwrap();
        assert!(matches!(err, RenderError::InvalidUrl { .. }));
    }

    #[test]
    fn bad_templates_fail_before_any_rendering() {
        let err = prepare(&["metadata", "--format", "{{.Title"]).err().unwrap();
        assert!(matches!(err, RenderError::Template(_)));
        let err = prepare(&["snapshot", "--output", "{{nope .Host}}"]).err().unwrap();
        assert!(matches!(err, RenderError::Template(_)));
    }
}
