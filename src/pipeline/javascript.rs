use std::io::Write;
use std::path::Path;

use tracing::debug;
use url::Url;

use super::UrlJob;
use crate::classify::{render_script_result, type_name};
use crate::context::ExecutionContext;
use crate::output::OutputFormatter;
use crate::renderer::{Renderer, Session, SessionOptions};
use crate::session::run_in_session;
use crate::{RenderError, Result};

/// Script text for `--js`: the contents of the named file when one exists,
/// otherwise the argument itself.
pub fn resolve_script(js: &str) -> Result<String> {
    let path = Path::new(js);
    if path.is_file() {
        debug!(path = %path.display(), "reading script from file");
        std::fs::read_to_string(path).map_err(|e| {
            RenderError::Config(format!("Could not read script file {}: {e}", path.display()))
        })
    } else {
        Ok(js.to_string())
    }
}

/// Evaluates one script in every page and prints each result.
pub struct JavascriptJob<'r, R, W> {
    renderer: &'r R,
    options: SessionOptions,
    script: String,
    formatter: OutputFormatter,
    out: W,
}

impl<'r, R: Renderer, W: Write> JavascriptJob<'r, R, W> {
    pub fn new(
        renderer: &'r R,
        options: SessionOptions,
        script: String,
        formatter: OutputFormatter,
        out: W,
    ) -> Self {
        Self {
            renderer,
            options,
            script,
            formatter,
            out,
        }
    }
}

impl<R: Renderer, W: Write> UrlJob for JavascriptJob<'_, R, W> {
    async fn process(&mut self, ctx: &ExecutionContext, url: &Url, _index: usize) -> Result<()> {
        let script = self.script.clone();
        let value = run_in_session(self.renderer, ctx, url, &self.options, move |session| {
            Box::pin(async move { session.evaluate(&script).await })
        })
        .await?;
        debug!(%url, kind = type_name(&value), "script returned");

        let text = render_script_result(&value, &self.formatter)?;
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{run_batch, BatchOptions};
    use crate::renderer::FixtureRenderer;
    use crate::url_source::UrlSource;

    fn renderer() -> FixtureRenderer {
        FixtureRenderer::from_json(
            r#"{
                "default": {"scriptResult": "plain"},
                "pages": {
                    "map.test": {"scriptResult": {"links": 2}},
                    "num.test": {"scriptResult": 42},
                    "nil.test": {"scriptResult": null}
                }
            }"#,
        )
        .unwrap()
    }

    async fn run(urls: &[&str], template: &str) -> String {
        let renderer = renderer();
        let mut job = JavascriptJob::new(
            &renderer,
            SessionOptions::default(),
            "collect()".into(),
            OutputFormatter::new(template).unwrap(),
            Vec::new(),
        );
        let mut source = UrlSource::from_args(urls.iter().map(|u| u.to_string()).collect()).unwrap();
        run_batch(&mut source, &mut job, &BatchOptions::default()).await.unwrap();
        String::from_utf8(job.out).unwrap()
    }

    #[tokio::test]
    async fn scalars_print_directly_and_maps_as_json() {
        let out = run(&["num.test", "other.test", "nil.test", "map.test"], "").await;
        assert_eq!(out, "42\nplain\nnull\n{\n\t\"links\": 2\n}\n");
    }

    #[tokio::test]
    async fn templates_apply_to_structured_results() {
        let out = run(&["map.test", "num.test"], "{{.links}} links").await;
        assert_eq!(out, "2 links\n42\n");
    }

    #[test]
    fn script_argument_may_name_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "document.title").unwrap();
        let path = file.path().to_string_lossy().into_owned();
        assert_eq!(resolve_script(&path).unwrap(), "document.title");
        assert_eq!(resolve_script("1 + 1").unwrap(), "1 + 1");
        assert_eq!(
            resolve_script("/no/such/dir/script.js").unwrap(),
            "/no/such/dir/script.js"
        );
    }
}
