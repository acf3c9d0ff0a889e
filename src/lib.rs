//! Render Library
//!
//! Loads web pages in a headless browser and reports on them: snapshots,
//! JavaScript evaluation results and page metadata. URLs are processed one at
//! a time, strictly in input order.
//!
//! # Module Overview
//!
//! - [`url_source`] - URL normalization and the lazy URL stream
//! - [`renderer`] - Renderer sessions (Playwright, fixtures)
//! - [`session`] - Session lifecycle: create, load, act, release
//! - [`context`] - Per-URL deadline and cancellation scope
//! - [`pipeline`] - Batch driver and the snapshot/javascript/metadata jobs
//! - [`snapshot`] - Output destinations and image encoding
//! - [`output`] - JSON/template result formatting
//! - [`template`] - The small text template language used by `--format` and `--output`
//! - [`config`] - Configuration file support
//!
//! # Example
//!
//! ```no_run
//! use render_lib::pipeline::{run_batch, BatchOptions, MetadataJob};
//! use render_lib::renderer::{PlaywrightRenderer, RendererOptions, SessionOptions};
//! use render_lib::{OutputFormatter, UrlSource};
//!
//! # async fn example() -> render_lib::Result<()> {
//! let renderer = PlaywrightRenderer::connect(RendererOptions::default()).await?;
//! let formatter = OutputFormatter::new("{{.Title}}")?;
//! let mut job = MetadataJob::new(&renderer, SessionOptions::default(), formatter, std::io::stdout());
//! let mut urls = UrlSource::from_args(vec!["example.com".into()])?;
//! run_batch(&mut urls, &mut job, &BatchOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod renderer;
pub mod session;
pub mod snapshot;
pub mod template;
pub mod url_source;
pub mod viewport;

pub use config::Config;
pub use context::ExecutionContext;
pub use error::{RenderError, Result};
pub use metadata::{Metadata, Timing};
pub use output::{format_value, to_indented_json, OutputFormatter};
pub use pipeline::{run_batch, BatchOptions, BatchSummary, ErrorPolicy, UrlJob};
pub use renderer::{Capture, PageInfo, Renderer, RendererOptions, Session, SessionOptions};
pub use snapshot::{Destination, SnapshotFormat, SnapshotResolver};
pub use template::{Template, TemplateError};
pub use url_source::{normalize_url, parse_args, UrlSource};
pub use viewport::{Viewport, ViewportParseError};
