//! Page renderer abstraction and its backends.
//!
//! A [`Renderer`] creates one [`Session`] per URL. A session loads a single
//! page and answers questions about it until it is closed.
//!
//! - [`playwright`] - Node.js helper process driving Playwright's Chromium
//! - [`fixture`] - canned pages described in a JSON file, for tests and demos
//!
//! # Example
//!
//! ```no_run
//! use render_lib::renderer::{PlaywrightRenderer, Renderer, RendererOptions, Session, SessionOptions};
//! use render_lib::url_source::normalize_url;
//!
//! # async fn example() -> render_lib::Result<()> {
//! let renderer = PlaywrightRenderer::connect(RendererOptions::default()).await?;
//! let mut session = renderer.new_session(&SessionOptions::default()).await?;
//! session.load(&normalize_url("example.com")?).await?;
//! session.wait().await?;
//! println!("{}", session.page_info().await?.title);
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::{Result, Viewport};

pub mod fixture;
pub mod playwright;

pub use fixture::{FixtureEvent, FixtureRenderer};
pub use playwright::{PlaywrightRenderer, PlaywrightSession};

/// Process-wide renderer settings.
#[derive(Debug, Clone)]
pub struct RendererOptions {
    /// The Node.js command used to run the helper (default: "node").
    pub node_command: String,
    pub headless: bool,
    pub viewport: Viewport,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            headless: true,
            viewport: Viewport::default(),
        }
    }
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub app_name: String,
    pub app_version: String,
    pub auto_load_images: bool,
    /// Echo the page's console messages to standard output.
    pub console: bool,
    pub accept_language: Vec<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            app_name: "render".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            auto_load_images: true,
            console: false,
            accept_language: Vec::new(),
        }
    }
}

impl SessionOptions {
    /// `name/version` token appended to the browser's user agent.
    pub fn user_agent_product(&self) -> String {
        if self.app_version.is_empty() {
            self.app_name.clone()
        } else {
            format!("{}/{}", self.app_name, self.app_version)
        }
    }
}

/// Raw RGBA pixels captured from a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub pixels: Option<Vec<u8>>,
    /// Bytes per row.
    pub stride: usize,
    pub width: u32,
    pub height: u32,
}

/// What a loaded page reports about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    pub title: String,
    /// URI after redirects.
    pub uri: String,
    pub time_to_start: Duration,
    pub time_to_load: Duration,
    pub time_to_finish: Duration,
}

#[allow(async_fn_in_trait)]
pub trait Renderer {
    type Session: Session;

    async fn new_session(&self, options: &SessionOptions) -> Result<Self::Session>;
}

/// One page. Sessions are never shared; [`Session::close`] must be called on every path.
#[allow(async_fn_in_trait)]
pub trait Session {
    /// Issue the navigation request without waiting for it.
    async fn load(&mut self, url: &Url) -> Result<()>;

    /// Block until the page reports loaded.
    async fn wait(&mut self) -> Result<()>;

    async fn page_info(&mut self) -> Result<PageInfo>;

    async fn evaluate(&mut self, script: &str) -> Result<Value>;

    async fn capture(&mut self) -> Result<Capture>;

    async fn close(self) -> Result<()>;
}
