//! Renderer backed by canned pages.
//!
//! Selected by pointing `RENDER_FIXTURE` at a JSON file:
//!
//! ```json
//! {
//!   "default": { "title": "Fallback" },
//!   "pages": {
//!     "example.com": {
//!       "title": "Example Domain",
//!       "loadDelayMs": 10,
//!       "timing": { "start": 0.1, "load": 0.2, "finish": 0.3 },
//!       "scriptResult": { "links": 1 },
//!       "snapshot": { "width": 4, "height": 2, "color": [255, 0, 0, 255] }
//!     }
//!   }
//! }
//! ```
//!
//! Pages are keyed by host (with port when explicit). `"snapshot": null` yields a
//! capture without pixel data and `"fail": "<stage>"` makes that stage error.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{Capture, PageInfo, Renderer, Session, SessionOptions};
use crate::url_source::host_with_port;
use crate::{RenderError, Result};

/// Environment variable naming the fixture file.
pub const FIXTURE_ENV: &str = "RENDER_FIXTURE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixtureSite {
    pub default: FixturePage,
    pub pages: BTreeMap<String, FixturePage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FixturePage {
    pub title: String,
    /// Reported URI; the requested URL when absent.
    pub uri: Option<String>,
    pub load_delay_ms: u64,
    pub timing: FixtureTiming,
    pub script_result: Value,
    /// Results for specific script texts, overriding `script_result`.
    pub scripts: BTreeMap<String, Value>,
    pub snapshot: Option<FixtureSnapshot>,
    pub fail: Option<FixtureStage>,
}

impl Default for FixturePage {
    fn default() -> Self {
        Self {
            title: String::new(),
            uri: None,
            load_delay_ms: 0,
            timing: FixtureTiming::default(),
            script_result: Value::Null,
            scripts: BTreeMap::new(),
            snapshot: Some(FixtureSnapshot::default()),
            fail: None,
        }
    }
}

/// Seconds since the load request.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixtureTiming {
    pub start: f64,
    pub load: f64,
    pub finish: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixtureSnapshot {
    pub width: u32,
    pub height: u32,
    pub color: [u8; 4],
}

impl Default for FixtureSnapshot {
    fn default() -> Self {
        Self {
            width: 8,
            height: 6,
            color: [255, 255, 255, 255],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureStage {
    Session,
    Load,
    Wait,
    Info,
    Evaluate,
    Snapshot,
}

/// Session lifecycle record, in the order things happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureEvent {
    Opened { images: bool },
    Loaded(String),
    Closed(String),
}

#[derive(Debug, Clone, Default)]
pub struct FixtureRenderer {
    site: Arc<FixtureSite>,
    events: Arc<Mutex<Vec<FixtureEvent>>>,
}

impl FixtureRenderer {
    pub fn new(site: FixtureSite) -> Self {
        Self {
            site: Arc::new(site),
            events: Arc::default(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let site: FixtureSite = serde_json::from_str(text)
            .map_err(|e| RenderError::Config(format!("invalid renderer fixture: {e}")))?;
        Ok(Self::new(site))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// The fixture named by `RENDER_FIXTURE`, if set.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var_os(FIXTURE_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path)).map(Some),
            _ => Ok(None),
        }
    }

    pub fn events(&self) -> Vec<FixtureEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.events().iter().fold(0usize, |open, event| match event {
            FixtureEvent::Opened { .. } => open + 1,
            FixtureEvent::Closed(_) => open.saturating_sub(1),
            FixtureEvent::Loaded(_) => open,
        })
    }

    fn record(&self, event: FixtureEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Renderer for FixtureRenderer {
    type Session = FixtureSession;

    async fn new_session(&self, options: &SessionOptions) -> Result<FixtureSession> {
        if self.site.default.fail == Some(FixtureStage::Session) {
            return Err(RenderError::renderer("fixture refused to open a session"));
        }
        self.record(FixtureEvent::Opened {
            images: options.auto_load_images,
        });
        Ok(FixtureSession {
            renderer: self.clone(),
            page: None,
            url: None,
        })
    }
}

#[derive(Debug)]
pub struct FixtureSession {
    renderer: FixtureRenderer,
    page: Option<FixturePage>,
    url: Option<Url>,
}

impl FixtureSession {
    fn page(&self, stage: FixtureStage) -> Result<&FixturePage> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| RenderError::renderer("no page has been loaded"))?;
        if page.fail == Some(stage) {
            return Err(RenderError::renderer(format!(
                "fixture failure injected at {stage:?}"
            )));
        }
        Ok(page)
    }
}

impl Session for FixtureSession {
    async fn load(&mut self, url: &Url) -> Result<()> {
        let site = &self.renderer.site;
        let page = site
            .pages
            .get(&host_with_port(url))
            .unwrap_or(&site.default)
            .clone();
        self.renderer.record(FixtureEvent::Loaded(url.to_string()));
        self.page = Some(page);
        self.url = Some(url.clone());
        self.page(FixtureStage::Load)?;
        Ok(())
    }

    async fn wait(&mut self) -> Result<()> {
        let delay = self.page(FixtureStage::Wait)?.load_delay_ms;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(())
    }

    async fn page_info(&mut self) -> Result<PageInfo> {
        let page = self.page(FixtureStage::Info)?;
        let requested = self.url.as_ref().map(Url::to_string).unwrap_or_default();
        Ok(PageInfo {
            title: page.title.clone(),
            uri: page.uri.clone().unwrap_or(requested),
            time_to_start: Duration::from_secs_f64(page.timing.start.max(0.0)),
            time_to_load: Duration::from_secs_f64(page.timing.load.max(0.0)),
            time_to_finish: Duration::from_secs_f64(page.timing.finish.max(0.0)),
        })
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        let page = self.page(FixtureStage::Evaluate)?;
        Ok(page
            .scripts
            .get(script)
            .unwrap_or(&page.script_result)
            .clone())
    }

    async fn capture(&mut self) -> Result<Capture> {
        let page = self.page(FixtureStage::Snapshot)?;
        Ok(match page.snapshot {
            Some(FixtureSnapshot {
                width,
                height,
                color,
            }) => Capture {
                pixels: Some(color.repeat(width as usize * height as usize)),
                stride: width as usize * 4,
                width,
                height,
            },
            None => Capture {
                pixels: None,
                stride: 0,
                width: 0,
                height: 0,
            },
        })
    }

    async fn close(self) -> Result<()> {
        let label = self.url.as_ref().map(Url::to_string).unwrap_or_default();
        self.renderer.record(FixtureEvent::Closed(label));
        Ok(())
    }
}
