//! Playwright backend.
//!
//! Each session is a Node.js process running [`SESSION_SCRIPT`]. Commands go to
//! the helper's stdin and replies come back on its stdout, one JSON object per
//! line. Console messages from the page arrive as `{"event":"console"}` lines
//! interleaved with replies.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use url::Url;

use super::{Capture, PageInfo, Renderer, RendererOptions, Session, SessionOptions};
use crate::{RenderError, Result};

pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Grace period for the helper to shut the browser down before it is killed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Long-lived session helper. `process.argv[1]` carries the JSON options.
pub(crate) const SESSION_SCRIPT: &str = r#"
const readline = require('readline');
const options = JSON.parse(process.argv[1]);

function send(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

function describe(err) {
  return err && err.message ? err.message : String(err);
}

async function run() {
  const { chromium } = require('playwright');
  const browser = await chromium.launch({ headless: options.headless });
  try {
    const probe = await browser.newPage();
    const baseAgent = await probe.evaluate(() => navigator.userAgent);
    await probe.close();

    const languages = options.acceptLanguage.filter(Boolean);
    const context = await browser.newContext({
      viewport: { width: options.width, height: options.height },
      userAgent: `${baseAgent} ${options.product}`,
      locale: languages[0],
      extraHTTPHeaders: languages.length ? { 'Accept-Language': languages.join(',') } : {}
    });
    if (!options.loadImages) {
      await context.route('**/*', (route) =>
        route.request().resourceType() === 'image' ? route.abort() : route.continue());
    }
    const page = await context.newPage();
    if (options.console) {
      page.on('console', (msg) => send({ event: 'console', text: msg.text() }));
    }

    let navigation = null;
    const handlers = {
      async load(cmd) {
        navigation = page.goto(cmd.url, { waitUntil: 'load', timeout: 0 });
        navigation.catch(() => {});
        return {};
      },
      async wait() {
        if (!navigation) throw new Error('no page load was requested');
        await navigation;
        return {};
      },
      async info() {
        const timing = await page.evaluate(() => {
          const nav = performance.getEntriesByType('navigation')[0];
          return nav
            ? { start: nav.responseStart, load: nav.domContentLoadedEventEnd, finish: nav.loadEventEnd }
            : { start: 0, load: 0, finish: 0 };
        });
        return { title: await page.title(), uri: page.url(), timing };
      },
      async evaluate(cmd) {
        const value = await page.evaluate(cmd.script);
        return { value: value === undefined ? null : value };
      },
      async snapshot() {
        const png = await page.screenshot({ type: 'png', fullPage: true });
        return { png: png.toString('base64') };
      },
      async close() {
        return {};
      }
    };

    send({ status: 'ok' });
    const lines = readline.createInterface({ input: process.stdin });
    for await (const line of lines) {
      if (!line.trim()) continue;
      let cmd;
      try {
        cmd = JSON.parse(line);
        const handler = handlers[cmd.cmd];
        if (!handler) throw new Error(`unknown command ${cmd.cmd}`);
        send({ status: 'ok', ...(await handler(cmd)) });
      } catch (err) {
        send({ status: 'error', message: describe(err) });
      }
      if (cmd && cmd.cmd === 'close') break;
    }
  } finally {
    await browser.close().catch(() => {});
  }
}

run().catch((err) => {
  send({ status: 'error', message: describe(err) });
  process.exitCode = 1;
});
"#;

/// Launches one helper process per session.
#[derive(Debug, Clone)]
pub struct PlaywrightRenderer {
    options: RendererOptions,
}

impl PlaywrightRenderer {
    /// Verifies Node.js and the Playwright package are installed.
    pub async fn connect(options: RendererOptions) -> Result<Self> {
        ensure_node_available(&options.node_command).await?;
        ensure_playwright_available(&options.node_command).await?;
        Ok(Self { options })
    }

    fn helper_args(&self, session: &SessionOptions) -> String {
        json!({
            "headless": self.options.headless,
            "width": self.options.viewport.width,
            "height": self.options.viewport.height,
            "product": session.user_agent_product(),
            "loadImages": session.auto_load_images,
            "console": session.console,
            "acceptLanguage": session.accept_language,
        })
        .to_string()
    }
}

impl Renderer for PlaywrightRenderer {
    type Session = PlaywrightSession;

    async fn new_session(&self, options: &SessionOptions) -> Result<PlaywrightSession> {
        let mut cmd = Command::new(&self.options.node_command);
        cmd.arg("-e")
            .arg(SESSION_SCRIPT)
            .arg(self.helper_args(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &self.options.node_command))?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(RenderError::renderer("renderer helper has no stdio pipes"));
        };

        let mut session = PlaywrightSession {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            echo_console: options.console,
        };
        // The helper announces readiness once the browser is up.
        session.read_reply().await?;
        Ok(session)
    }
}

#[derive(Debug)]
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    echo_console: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HelperLine {
    Event {
        event: String,
        #[serde(default)]
        text: String,
    },
    Reply {
        status: String,
        #[serde(default)]
        message: Option<String>,
        #[serde(flatten)]
        body: Map<String, Value>,
    },
}

#[derive(Debug, Deserialize)]
struct InfoReply {
    title: String,
    uri: String,
    timing: TimingReply,
}

/// Milliseconds since navigation start.
#[derive(Debug, Deserialize)]
struct TimingReply {
    start: f64,
    load: f64,
    finish: f64,
}

fn millis(ms: f64) -> Duration {
    Duration::from_secs_f64((ms / 1000.0).max(0.0))
}

impl PlaywrightSession {
    async fn request(&mut self, command: Value) -> Result<Map<String, Value>> {
        let mut line = command.to_string();
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| RenderError::renderer(format!("renderer helper stopped accepting commands: {e}")))?;
        self.stdin.flush().await?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<Map<String, Value>> {
        loop {
            let line = self.stdout.next_line().await?.ok_or_else(|| {
                RenderError::renderer("renderer helper exited unexpectedly")
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: HelperLine = serde_json::from_str(&line).map_err(|e| {
                RenderError::renderer(format!("unreadable renderer reply {line:?}: {e}"))
            })?;
            match parsed {
                HelperLine::Event { event, text } => {
                    if event == "console" && self.echo_console {
                        println!("{text}");
                    }
                }
                HelperLine::Reply { status, body, .. } if status == "ok" => return Ok(body),
                HelperLine::Reply {
                    status, message, ..
                } => {
                    return Err(map_playwright_status_error(
                        &status,
                        message.unwrap_or_default(),
                    ))
                }
            }
        }
    }
}

impl Session for PlaywrightSession {
    async fn load(&mut self, url: &Url) -> Result<()> {
        self.request(json!({"cmd": "load", "url": url.as_str()})).await?;
        Ok(())
    }

    async fn wait(&mut self) -> Result<()> {
        self.request(json!({"cmd": "wait"})).await?;
        Ok(())
    }

    async fn page_info(&mut self) -> Result<PageInfo> {
        let body = self.request(json!({"cmd": "info"})).await?;
        let info: InfoReply = serde_json::from_value(Value::Object(body))?;
        Ok(PageInfo {
            title: info.title,
            uri: info.uri,
            time_to_start: millis(info.timing.start),
            time_to_load: millis(info.timing.load),
            time_to_finish: millis(info.timing.finish),
        })
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        let mut body = self.request(json!({"cmd": "evaluate", "script": script})).await?;
        Ok(body.remove("value").unwrap_or(Value::Null))
    }

    async fn capture(&mut self) -> Result<Capture> {
        let body = self.request(json!({"cmd": "snapshot"})).await?;
        let encoded = body
            .get("png")
            .and_then(Value::as_str)
            .ok_or_else(|| RenderError::renderer("snapshot reply carried no image"))?;
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| RenderError::renderer(format!("snapshot image is not valid base64: {e}")))?;
        let rgba = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Capture {
            stride: width as usize * 4,
            width,
            height,
            pixels: Some(rgba.into_raw()),
        })
    }

    async fn close(mut self) -> Result<()> {
        let polite = tokio::time::timeout(CLOSE_TIMEOUT, async {
            self.request(json!({"cmd": "close"})).await?;
            self.child.wait().await.map_err(RenderError::Io)
        })
        .await;
        match polite {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => {
                let _ = self.child.kill().await;
                Err(err)
            }
            Err(_) => {
                tracing::debug!("renderer helper did not exit within {CLOSE_TIMEOUT:?}; killing it");
                self.child.kill().await.map_err(RenderError::Io)
            }
        }
    }
}

fn map_spawn_error(err: io::Error, command: &str) -> RenderError {
    if err.kind() == io::ErrorKind::NotFound {
        RenderError::renderer(format!(
            "Unable to start renderer; '{command}' was not found on PATH"
        ))
    } else {
        RenderError::Io(err)
    }
}

fn missing_playwright() -> RenderError {
    RenderError::renderer(
        "Playwright npm package is missing; install with `npm install playwright`.",
    )
}

fn map_playwright_error(status_text: impl Into<String>, stderr: &str) -> RenderError {
    if let Ok(HelperLine::Reply {
        status,
        message: Some(message),
        ..
    }) = serde_json::from_str::<HelperLine>(stderr)
    {
        return map_playwright_status_error(&status, message);
    }
    if stderr
        .to_ascii_lowercase()
        .contains("cannot find module 'playwright'")
    {
        return missing_playwright();
    }
    RenderError::renderer(format!(
        "Playwright exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

fn map_playwright_status_error(status: &str, message: String) -> RenderError {
    if message
        .to_ascii_lowercase()
        .contains("cannot find module 'playwright'")
    {
        missing_playwright()
    } else {
        RenderError::renderer(format!("Playwright error (status {status}): {message}"))
    }
}

async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            RenderError::renderer(format!(
                "Timed out checking node availability after {NODE_CHECK_TIMEOUT:?}"
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(RenderError::renderer(format!(
            "Node command {node_command:?} is not available (exit {status})"
        )));
    }
    Ok(())
}

async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            RenderError::renderer(format!(
                "Timed out checking Playwright availability after {NODE_CHECK_TIMEOUT:?}"
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_playwright_error(format!("{:?}", output.status), &stderr));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_fails_for_missing_node_binary() {
        let options = RendererOptions {
            node_command: "definitely-not-a-real-node-binary".to_string(),
            ..RendererOptions::default()
        };
        let err = PlaywrightRenderer::connect(options).await.unwrap_err();
        match err {
            RenderError::Renderer(msg) => assert!(msg.contains("not found on PATH"), "{msg}"),
            other => panic!("expected renderer error, got {other:?}"),
        }
    }

    #[test]
    fn map_playwright_error_detects_missing_module() {
        let err = map_playwright_error(
            "1",
            r#"{"status":"error","message":"Cannot find module 'playwright'"}"#,
        );
        assert!(err.to_string().contains("Playwright npm package is missing"));

        let err = map_playwright_error("1", "Error: Cannot find module 'playwright'");
        assert!(err.to_string().contains("npm install playwright"));
    }

    #[test]
    fn map_playwright_error_preserves_other_messages() {
        let err = map_playwright_error("exit status: 1", "boom");
        assert_eq!(
            err.to_string(),
            "Renderer error: Playwright exited with status exit status: 1: boom"
        );
        let err = map_playwright_status_error("error", "net::ERR_NAME_NOT_RESOLVED".into());
        assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[test]
    fn helper_lines_distinguish_events_and_replies() {
        let event: HelperLine = serde_json::from_str(r#"{"event":"console","text":"hi"}"#).unwrap();
        assert!(matches!(event, HelperLine::Event { ref text, .. } if text == "hi"));

        let reply: HelperLine =
            serde_json::from_str(r#"{"status":"ok","value":{"a":1}}"#).unwrap();
        match reply {
            HelperLine::Reply { status, body, .. } => {
                assert_eq!(status, "ok");
                assert_eq!(body.get("value"), Some(&json!({"a": 1})));
            }
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[test]
    fn helper_args_carry_session_settings() {
        let renderer = PlaywrightRenderer {
            options: RendererOptions::default(),
        };
        let session = SessionOptions {
            app_name: "render".into(),
            app_version: "1.2.3".into(),
            auto_load_images: false,
            console: true,
            accept_language: vec!["en-GB".into(), "fr".into()],
        };
        let args: Value = serde_json::from_str(&renderer.helper_args(&session)).unwrap();
        assert_eq!(args["product"], "render/1.2.3");
        assert_eq!(args["loadImages"], false);
        assert_eq!(args["console"], true);
        assert_eq!(args["acceptLanguage"], json!(["en-GB", "fr"]));
        assert_eq!(args["width"], 1280);
    }

    #[test]
    fn timing_milliseconds_become_durations() {
        assert_eq!(millis(1500.0), Duration::from_millis(1500));
        assert_eq!(millis(-3.0), Duration::ZERO);
    }
}
