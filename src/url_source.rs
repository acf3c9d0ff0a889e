//! Streams target URLs from command-line arguments or a line reader.
//!
//! Production runs on a background task feeding a single-slot channel, so the
//! producer stays at most one URL ahead of the consumer and standard input is
//! read lazily while pages are being rendered.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::{ParseError, Url};

use crate::{RenderError, Result};

/// Parse `text`, defaulting the scheme to `http` when it is missing.
///
/// `host:port[/path]` parses as an opaque URL with scheme `host`; it is
/// treated as scheme-less too.
pub fn normalize_url(text: &str) -> Result<Url> {
    let text = text.trim();
    match Url::parse(text) {
        Ok(url) if !is_host_and_port(&url) => Ok(url),
        Ok(_) | Err(ParseError::RelativeUrlWithoutBase) => {
            let with_scheme = if text.starts_with("//") {
                format!("http:{text}")
            } else {
                format!("http://{text}")
            };
            Url::parse(&with_scheme).map_err(|e| RenderError::invalid_url(text, e))
        }
        Err(e) => Err(RenderError::invalid_url(text, e)),
    }
}

fn is_host_and_port(url: &Url) -> bool {
    url.cannot_be_a_base()
        && url
            .path()
            .split('/')
            .next()
            .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

/// Host plus explicit port, e.g. `example.com:8080`.
pub fn host_with_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Normalize every command-line argument, stopping at the first malformed one.
pub fn parse_args(args: &[String]) -> Result<Vec<Url>> {
    args.iter().map(|arg| normalize_url(arg)).collect()
}

/// Single-pass, lazily produced sequence of normalized URLs.
///
/// Arguments are validated before the sequence starts. A line read from
/// standard input that fails to parse is yielded as an error and ends the
/// sequence.
#[derive(Debug)]
pub struct UrlSource {
    rx: mpsc::Receiver<Result<Url>>,
    producer: JoinHandle<()>,
}

impl UrlSource {
    /// `urls` when there are any, otherwise URLs read from standard input.
    pub fn from_urls_or_stdin(urls: Vec<Url>) -> Self {
        if urls.is_empty() {
            Self::from_reader(BufReader::new(tokio::io::stdin()))
        } else {
            Self::from_urls(urls)
        }
    }

    /// Parses every argument first; a malformed one fails before anything is produced.
    pub fn from_args(args: Vec<String>) -> Result<Self> {
        Ok(Self::from_urls(parse_args(&args)?))
    }

    pub fn from_urls(urls: Vec<Url>) -> Self {
        Self::spawn(|tx| async move {
            for url in urls {
                if tx.send(Ok(url)).await.is_err() {
                    return;
                }
            }
        })
    }

    /// One URL per line; empty lines are skipped.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        Self::spawn(|tx| async move {
            let mut lines = reader.lines();
            loop {
                let item = match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => normalize_url(&line),
                    Ok(None) => return,
                    Err(e) => Err(RenderError::Io(e)),
                };
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    return;
                }
            }
        })
    }

    fn spawn<F, Fut>(produce: F) -> Self
    where
        F: FnOnce(mpsc::Sender<Result<Url>>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let producer = tokio::spawn(produce(tx));
        Self { rx, producer }
    }

    /// Wait for the next URL; `None` once input is exhausted.
    pub async fn next(&mut self) -> Option<Result<Url>> {
        self.rx.recv().await
    }
}

impl Drop for UrlSource {
    fn drop(&mut self) {
        // A producer blocked on stdin would otherwise outlive the consumer.
        self.producer.abort();
    }
}
