use std::time::Duration;

use thiserror::Error;

use crate::template::TemplateError;
use crate::viewport::ViewportParseError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse URL {value:?}: {message}")]
    InvalidUrl { value: String, message: String },

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("Timed out after {after:?} while processing {url}")]
    Timeout { url: String, after: Duration },

    #[error("Processing of {0} was cancelled")]
    Cancelled(String),

    #[error("Could not write image {path} for {url}: {message}")]
    Output {
        url: String,
        path: String,
        message: String,
    },

    #[error("Empty capture: {0}")]
    EmptyCapture(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RenderError {
    pub fn invalid_url(value: impl Into<String>, message: impl ToString) -> Self {
        RenderError::InvalidUrl {
            value: value.into(),
            message: message.to_string(),
        }
    }

    pub fn renderer(message: impl Into<String>) -> Self {
        RenderError::Renderer(message.into())
    }

    pub fn output(url: impl ToString, path: impl Into<String>, message: impl ToString) -> Self {
        RenderError::Output {
            url: url.to_string(),
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Short hint printed under the error message.
    pub fn remediation(&self) -> &'static str {
        match self {
            RenderError::Io(_) => "Check file paths and permissions.",
            RenderError::InvalidUrl { .. } => {
                "Verify the URL is well-formed (e.g., https://example.com/page)."
            }
            RenderError::Template(_) => {
                "Check the template syntax; fields are referenced as {{.Name}} and helpers as {{lower .Name}}."
            }
            RenderError::Image(_) => {
                "Use a supported output format (png, jpeg, webp, gif, mono)."
            }
            RenderError::Serialization(_) => "Run with --debug to inspect the returned value.",
            RenderError::Renderer(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("playwright npm package is missing") {
                    "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`)."
                } else if lower.contains("not found on path") || lower.contains("node command") {
                    "Install Node.js and ensure the node binary is on PATH (or set node_command in the config)."
                } else {
                    "Re-run with --debug to see the renderer conversation."
                }
            }
            RenderError::Timeout { .. } => {
                "Increase --timeout or ensure the page finishes loading."
            }
            RenderError::Cancelled(_) => "The run was interrupted before the page completed.",
            RenderError::Output { .. } => {
                "Check that the output directory exists and is writable."
            }
            RenderError::EmptyCapture(_) => {
                "The page produced no renderable content; check the URL and viewport."
            }
            RenderError::Config(_) => {
                "Check flags and the config file (e.g., --viewport WIDTHxHEIGHT, timeout = \"30s\")."
            }
        }
    }
}

impl From<ViewportParseError> for RenderError {
    fn from(err: ViewportParseError) -> Self {
        RenderError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
