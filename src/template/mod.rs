//! Go-style text templates evaluated against JSON values.
//!
//! The language covers what result and file name formatting needs:
//!
//! - field access on the current value: `{{.Title}}`, `{{.Timing.Load}}`, `{{.}}`
//! - string, number and boolean literals
//! - pipelines, where the piped value becomes the last argument: `{{.Host | upper}}`
//! - parenthesised sub-pipelines: `{{join (split .Title " ") "-"}}`
//! - `if`, `range` and `with` blocks, each with an optional `else`
//! - trim markers (`{{-`, `-}}`) and comments (`{{/* ... */}}`)
//!
//! Helpers come from a fixed registry, see [`Helpers`].
//!
//! # Example
//!
//! ```
//! use render_lib::template::Template;
//! use serde_json::json;
//!
//! let tmpl = Template::parse("{{.Host}}-{{.Index}}.png").unwrap();
//! let name = tmpl.render(&json!({"Host": "example.com", "Index": 0})).unwrap();
//! assert_eq!(name, "example.com-0.png");
//! ```

mod exec;
mod funcs;
mod lexer;
mod parse;

use serde_json::Value;
use thiserror::Error;

pub use funcs::Helpers;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unable to parse template: {0}")]
    Parse(String),
    #[error("unable to execute template: {0}")]
    Exec(String),
}

/// A compiled template. Compile once, render many times.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<parse::Node>,
    helpers: Helpers,
}

impl Template {
    /// Compile with the full helper set, `json` included.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        Self::parse_with(text, Helpers::standard())
    }

    pub fn parse_with(text: &str, helpers: Helpers) -> Result<Self, TemplateError> {
        let items = lexer::lex(text)?;
        let nodes = parse::parse(items, &helpers)?;
        Ok(Self { nodes, helpers })
    }

    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        exec::execute(&self.nodes, data, &self.helpers, &mut out)?;
        Ok(out)
    }
}
