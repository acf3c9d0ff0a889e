use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{RenderError, Result, Viewport};

/// Defaults loaded from `config.toml`. Every field may be overridden on the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub user_agent_app: String,
    pub user_agent_version: String,
    pub console: bool,
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub accept_language: Vec<String>,
    pub continue_on_error: bool,
    pub viewport: Viewport,
    pub node_command: String,
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent_app: "render".to_string(),
            user_agent_version: env!("CARGO_PKG_VERSION").to_string(),
            console: false,
            timeout: None,
            accept_language: Vec::new(),
            continue_on_error: false,
            viewport: Viewport::default(),
            node_command: "node".to_string(),
            headless: true,
        }
    }
}

impl Config {
    /// Load from an explicit path, the central config location, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => match Self::central_config_path().filter(|p| p.is_file()) {
                Some(p) => Self::from_file(&p),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RenderError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let cfg = Self::from_toml(&text)
            .map_err(|e| RenderError::Config(format!("Invalid config ({}): {}", path.display(), e)))?;
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, String> {
        let cfg: Config = toml::from_str(text).map_err(|e| e.to_string())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `$XDG_CONFIG_HOME/render/config.toml`, else `~/.config/render/config.toml`.
    pub fn central_config_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("render").join("config.toml"))
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.user_agent_app.trim().is_empty() {
            return Err("user_agent_app must not be empty".to_string());
        }
        if self.node_command.trim().is_empty() {
            return Err("node_command must not be empty".to_string());
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err("timeout must be greater than zero (omit it to disable)".to_string());
        }
        Ok(())
    }
}
