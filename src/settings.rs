use std::path::Path;
use std::time::Duration;

use render_lib::renderer::{RendererOptions, SessionOptions};
use render_lib::{BatchOptions, Config, ErrorPolicy, Viewport};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;

/// Version reported by `--version`: the build's git tag (or crate version),
/// plus commit and build time when they were captured at compile time.
pub fn version_string() -> String {
    let mut version = option_env!("RENDER_GIT_TAG")
        .filter(|tag| !tag.is_empty())
        .unwrap_or(env!("CARGO_PKG_VERSION"))
        .to_string();
    if let Some(commit) = option_env!("RENDER_GIT_COMMIT").filter(|c| !c.is_empty()) {
        version.push_str(&format!(" ({commit}"));
        if let Some(built) = option_env!("RENDER_BUILD_TIMESTAMP").filter(|b| !b.is_empty()) {
            version.push_str(&format!(", built {built}"));
        }
        version.push(')');
    }
    version
}

/// Settings for one invocation after merging CLI flags over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub debug: bool,
    pub user_agent_app: String,
    pub user_agent_version: String,
    pub console: bool,
    pub timeout: Option<Duration>,
    pub accept_language: Vec<String>,
    pub error_policy: ErrorPolicy,
    pub viewport: Viewport,
    pub node_command: String,
    pub headless: bool,
}

impl RunSettings {
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        let accept_language = cli
            .accept_language
            .clone()
            .unwrap_or_else(|| config.accept_language.clone())
            .into_iter()
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty())
            .collect();

        Self {
            debug: cli.debug,
            user_agent_app: cli
                .user_agent_app
                .clone()
                .unwrap_or_else(|| config.user_agent_app.clone()),
            user_agent_version: cli
                .user_agent_version
                .clone()
                .unwrap_or_else(|| config.user_agent_version.clone()),
            console: cli.console || config.console,
            timeout: cli.timeout.or(config.timeout),
            accept_language,
            error_policy: if cli.continue_on_error || config.continue_on_error {
                ErrorPolicy::Continue
            } else {
                ErrorPolicy::Abort
            },
            viewport: cli.viewport.unwrap_or(config.viewport),
            node_command: config.node_command.clone(),
            headless: config.headless,
        }
    }

    pub fn session_options(&self, load_images: bool) -> SessionOptions {
        SessionOptions {
            app_name: self.user_agent_app.clone(),
            app_version: self.user_agent_version.clone(),
            auto_load_images: load_images,
            console: self.console,
            accept_language: self.accept_language.clone(),
        }
    }

    pub fn renderer_options(&self) -> RendererOptions {
        RendererOptions {
            node_command: self.node_command.clone(),
            headless: self.headless,
            viewport: self.viewport,
        }
    }

    pub fn batch_options(&self, shutdown: CancellationToken) -> BatchOptions {
        BatchOptions {
            timeout: self.timeout,
            error_policy: self.error_policy,
            shutdown,
        }
    }
}

/// Format effective settings as a single-line string.
pub fn format_effective_settings(settings: &RunSettings, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let timeout = settings
        .timeout
        .map(|t| humantime::format_duration(t).to_string())
        .unwrap_or_else(|| "none".to_string());
    format!(
        "Effective settings [{source}]: user-agent={}/{}, timeout={timeout}, viewport={}, languages=[{}], console={}, errors={:?}, node={}, headless={}",
        settings.user_agent_app,
        settings.user_agent_version,
        settings.viewport,
        settings.accept_language.join(","),
        settings.console,
        settings.error_policy,
        settings.node_command,
        settings.headless,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["render"];
        argv.extend_from_slice(args);
        argv.push("metadata");
        Cli::parse_from(argv)
    }

    #[test]
    fn config_values_apply_when_flags_absent() {
        let config = Config::from_toml(
            r#"
user_agent_app = "crawler"
timeout = "20s"
accept_language = ["de"]
continue_on_error = true
viewport = "1024x768"
node_command = "/opt/node/bin/node"
"#,
        )
        .unwrap();
        let settings = RunSettings::resolve(&cli(&[]), &config);
        assert_eq!(settings.user_agent_app, "crawler");
        assert_eq!(settings.timeout, Some(Duration::from_secs(20)));
        assert_eq!(settings.accept_language, vec!["de"]);
        assert_eq!(settings.error_policy, ErrorPolicy::Continue);
        assert_eq!(settings.viewport, Viewport { width: 1024, height: 768 });
        assert_eq!(settings.renderer_options().node_command, "/opt/node/bin/node");
    }

    #[test]
    fn flags_override_config() {
        let config = Config::from_toml("user_agent_app = \"crawler\"\ntimeout = \"20s\"").unwrap();
        let settings = RunSettings::resolve(
            &cli(&[
                "--user-agent-app",
                "bot",
                "--user-agent-version",
                "9",
                "--timeout",
                "2s",
                "--accept-language",
                "en, ,fr",
            ]),
            &config,
        );
        assert_eq!(settings.user_agent_app, "bot");
        assert_eq!(settings.timeout, Some(Duration::from_secs(2)));
        assert_eq!(settings.accept_language, vec!["en", "fr"]);

        let session = settings.session_options(false);
        assert_eq!(session.user_agent_product(), "bot/9");
        assert!(!session.auto_load_images);
    }

    #[test]
    fn defaults_without_config() {
        let settings = RunSettings::resolve(&cli(&[]), &Config::default());
        assert_eq!(settings.user_agent_app, "render");
        assert_eq!(settings.user_agent_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(settings.timeout, None);
        assert_eq!(settings.error_policy, ErrorPolicy::Abort);
        assert!(settings.headless);
    }

    #[test]
    fn effective_settings_line_names_source_and_values() {
        let settings = RunSettings::resolve(&cli(&["--timeout", "1500ms"]), &Config::default());
        let line = format_effective_settings(&settings, None);
        assert!(line.starts_with("Effective settings [defaults]"));
        assert!(line.contains("timeout=1s 500ms"));
        assert!(line.contains("viewport=1280x800"));
    }

    #[test]
    fn version_starts_with_a_version_number() {
        assert!(version_string()
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric()));
    }
}
