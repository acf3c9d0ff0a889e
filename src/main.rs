mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use render_lib::renderer::{FixtureRenderer, PlaywrightRenderer};
use render_lib::{BatchSummary, Config, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use commands::Prepared;
use settings::{format_effective_settings, RunSettings};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    init_tracing(args.debug);

    match run(args).await {
        Ok(summary) => formatting::report_summary(&summary),
        Err(err) => formatting::render_error(&err),
    }
}

/// Diagnostics go to stderr; stdout carries only results.
fn init_tracing(debug: bool) {
    let default = if debug {
        "render=debug,render_lib=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Cli) -> Result<BatchSummary> {
    let config = Config::load(args.config.as_deref())?;
    let settings = RunSettings::resolve(&args, &config);
    debug!("{}", format_effective_settings(&settings, args.config.as_deref()));

    let prepared = Prepared::from_command(args.command)?;

    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupted; stopping");
            interrupt.cancel();
        }
    });

    if let Some(renderer) = FixtureRenderer::from_env()? {
        debug!("using fixture renderer");
        return prepared.run(&renderer, &settings, shutdown).await;
    }
    let renderer = PlaywrightRenderer::connect(settings.renderer_options()).await?;
    prepared.run(&renderer, &settings, shutdown).await
}
