use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use render_lib::{SnapshotFormat, Viewport};

use crate::settings::version_string;

#[derive(Parser)]
#[command(name = "render")]
#[command(
    about = "Render web pages headlessly: snapshots, JavaScript evaluation and page metadata",
    long_about = "render\n\nLoads each URL in a headless browser, one at a time and in order.\n- snapshot: capture the page as an image on stdout or to templated file names.\n- javascript: evaluate a script in the page and print its result.\n- metadata: print the title, final URI and load timings.\n\nURLs come from the arguments, or from standard input (one per line) when none are given."
)]
#[command(version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Log debug information to stderr")]
    pub debug: bool,

    #[arg(long, global = true, value_name = "NAME", help = "Application name appended to the user agent")]
    pub user_agent_app: Option<String>,

    #[arg(long, global = true, value_name = "VERSION", help = "Application version appended to the user agent")]
    pub user_agent_version: Option<String>,

    #[arg(long, global = true, help = "Echo the page's console messages to stdout")]
    pub console: bool,

    #[arg(
        short,
        long,
        global = true,
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        help = "Per-URL time budget (e.g. 500ms, 10s, 1m); no limit when omitted"
    )]
    pub timeout: Option<Duration>,

    #[arg(
        long,
        global = true,
        value_name = "LANGS",
        value_delimiter = ',',
        help = "Accepted languages, comma-separated (e.g. en-GB,en)"
    )]
    pub accept_language: Option<Vec<String>>,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Config file (TOML) with defaults for the global flags; CLI flags override config"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Report failing URLs and keep going; the run still exits non-zero"
    )]
    pub continue_on_error: bool,

    #[arg(long, global = true, value_name = "WIDTHxHEIGHT", help = "Browser viewport size")]
    pub viewport: Option<Viewport>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture each page as an image
    Snapshot {
        #[arg(
            short,
            long,
            default_value = "auto",
            help = "Image format: auto, png, jpeg, webp, gif or mono"
        )]
        format: SnapshotFormat,

        #[arg(long, default_value_t = 75, help = "JPEG quality 1-100; above 100 requests lossless output where supported")]
        quality: u32,

        #[arg(
            short,
            long,
            value_name = "TEMPLATE",
            help = "Output file name template, e.g. '{{.Host}}-{{.Index}}.png'; stdout when omitted"
        )]
        output: Option<String>,

        #[arg(long, help = "Do not load images")]
        noimages: bool,

        #[arg(value_name = "URL")]
        urls: Vec<String>,
    },

    /// Evaluate JavaScript in each page and print the result
    Javascript {
        #[arg(short, long, value_name = "FILE_OR_SCRIPT", help = "Script file, or the script itself")]
        js: String,

        #[arg(
            short,
            long,
            default_value = "",
            value_name = "TEMPLATE",
            help = "Template for map and array results; indented JSON when empty"
        )]
        format: String,

        #[arg(long, help = "Load images")]
        images: bool,

        #[arg(value_name = "URL")]
        urls: Vec<String>,
    },

    /// Print title, final URI and load timings for each page
    Metadata {
        #[arg(
            short,
            long,
            default_value = "",
            value_name = "TEMPLATE",
            help = "Template over {{.Title}}, {{.URI}} and {{.Timing}}; indented JSON when empty"
        )]
        format: String,

        #[arg(long, help = "Load images")]
        images: bool,

        #[arg(value_name = "URL")]
        urls: Vec<String>,
    },
}

pub fn parse() -> Cli {
    let matches = Cli::command().version(version_string()).get_matches();
    match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    }
}
