use std::process::ExitCode;

use render_lib::{BatchSummary, RenderError};

/// Exit status for any failed run.
pub const FAILURE: u8 = 1;

/// Error message and remediation hint as printed on stderr.
pub fn format_error(err: &RenderError) -> String {
    format!("render: error: {err}\nHint: {}", err.remediation())
}

/// Print a fatal error and return the failing exit code.
pub fn render_error(err: &RenderError) -> ExitCode {
    eprintln!("{}", format_error(err));
    ExitCode::from(FAILURE)
}

/// Exit code for a finished batch; failures collected under `--continue-on-error` still fail the run.
pub fn report_summary(summary: &BatchSummary) -> ExitCode {
    if summary.is_success() {
        return ExitCode::SUCCESS;
    }
    eprintln!("{}", format_summary(summary));
    ExitCode::from(FAILURE)
}

pub fn format_summary(summary: &BatchSummary) -> String {
    let mut text = format!(
        "render: error: {} of {} URLs failed",
        summary.failures.len(),
        summary.processed
    );
    for (url, err) in &summary.failures {
        text.push_str(&format!("\n  {url}: {err}"));
    }
    text
}
