use std::time::Duration;

use render_lib::{RenderError, TemplateError};

#[test]
fn config_error_display_includes_message() {
    let err = RenderError::Config("missing viewport".to_string());

    assert_eq!(format!("{}", err), "Configuration error: missing viewport");
}

#[test]
fn io_error_display_wraps_source() {
    let io_err = std::io::Error::other("disk full");
    let err: RenderError = io_err.into();
    let rendered = format!("{}", err);

    assert!(rendered.starts_with("IO error: "));
    assert!(rendered.contains("disk full"));
}

#[test]
fn invalid_url_helper_quotes_the_input() {
    let err = RenderError::invalid_url("http://exa mple.com", "invalid domain character");

    assert_eq!(
        format!("{}", err),
        "Could not parse URL \"http://exa mple.com\": invalid domain character"
    );
}

#[test]
fn timeout_names_url_and_budget() {
    let err = RenderError::Timeout {
        url: "http://slow.test/".into(),
        after: Duration::from_millis(1500),
    };

    assert_eq!(
        format!("{}", err),
        "Timed out after 1.5s while processing http://slow.test/"
    );
}

#[test]
fn template_errors_convert() {
    let err: RenderError = TemplateError::Parse("unclosed action".into()).into();

    assert!(format!("{}", err).starts_with("Template error: "));
    assert!(err.remediation().contains("{{.Name}}"));
}

#[test]
fn output_error_names_file_and_url() {
    let err = RenderError::output("http://a.test/", "shots/a.test.png", "permission denied");

    assert_eq!(
        format!("{}", err),
        "Could not write image shots/a.test.png for http://a.test/: permission denied"
    );
    assert!(err.remediation().contains("writable"));
}
