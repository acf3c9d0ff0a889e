//! Decides how a script's return value is printed.

use serde_json::Value;

use crate::output::OutputFormatter;
use crate::Result;

/// Printed for a script that returned null or undefined.
pub const NULL_TEXT: &str = "null";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// Maps and arrays go through the output formatter.
    Structured,
    /// Null, booleans, numbers and strings print as-is.
    Scalar,
}

pub fn classify(value: &Value) -> ResultShape {
    match value {
        Value::Object(_) | Value::Array(_) => ResultShape::Structured,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => ResultShape::Scalar,
    }
}

/// Name used in debug logging.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Natural text of a scalar: strings unquoted, numbers and booleans literally.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => NULL_TEXT.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Text to print for a script result.
pub fn render_script_result(value: &Value, formatter: &OutputFormatter) -> Result<String> {
    match classify(value) {
        ResultShape::Structured => formatter.format(value),
        ResultShape::Scalar => Ok(scalar_text(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_and_arrays_are_structured() {
        assert_eq!(classify(&json!({"a": 1})), ResultShape::Structured);
        assert_eq!(classify(&json!([1, 2])), ResultShape::Structured);
        assert_eq!(classify(&json!([])), ResultShape::Structured);
    }

    #[test]
    fn scalars_and_null_print_directly() {
        let formatter = OutputFormatter::default();
        for (value, text) in [
            (json!(42), "42"),
            (json!(0.5), "0.5"),
            (json!("plain text"), "plain text"),
            (json!(true), "true"),
            (json!(null), "null"),
        ] {
            assert_eq!(classify(&value), ResultShape::Scalar);
            assert_eq!(render_script_result(&value, &formatter).unwrap(), text);
        }
    }

    #[test]
    fn structured_results_use_the_formatter() {
        let value = json!({"links": 3});
        let plain = render_script_result(&value, &OutputFormatter::default()).unwrap();
        assert_eq!(plain, "{\n\t\"links\": 3\n}");

        let templated = OutputFormatter::new("links={{.links}}").unwrap();
        assert_eq!(render_script_result(&value, &templated).unwrap(), "links=3");
    }

    #[test]
    fn templates_do_not_apply_to_scalars() {
        let templated = OutputFormatter::new("wrapped {{.}}").unwrap();
        assert_eq!(render_script_result(&json!(7), &templated).unwrap(), "7");
    }
}
