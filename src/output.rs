use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::template::Template;
use crate::Result;

/// Serialize as JSON indented with one tab per level.
pub fn to_indented_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut ser)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Renders results either as indented JSON or through a user template.
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    template: Option<Template>,
}

impl OutputFormatter {
    /// An empty `template_text` selects indented JSON.
    pub fn new(template_text: &str) -> Result<Self> {
        let template = if template_text.is_empty() {
            None
        } else {
            Some(Template::parse(template_text)?)
        };
        Ok(Self { template })
    }

    pub fn format<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        match &self.template {
            Some(template) => Ok(template.render(&serde_json::to_value(value)?)?),
            None => Ok(to_indented_json(value)?),
        }
    }
}

/// One-shot form of [`OutputFormatter::format`].
pub fn format_value<T: Serialize + ?Sized>(value: &T, template_text: &str) -> Result<String> {
    OutputFormatter::new(template_text)?.format(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Metadata, Timing};
    use crate::RenderError;
    use serde_json::json;

    fn sample() -> Metadata {
        Metadata {
            title: "Example Domain".into(),
            uri: "http://example.com/".into(),
            timing: Timing {
                start: 0.25,
                load: 0.5,
                finish: 1.0,
            },
        }
    }

    #[test]
    fn empty_template_yields_tab_indented_json_in_field_order() {
        let text = format_value(&sample(), "").unwrap();
        assert_eq!(
            text,
            "{\n\t\"Title\": \"Example Domain\",\n\t\"URI\": \"http://example.com/\",\n\t\"Timing\": {\n\t\t\"Start\": 0.25,\n\t\t\"Load\": 0.5,\n\t\t\"Finish\": 1\n\t}\n}"
        );
    }

    #[test]
    fn formatting_is_deterministic() {
        let value = json!({"b": [1, 2], "a": {"c": null}});
        let formatter = OutputFormatter::new("").unwrap();
        assert_eq!(formatter.format(&value).unwrap(), formatter.format(&value).unwrap());
    }

    #[test]
    fn template_formats_metadata_and_script_values_uniformly() {
        let formatter = OutputFormatter::new("{{.Title}} {{.Timing.Load}}").unwrap();
        assert_eq!(formatter.format(&sample()).unwrap(), "Example Domain 0.5");

        let formatter = OutputFormatter::new("{{range .}}{{upper .}},{{end}}").unwrap();
        assert_eq!(formatter.format(&json!(["a", "b"])).unwrap(), "A,B,");
    }

    #[test]
    fn bad_templates_are_errors() {
        assert!(matches!(
            OutputFormatter::new("{{.Title"),
            Err(RenderError::Template(_))
        ));
        let formatter = OutputFormatter::new("{{lower .Timing}}").unwrap();
        assert!(matches!(formatter.format(&sample()), Err(RenderError::Template(_))));
    }
}
