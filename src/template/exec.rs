//! Walks the node tree against a JSON value.

use serde_json::Value;

use super::funcs::{kind, Helpers};
use super::parse::{Branch, Command, Node, Operand, Pipeline};
use super::TemplateError;

/// Printed for a missing field or an explicit null.
pub(crate) const NO_VALUE: &str = "<no value>";

pub(crate) fn execute(
    nodes: &[Node],
    dot: &Value,
    helpers: &Helpers,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action(pipeline) => {
                let value = eval_pipeline(pipeline, dot, helpers)?;
                out.push_str(&print_value(&value));
            }
            Node::If(branch) => {
                let cond = eval_pipeline(&branch.pipeline, dot, helpers)?;
                let nodes = if is_truthy(&cond) {
                    &branch.body
                } else {
                    &branch.otherwise
                };
                execute(nodes, dot, helpers, out)?;
            }
            Node::With(branch) => {
                let value = eval_pipeline(&branch.pipeline, dot, helpers)?;
                if is_truthy(&value) {
                    execute(&branch.body, &value, helpers, out)?;
                } else {
                    execute(&branch.otherwise, dot, helpers, out)?;
                }
            }
            Node::Range(branch) => exec_range(branch, dot, helpers, out)?,
        }
    }
    Ok(())
}

fn exec_range(
    branch: &Branch,
    dot: &Value,
    helpers: &Helpers,
    out: &mut String,
) -> Result<(), TemplateError> {
    let value = eval_pipeline(&branch.pipeline, dot, helpers)?;
    let items: Vec<&Value> = match &value {
        Value::Array(items) => items.iter().collect(),
        // Map iteration follows sorted key order.
        Value::Object(map) => map.values().collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(TemplateError::Exec(format!(
                "range can't iterate over {}",
                kind(other)
            )))
        }
    };
    if items.is_empty() {
        return execute(&branch.otherwise, dot, helpers, out);
    }
    for item in items {
        execute(&branch.body, item, helpers, out)?;
    }
    Ok(())
}

fn eval_pipeline(pipeline: &Pipeline, dot: &Value, helpers: &Helpers) -> Result<Value, TemplateError> {
    let mut piped = None;
    for command in &pipeline.commands {
        piped = Some(eval_command(command, dot, helpers, piped)?);
    }
    Ok(piped.unwrap_or(Value::Null))
}

fn eval_command(
    command: &Command,
    dot: &Value,
    helpers: &Helpers,
    piped: Option<Value>,
) -> Result<Value, TemplateError> {
    let (first, rest) = command
        .operands
        .split_first()
        .ok_or_else(|| TemplateError::Exec("empty command".to_string()))?;

    if let Operand::Func(name) = first {
        let mut args = rest
            .iter()
            .map(|operand| eval_operand(operand, dot, helpers))
            .collect::<Result<Vec<_>, _>>()?;
        args.extend(piped);
        return helpers.call(name, &args).map_err(TemplateError::Exec);
    }

    if !rest.is_empty() || piped.is_some() {
        return Err(TemplateError::Exec(format!(
            "can't give argument to non-function {}",
            describe(first)
        )));
    }
    eval_operand(first, dot, helpers)
}

fn eval_operand(operand: &Operand, dot: &Value, helpers: &Helpers) -> Result<Value, TemplateError> {
    match operand {
        Operand::Dot => Ok(dot.clone()),
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Field(path) => lookup(dot, path),
        Operand::Sub(pipeline) => eval_pipeline(pipeline, dot, helpers),
        Operand::Func(name) => helpers.call(name, &[]).map_err(TemplateError::Exec),
    }
}

fn lookup(dot: &Value, path: &[String]) -> Result<Value, TemplateError> {
    let mut current = dot;
    for name in path {
        current = match current {
            Value::Object(map) => match map.get(name) {
                Some(value) => value,
                None => return Ok(Value::Null),
            },
            Value::Null => return Ok(Value::Null),
            other => {
                return Err(TemplateError::Exec(format!(
                    "can't evaluate field {name} in type {}",
                    kind(other)
                )))
            }
        };
    }
    Ok(current.clone())
}

fn describe(operand: &Operand) -> String {
    match operand {
        Operand::Dot => ".".to_string(),
        Operand::Field(path) => format!(".{}", path.join(".")),
        Operand::Literal(value) => value.to_string(),
        Operand::Sub(_) => "(pipeline)".to_string(),
        Operand::Func(name) => name.clone(),
    }
}

/// Empty strings, collections, zero, false and null are false.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(m) => !m.is_empty(),
    }
}

/// Strings print raw, scalars by their literal text and collections as compact JSON.
pub(crate) fn print_value(value: &Value) -> String {
    match value {
        Value::Null => NO_VALUE.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_matches_template_rules() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(-1), json!("0"), json!([0]), json!({"a": null})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn lookup_walks_nested_maps() {
        let data = json!({"Timing": {"Load": 1.25}});
        let path = vec!["Timing".to_string(), "Load".to_string()];
        assert_eq!(lookup(&data, &path).unwrap(), json!(1.25));
        assert_eq!(lookup(&data, &["Missing".to_string()]).unwrap(), Value::Null);
        let err = lookup(&json!({"Title": "x"}), &["Title".to_string(), "Len".to_string()]).unwrap_err();
        assert!(err.to_string().contains("can't evaluate field Len in type string"));
    }

    #[test]
    fn print_value_uses_natural_text() {
        assert_eq!(print_value(&json!("plain")), "plain");
        assert_eq!(print_value(&json!(3)), "3");
        assert_eq!(print_value(&json!(2.5)), "2.5");
        assert_eq!(print_value(&json!(true)), "true");
        assert_eq!(print_value(&json!(null)), NO_VALUE);
        assert_eq!(print_value(&json!({"a": [1, "b"]})), r#"{"a":[1,"b"]}"#);
    }
}
