//! Named helper registry available inside templates.

use std::collections::BTreeMap;

use serde_json::Value;

use super::exec::{is_truthy, print_value};
use crate::output::to_indented_json;

pub(crate) type HelperFn = fn(&[Value]) -> Result<Value, String>;

/// Fixed set of pure functions a template may call by name.
#[derive(Clone)]
pub struct Helpers {
    funcs: BTreeMap<&'static str, HelperFn>,
}

impl std::fmt::Debug for Helpers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.funcs.keys()).finish()
    }
}

impl Helpers {
    /// String helpers plus `json` and the builtins; used for result formatting.
    pub fn standard() -> Self {
        let mut helpers = Self::filename();
        helpers.funcs.insert("json", json);
        helpers
    }

    /// Everything except `json`; used for output file name templates.
    pub fn filename() -> Self {
        let funcs: [(&'static str, HelperFn); 13] = [
            ("split", split),
            ("join", join),
            ("title", title),
            ("lower", lower),
            ("upper", upper),
            ("len", len),
            ("index", index),
            ("print", print),
            ("eq", eq),
            ("ne", ne),
            ("not", not),
            ("and", and),
            ("or", or),
        ];
        Self {
            funcs: funcs.into_iter().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub(crate) fn call(&self, name: &str, args: &[Value]) -> Result<Value, String> {
        let func = self
            .funcs
            .get(name)
            .ok_or_else(|| format!("function {name:?} not defined"))?;
        func(args).map_err(|e| format!("error calling {name}: {e}"))
    }
}

fn arity(args: &[Value], want: usize) -> Result<(), String> {
    if args.len() == want {
        Ok(())
    } else {
        Err(format!("wrong number of args: want {want} got {}", args.len()))
    }
}

fn string_arg<'a>(args: &'a [Value], i: usize) -> Result<&'a str, String> {
    match &args[i] {
        Value::String(s) => Ok(s),
        other => Err(format!("expected string argument, got {}", kind(other))),
    }
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

fn json(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    to_indented_json(&args[0])
        .map(Value::String)
        .map_err(|e| e.to_string())
}

fn split(args: &[Value]) -> Result<Value, String> {
    arity(args, 2)?;
    let (s, sep) = (string_arg(args, 0)?, string_arg(args, 1)?);
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        s.split(sep).map(|p| Value::String(p.to_string())).collect()
    };
    Ok(Value::Array(parts))
}

fn join(args: &[Value]) -> Result<Value, String> {
    arity(args, 2)?;
    let sep = string_arg(args, 1)?;
    let Value::Array(items) = &args[0] else {
        return Err(format!("expected array argument, got {}", kind(&args[0])));
    };
    let parts = items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.as_str()),
            other => Err(format!("cannot join {} element", kind(other))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::String(parts.join(sep)))
}

/// Upper-cases the first letter of every word; a word starts after any
/// character that is not a letter, digit, underscore or apostrophe.
fn title(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    let mut out = String::new();
    let mut at_boundary = true;
    for c in string_arg(args, 0)?.chars() {
        if at_boundary {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_boundary = !(c.is_alphanumeric() || c == '_' || c == '\'');
    }
    Ok(Value::String(out))
}

fn lower(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    Ok(Value::String(string_arg(args, 0)?.to_lowercase()))
}

fn upper(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    Ok(Value::String(string_arg(args, 0)?.to_uppercase()))
}

fn len(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    let n = match &args[0] {
        Value::String(s) => s.len(),
        Value::Array(a) => a.len(),
        Value::Object(m) => m.len(),
        other => return Err(format!("len of {}", kind(other))),
    };
    Ok(Value::from(n))
}

fn index(args: &[Value]) -> Result<Value, String> {
    let (target, keys) = args
        .split_first()
        .ok_or_else(|| "wrong number of args: want at least 1 got 0".to_string())?;
    let mut current = target.clone();
    for key in keys {
        current = match (&current, key) {
            (Value::Array(items), Value::Number(n)) => {
                let i = n
                    .as_u64()
                    .ok_or_else(|| format!("cannot index array with {n}"))?;
                items
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| format!("index out of range: {i}"))?
            }
            (Value::Object(map), Value::String(k)) => map.get(k).cloned().unwrap_or(Value::Null),
            (Value::Null, _) => Value::Null,
            (target, key) => {
                return Err(format!("cannot index {} with {}", kind(target), kind(key)))
            }
        };
    }
    Ok(current)
}

/// Operands are concatenated; a space is added between two non-string operands.
fn print(args: &[Value]) -> Result<Value, String> {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !args[i - 1].is_string() && !arg.is_string() {
            out.push(' ');
        }
        out.push_str(&print_value(arg));
    }
    Ok(Value::String(out))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn eq(args: &[Value]) -> Result<Value, String> {
    let (first, rest) = args
        .split_first()
        .filter(|(_, rest)| !rest.is_empty())
        .ok_or_else(|| "missing argument for comparison".to_string())?;
    Ok(Value::Bool(rest.iter().any(|other| values_equal(first, other))))
}

fn ne(args: &[Value]) -> Result<Value, String> {
    arity(args, 2)?;
    Ok(Value::Bool(!values_equal(&args[0], &args[1])))
}

fn not(args: &[Value]) -> Result<Value, String> {
    arity(args, 1)?;
    Ok(Value::Bool(!is_truthy(&args[0])))
}

/// Returns the first falsy argument, or the last one.
fn and(args: &[Value]) -> Result<Value, String> {
    args.iter()
        .find(|v| !is_truthy(v))
        .or_else(|| args.last())
        .cloned()
        .ok_or_else(|| "wrong number of args: want at least 1 got 0".to_string())
}

/// Returns the first truthy argument, or the last one.
fn or(args: &[Value]) -> Result<Value, String> {
    args.iter()
        .find(|v| is_truthy(v))
        .or_else(|| args.last())
        .cloned()
        .ok_or_else(|| "wrong number of args: want at least 1 got 0".to_string())
}
