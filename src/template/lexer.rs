//! Splits template source into literal text and tokenized actions.

use serde_json::{Number, Value};

use super::TemplateError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Dot,
    /// `.A.B` chain, stored without the leading dots.
    Field(Vec<String>),
    Ident(String),
    Literal(Value),
    Pipe,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Text(String),
    Action(Vec<Token>),
}

const LEFT: &str = "{{";
const RIGHT: &str = "}}";

pub(crate) fn lex(src: &str) -> Result<Vec<Item>, TemplateError> {
    let mut items = Vec::new();
    let mut rest = src;
    let mut trim_next = false;

    while !rest.is_empty() {
        let Some(start) = rest.find(LEFT) else {
            push_text(&mut items, rest, trim_next);
            break;
        };

        let mut inner = &rest[start + LEFT.len()..];
        let trim_left = starts_with_trim_marker(inner);
        let text = &rest[..start];
        let text = if trim_left { text.trim_end() } else { text };
        push_text(&mut items, text, trim_next);
        if trim_left {
            inner = &inner[1..];
        }

        let (tokens, after, trim_right) = lex_action(inner)?;
        if let Some(tokens) = tokens {
            items.push(Item::Action(tokens));
        }
        trim_next = trim_right;
        rest = after;
    }

    Ok(items)
}

fn push_text(items: &mut Vec<Item>, text: &str, trim_start: bool) {
    let text = if trim_start { text.trim_start() } else { text };
    if !text.is_empty() {
        items.push(Item::Text(text.to_string()));
    }
}

/// `{{- ` requires whitespace after the dash so `{{-3}}` stays a number.
fn starts_with_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

/// Returns `(tokens, remaining source, trim-right)`; comments yield no tokens.
fn lex_action(src: &str) -> Result<(Option<Vec<Token>>, &str, bool), TemplateError> {
    let trimmed = src.trim_start();
    if let Some(body) = trimmed.strip_prefix("/*") {
        let end = body
            .find("*/")
            .ok_or_else(|| TemplateError::Parse("unclosed comment".to_string()))?;
        let after = body[end + 2..].trim_start();
        let (after, trim_right) = close_action(after)
            .ok_or_else(|| TemplateError::Parse("comment ends before closing delimiter".to_string()))?;
        return Ok((None, after, trim_right));
    }

    let mut tokens = Vec::new();
    let mut pos = 0;
    let bytes = src.as_bytes();

    loop {
        let rest = &src[pos..];
        if let Some((after, trim_right)) = close_action(rest) {
            return Ok((Some(tokens), after, trim_right));
        }
        let c = rest
            .chars()
            .next()
            .ok_or_else(|| TemplateError::Parse("unclosed action".to_string()))?;

        match c {
            c if c.is_whitespace() => pos += c.len_utf8(),
            '|' => {
                tokens.push(Token::Pipe);
                pos += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            '.' => {
                let (token, len) = lex_field(rest);
                tokens.push(token);
                pos += len;
            }
            '"' => {
                let (value, len) = lex_quoted(rest)?;
                tokens.push(Token::Literal(Value::String(value)));
                pos += len;
            }
            '`' => {
                let end = rest[1..]
                    .find('`')
                    .ok_or_else(|| TemplateError::Parse("unterminated raw quoted string".to_string()))?;
                tokens.push(Token::Literal(Value::String(rest[1..1 + end].to_string())));
                pos += end + 2;
            }
            c if c.is_ascii_digit()
                || ((c == '-' || c == '+')
                    && bytes.get(pos + 1).is_some_and(|b| b.is_ascii_digit())) =>
            {
                let (number, len) = lex_number(rest)?;
                tokens.push(Token::Literal(Value::Number(number)));
                pos += len;
            }
            c if is_ident_char(c) => {
                let len = rest
                    .find(|ch: char| !is_ident_char(ch))
                    .unwrap_or(rest.len());
                let word = &rest[..len];
                tokens.push(match word {
                    "true" => Token::Literal(Value::Bool(true)),
                    "false" => Token::Literal(Value::Bool(false)),
                    "nil" => Token::Literal(Value::Null),
                    _ => Token::Ident(word.to_string()),
                });
                pos += len;
            }
            other => {
                return Err(TemplateError::Parse(format!(
                    "unexpected {other:?} in action"
                )))
            }
        }
    }
}

/// Matches `}}` or ` -}}` at the start of `s`.
fn close_action(s: &str) -> Option<(&str, bool)> {
    if let Some(after) = s.strip_prefix(RIGHT) {
        return Some((after, false));
    }
    let mut chars = s.chars();
    let first = chars.next()?;
    if first.is_whitespace() {
        let rest = s[first.len_utf8()..].trim_start();
        if let Some(after) = rest.strip_prefix("-}}") {
            return Some((after, true));
        }
    }
    None
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn lex_field(s: &str) -> (Token, usize) {
    let mut path = Vec::new();
    let mut pos = 0;
    while s[pos..].starts_with('.') {
        let name_len = s[pos + 1..]
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(s.len() - pos - 1);
        if name_len == 0 {
            break;
        }
        path.push(s[pos + 1..pos + 1 + name_len].to_string());
        pos += 1 + name_len;
    }
    if path.is_empty() {
        (Token::Dot, 1)
    } else {
        (Token::Field(path), pos)
    }
}

fn lex_quoted(s: &str) -> Result<(String, usize), TemplateError> {
    let mut out = String::new();
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, i + 1)),
            '\\' => {
                let (_, esc) = chars
                    .next()
                    .ok_or_else(|| TemplateError::Parse("unterminated quoted string".to_string()))?;
                out.push(match esc {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '"' => '"',
                    other => {
                        return Err(TemplateError::Parse(format!(
                            "unknown escape sequence \\{other}"
                        )))
                    }
                });
            }
            '\n' => return Err(TemplateError::Parse("unterminated quoted string".to_string())),
            c => out.push(c),
        }
    }
    Err(TemplateError::Parse("unterminated quoted string".to_string()))
}

fn lex_number(s: &str) -> Result<(Number, usize), TemplateError> {
    let len = s
        .char_indices()
        .skip(1)
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let raw = &s[..len];
    if let Ok(int) = raw.parse::<i64>() {
        return Ok((Number::from(int), len));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(|n| (n, len))
        .ok_or_else(|| TemplateError::Parse(format!("bad number syntax: {raw:?}")))
}
