//! Builds the node tree for a lexed template.

use serde_json::Value;

use super::funcs::Helpers;
use super::lexer::{Item, Token};
use super::TemplateError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
    If(Branch),
    Range(Branch),
    With(Branch),
}

/// Shared shape of `if`, `range` and `with`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Branch {
    pub pipeline: Pipeline,
    pub body: Vec<Node>,
    pub otherwise: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Dot,
    Field(Vec<String>),
    Func(String),
    Literal(Value),
    Sub(Pipeline),
}

#[derive(Debug, PartialEq)]
enum Terminator {
    Eof,
    End,
    Else(Vec<Token>),
}

pub(crate) fn parse(items: Vec<Item>, helpers: &Helpers) -> Result<Vec<Node>, TemplateError> {
    let mut parser = Parser {
        items: items.into_iter(),
        helpers,
    };
    let (nodes, term) = parser.list()?;
    match term {
        Terminator::Eof => Ok(nodes),
        Terminator::End => Err(TemplateError::Parse("unexpected {{end}}".to_string())),
        Terminator::Else(_) => Err(TemplateError::Parse("unexpected {{else}}".to_string())),
    }
}

struct Parser<'a> {
    items: std::vec::IntoIter<Item>,
    helpers: &'a Helpers,
}

impl Parser<'_> {
    fn list(&mut self) -> Result<(Vec<Node>, Terminator), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.next() {
            let tokens = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action(tokens) => tokens,
            };

            match tokens.first() {
                Some(Token::Ident(word)) if word == "end" => {
                    if tokens.len() > 1 {
                        return Err(TemplateError::Parse("unexpected tokens after end".to_string()));
                    }
                    return Ok((nodes, Terminator::End));
                }
                Some(Token::Ident(word)) if word == "else" => {
                    return Ok((nodes, Terminator::Else(tokens[1..].to_vec())));
                }
                Some(Token::Ident(word)) if matches!(word.as_str(), "if" | "range" | "with") => {
                    let keyword = word.clone();
                    let branch = self.branch(&keyword, &tokens[1..])?;
                    nodes.push(match keyword.as_str() {
                        "if" => Node::If(branch),
                        "range" => Node::Range(branch),
                        _ => Node::With(branch),
                    });
                }
                _ => nodes.push(Node::Action(self.pipeline(&tokens)?)),
            }
        }
        Ok((nodes, Terminator::Eof))
    }

    fn branch(&mut self, keyword: &str, tokens: &[Token]) -> Result<Branch, TemplateError> {
        if tokens.is_empty() {
            return Err(TemplateError::Parse(format!("missing value for {keyword}")));
        }
        let pipeline = self.pipeline(tokens)?;
        let (body, term) = self.list()?;
        let otherwise = match term {
            Terminator::End => Vec::new(),
            Terminator::Eof => {
                return Err(TemplateError::Parse(format!("unexpected EOF in {keyword}")))
            }
            Terminator::Else(rest) if rest.is_empty() => {
                let (otherwise, term) = self.list()?;
                if term != Terminator::End {
                    return Err(TemplateError::Parse(format!(
                        "expected {{{{end}}}} after {{{{else}}}} in {keyword}"
                    )));
                }
                otherwise
            }
            // `{{else if ...}}` chains share the closing {{end}}.
            Terminator::Else(rest) => match rest.first() {
                Some(Token::Ident(word)) if word == "if" && keyword == "if" => {
                    vec![Node::If(self.branch("if", &rest[1..])?)]
                }
                _ => {
                    return Err(TemplateError::Parse(format!(
                        "unexpected tokens after else in {keyword}"
                    )))
                }
            },
        };
        Ok(Branch {
            pipeline,
            body,
            otherwise,
        })
    }

    fn pipeline(&self, tokens: &[Token]) -> Result<Pipeline, TemplateError> {
        if tokens.is_empty() {
            return Err(TemplateError::Parse("missing value for command".to_string()));
        }
        let mut commands = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| TemplateError::Parse("unexpected right paren".to_string()))?;
                }
                Token::Pipe if depth == 0 => {
                    commands.push(self.command(&tokens[start..i])?);
                    start = i + 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(TemplateError::Parse("unclosed left paren".to_string()));
        }
        commands.push(self.command(&tokens[start..])?);
        Ok(Pipeline { commands })
    }

    fn command(&self, tokens: &[Token]) -> Result<Command, TemplateError> {
        if tokens.is_empty() {
            return Err(TemplateError::Parse("missing command in pipeline".to_string()));
        }
        let mut operands = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let operand = match &tokens[i] {
                Token::Dot => Operand::Dot,
                Token::Field(path) => Operand::Field(path.clone()),
                Token::Literal(value) => Operand::Literal(value.clone()),
                Token::Ident(name) => {
                    if !self.helpers.contains(name) {
                        return Err(TemplateError::Parse(format!(
                            "function {name:?} not defined"
                        )));
                    }
                    Operand::Func(name.clone())
                }
                Token::LParen => {
                    let close = matching_paren(tokens, i)?;
                    let sub = self.pipeline(&tokens[i + 1..close])?;
                    i = close;
                    Operand::Sub(sub)
                }
                Token::RParen => {
                    return Err(TemplateError::Parse("unexpected right paren".to_string()))
                }
                Token::Pipe => return Err(TemplateError::Parse("unexpected pipe".to_string())),
            };
            operands.push(operand);
            i += 1;
        }
        Ok(Command { operands })
    }
}

fn matching_paren(tokens: &[Token], open: usize) -> Result<usize, TemplateError> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(TemplateError::Parse("unclosed left paren".to_string()))
}
