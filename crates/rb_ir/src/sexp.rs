//! Reader for the parser's s-expression dump format.
//!
//! ```text
//! (send nil :puts
//!   (send (int 1) :+ (int 2)))
//! ```
//!
//! `nil` is an absent child, `:name` and `"text"` are string children, numbers
//! are integer or float children. Integer literals that do not fit in an `i64`
//! are kept as their digit string.

use std::rc::Rc;

use thiserror::Error;

use crate::{Child, Node};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fixture error at byte {offset}: {message}")]
pub struct FixtureError {
    pub offset: usize,
    pub message: String,
}

impl FixtureError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

pub fn parse(text: &str) -> Result<Node, FixtureError> {
    let mut r = Reader {
        src: text.as_bytes(),
        text,
        pos: 0,
    };
    r.skip_ws();
    let node = r.node()?;
    r.skip_ws();
    if r.pos != r.src.len() {
        return Err(FixtureError::new(r.pos, "trailing input after root node"));
    }
    Ok(node)
}

struct Reader<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() || c == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn node(&mut self) -> Result<Node, FixtureError> {
        if self.peek() != Some(b'(') {
            return Err(FixtureError::new(self.pos, "expected '('"));
        }
        self.pos += 1;
        self.skip_ws();
        let tag = self.word();
        if tag.is_empty() {
            return Err(FixtureError::new(self.pos, "expected node tag"));
        }
        let mut children = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(FixtureError::new(self.pos, "unclosed node")),
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => children.push(self.child()?),
            }
        }
        Ok(Node::new(tag, children))
    }

    fn child(&mut self) -> Result<Child, FixtureError> {
        match self.peek() {
            Some(b'(') => Ok(Child::Node(Rc::new(self.node()?))),
            Some(b'"') => Ok(Child::Str(self.string()?)),
            Some(b':') => {
                self.pos += 1;
                if self.peek() == Some(b'"') {
                    return Ok(Child::Str(self.string()?));
                }
                let w = self.word();
                if w.is_empty() {
                    return Err(FixtureError::new(self.pos, "empty symbol"));
                }
                Ok(Child::Str(w.to_string()))
            }
            _ => {
                let start = self.pos;
                let w = self.word();
                if w == "nil" {
                    return Ok(Child::Absent);
                }
                number(w).ok_or_else(|| FixtureError::new(start, format!("unexpected token '{w}'")))
            }
        }
    }

    fn word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() || c == b'(' || c == b')' || c == b',' {
                break;
            }
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn string(&mut self) -> Result<String, FixtureError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let rest = &self.text[self.pos..];
            let Some(c) = rest.chars().next() else {
                return Err(FixtureError::new(start, "unterminated string"));
            };
            self.pos += c.len_utf8();
            match c {
                '"' => return Ok(out),
                '\\' => {
                    let Some(e) = self.text[self.pos..].chars().next() else {
                        return Err(FixtureError::new(start, "unterminated escape"));
                    };
                    self.pos += e.len_utf8();
                    out.push(match e {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        'e' => '\u{1b}',
                        '0' => '\0',
                        other => other,
                    });
                }
                other => out.push(other),
            }
        }
    }
}

fn number(w: &str) -> Option<Child> {
    let digits = w.strip_prefix('-').unwrap_or(w);
    if digits.is_empty() || !digits.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    let cleaned: String = w.chars().filter(|c| *c != '_').collect();
    if cleaned.bytes().skip(1).all(|b| b.is_ascii_digit()) {
        return Some(match cleaned.parse::<i64>() {
            Ok(v) => Child::Int(v),
            Err(_) => Child::Str(cleaned),
        });
    }
    cleaned.parse::<f64>().ok().map(Child::Float)
}
