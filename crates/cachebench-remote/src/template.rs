//! Positional command templates.
//!
//! Templates use numbered slots such as `{0}` and `{1}`; literal braces are
//! written `{{` and `}}`. A template's arity is one more than its highest
//! slot, and rendering requires exactly that many arguments.

use std::fmt::{Display, Write};

use cachebench_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(usize),
}

/// A parsed command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    segments: Vec<Segment>,
    arity: usize,
}

impl CommandTemplate {
    /// Parses a template.
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut index = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(d) if d.is_ascii_digit() => index.push(d),
                            Some(other) => {
                                return Err(Error::format(
                                    source,
                                    format!("unexpected '{other}' inside placeholder"),
                                ));
                            }
                            None => {
                                return Err(Error::format(source, "unterminated placeholder"));
                            }
                        }
                    }

                    let index = index
                        .parse()
                        .map_err(|_| Error::format(source, "empty placeholder"))?;

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(index));
                }
                '}' => return Err(Error::format(source, "unmatched '}'")),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let arity = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Slot(i) => Some(i + 1),
                Segment::Literal(_) => None,
            })
            .max()
            .unwrap_or(0);

        Ok(Self {
            source: source.to_owned(),
            segments,
            arity,
        })
    }

    /// Returns the number of arguments the template expects.
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the original template text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitutes the arguments into the template.
    pub fn render(&self, args: &[&dyn Display]) -> Result<String> {
        if args.len() != self.arity {
            return Err(Error::format(
                &self.source,
                format!(
                    "template expects {} argument(s) but {} were supplied",
                    self.arity,
                    args.len()
                ),
            ));
        }

        let mut rendered = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Slot(index) => {
                    let _ = write!(rendered, "{}", args[*index]);
                }
            }
        }

        Ok(rendered)
    }
}
