//! Parameter templates
//!
//! Agent and task text may contain `{name}` placeholders that are filled from
//! the run's parameter mapping. Templates are tokenized once when the crew is
//! assembled; the source text is kept untouched so the same crew can be run
//! again with different parameters.
//!
//! Syntax:
//! - `{name}` - placeholder (`name` = `[A-Za-z_][A-Za-z0-9_]*`)
//! - `{{` / `}}` - literal `{` / `}`
//! - any other brace sequence (`{"a": 1}`, `{ x }`) is kept as literal text

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use crate::error::{CrewError, Result};

/// Run parameters (keys unique, values strings)
pub type Parameters = BTreeMap<String, String>;

/// Token representing a parsed template fragment
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Literal text (range in the source string)
    Literal(Range<usize>),
    /// Placeholder name (range in the source string, without braces)
    Param(Range<usize>),
}

/// A tokenized template
#[derive(Debug, Clone)]
pub struct Template {
    source: Arc<str>,
    tokens: Vec<Token>,
}

impl Template {
    /// Tokenize a template string
    pub fn parse(source: impl Into<Arc<str>>) -> Self {
        let source: Arc<str> = source.into();
        let tokens = tokenize(&source);
        Self { source, tokens }
    }

    /// Original template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance (duplicates included)
    pub fn placeholders(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens.iter().filter_map(|t| match t {
            Token::Param(r) => Some(&self.source[r.clone()]),
            Token::Literal(_) => None,
        })
    }

    /// True when the template has no placeholders
    pub fn is_static(&self) -> bool {
        self.placeholders().next().is_none()
    }

    /// Substitute every placeholder from `params`.
    ///
    /// Fails on the first placeholder without a matching key; `location`
    /// describes where the template lives (e.g. "task 'script' description").
    pub fn resolve(&self, params: &Parameters, location: &str) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for token in &self.tokens {
            match token {
                Token::Literal(r) => out.push_str(&self.source[r.clone()]),
                Token::Param(r) => {
                    let name = &self.source[r.clone()];
                    let value = params.get(name).ok_or_else(|| CrewError::MissingParameter {
                        token: name.to_string(),
                        location: location.to_string(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Self::parse(source)
    }
}

impl From<String> for Template {
    fn from(source: String) -> Self {
        Self::parse(source)
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn flush(tokens: &mut Vec<Token>, range: Range<usize>) {
    if !range.is_empty() {
        tokens.push(Token::Literal(range));
    }
}

/// Braces are ASCII, so byte offsets around them are always char boundaries.
fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'{' | b'}' if i + 1 < len && bytes[i + 1] == bytes[i] => {
                // Escaped brace: keep one, drop the other
                flush(&mut tokens, literal_start..i + 1);
                i += 2;
                literal_start = i;
            }
            b'{' if i + 1 < len && is_ident_start(bytes[i + 1]) => {
                let mut j = i + 2;
                while j < len && is_ident_char(bytes[j]) {
                    j += 1;
                }
                if j < len && bytes[j] == b'}' {
                    flush(&mut tokens, literal_start..i);
                    tokens.push(Token::Param(i + 1..j));
                    i = j + 1;
                    literal_start = i;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    flush(&mut tokens, literal_start..len);
    tokens
}

/// Parse a `key=value` pair (CLI `-i` flag)
pub fn parse_param(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw.split_once('=').ok_or_else(|| CrewError::InvalidInput {
        raw: raw.to_string(),
        reason: "expected key=value".to_string(),
    })?;
    let key = key.trim();
    let valid = key.bytes().next().is_some_and(is_ident_start) && key.bytes().all(is_ident_char);
    if !valid {
        return Err(CrewError::InvalidInput {
            raw: raw.to_string(),
            reason: format!("'{}' is not a valid parameter name", key),
        });
    }
    Ok((key.to_string(), value.to_string()))
}
