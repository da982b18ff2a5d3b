//! JSON Pointer (RFC 6901) syntax and navigation.
//!
//! Pointers are validated strictly: the input must be non-empty, start with
//! `/`, use only `~0`/`~1` escapes and contain no empty reference tokens.
//! `/` alone addresses the root.
//!
//! Navigation walks any value implementing [`Navigable`], dispatching each
//! token through the value's capabilities in a fixed order (alternate node,
//! key, index, structure). Raw document nodes are walked through a
//! [`docmodel_yaml::Document`], with aliases and merge keys resolved.

mod error;
mod impls;
mod navigable;
mod navigator;

use std::fmt;

pub use error::{JsonPointerError, StepError, ValidationError};
pub use navigable::{
    FieldRef, IndexNavigable, KeyNavigable, MapLike, Navigable, NavigableNoder, SequenceLike,
    StructView, Structure, Target,
};
pub use navigator::{remove_node, set_node, NavigateOptions, Navigator};

/// One parsed reference token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Key(String),
    /// All digits, no leading zero unless exactly `0`.
    Index(usize),
}

fn is_index_syntax(text: &str) -> bool {
    let digits = !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit());
    digits && !(text.len() > 1 && text.starts_with('0'))
}

impl Token {
    fn classify(text: String) -> Token {
        if is_index_syntax(&text) {
            if let Ok(index) = text.parse() {
                return Token::Index(index);
            }
        }
        Token::Key(text)
    }

    /// A key that is an index by syntax but too large for `usize`. No
    /// sequence is that long, so against one it is simply not found.
    pub fn is_overflowed_index(&self) -> bool {
        matches!(self, Token::Key(k) if is_index_syntax(k))
    }

    /// The token text, whatever its kind.
    pub fn as_key(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Token::Key(k) => std::borrow::Cow::Borrowed(k),
            Token::Index(i) => std::borrow::Cow::Owned(i.to_string()),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Key(k) => f.write_str(&escape_component(k)),
            Token::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Unescapes one reference token. `~` must be followed by `0` or `1`.
pub fn unescape_component(component: &str) -> Result<String, ValidationError> {
    if component.chars().any(char::is_control) {
        return Err(ValidationError::InvalidCharacter {
            token: component.to_string(),
        });
    }
    if !component.contains('~') {
        return Ok(component.to_string());
    }
    let mut out = String::with_capacity(component.len());
    let mut chars = component.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => {
                return Err(ValidationError::InvalidEscape {
                    token: component.to_string(),
                })
            }
        }
    }
    Ok(out)
}

/// Escapes one reference token.
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Parses an absolute pointer into unescaped components.
///
/// Examples:
/// - `"/" -> []`
/// - `"/a~1b/~0k/0" -> ["a/b", "~k", "0"]`
/// - `""`, `"a"`, `"/a//b"`, `"/a/"`, `"/a/~2"` are rejected
pub fn parse_json_pointer(pointer: &str) -> Result<Vec<String>, ValidationError> {
    if pointer.is_empty() {
        return Err(ValidationError::Empty);
    }
    let Some(body) = pointer.strip_prefix('/') else {
        return Err(ValidationError::NotAbsolute);
    };
    if body.is_empty() {
        return Ok(Vec::new());
    }
    body.split('/')
        .enumerate()
        .map(|(position, raw)| {
            if raw.is_empty() {
                Err(ValidationError::EmptyToken { position })
            } else {
                unescape_component(raw)
            }
        })
        .collect()
}

/// Parses a pointer with reference conveniences: a leading `#` fragment
/// marker is dropped and relative strings get a `/` prefix.
pub fn parse_json_pointer_relaxed(pointer: &str) -> Result<Vec<String>, ValidationError> {
    let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
    if pointer.starts_with('/') || pointer.is_empty() {
        return parse_json_pointer(pointer);
    }
    let mut absolute = String::with_capacity(pointer.len() + 1);
    absolute.push('/');
    absolute.push_str(pointer);
    parse_json_pointer(&absolute)
}

/// Parses a pointer into classified tokens.
pub fn parse_tokens(pointer: &str) -> Result<Vec<Token>, ValidationError> {
    Ok(parse_json_pointer(pointer)?
        .into_iter()
        .map(Token::classify)
        .collect())
}

/// Checks pointer syntax without evaluating it.
pub fn validate(pointer: &str) -> Result<(), ValidationError> {
    parse_json_pointer(pointer).map(|_| ())
}

/// Formats unescaped components into a pointer. No components gives `/`.
pub fn format_json_pointer<S: AsRef<str>>(path: &[S]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for component in path {
        out.push('/');
        out.push_str(&escape_component(component.as_ref()));
    }
    out
}
