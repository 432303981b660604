use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::Path;

use crate::parser::{from_str, ParsingError};
use crate::value::Value;

/// Failure while loading a document from a file: either the read itself or
/// the parse of the normalized text.
#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Parse(ParsingError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(err) => write!(f, "LoadError: {}", err),
            LoadError::Parse(err) => write!(f, "LoadError: {}", err),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err),
            LoadError::Parse(err) => Some(err),
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::Io(err)
    }
}

impl From<ParsingError> for LoadError {
    fn from(err: ParsingError) -> Self {
        LoadError::Parse(err)
    }
}

/// Removes every line-break byte that occurs outside a quoted string
/// region, producing the single-logical-line text the parser requires.
/// Whether a position is inside a string is tracked by a running flag
/// toggled on each unescaped `"`; line breaks inside strings survive.
pub fn strip_newlines(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut prev: Option<char> = None;
    for c in raw.chars() {
        match c {
            '"' => {
                if prev != Some('\\') {
                    in_string = !in_string;
                }
                out.push(c);
            }
            '\n' | '\r' if !in_string => {}
            _ => out.push(c),
        }
        prev = Some(c);
    }
    out
}

/// Reads a file, normalizes its line breaks, and parses the result. The
/// only place in the crate that touches a file handle.
pub fn from_file(path: impl AsRef<Path>) -> Result<Value, LoadError> {
    let raw = fs::read_to_string(path)?;
    let normalized = strip_newlines(&raw);
    Ok(from_str(&normalized)?)
}
