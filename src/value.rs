use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::utils::{canonical_number, push_escaped};

/// The tag distinguishing which variant a [Value] is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Dictionary,
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Dictionary => "dictionary",
        };
        write!(f, "{}", name)
    }
}

/// A [Value::Dictionary] key: a String- or Number-kinded scalar.
///
/// A key's identity is its canonical textual encoding alone. Two keys whose
/// encodings are equal are the same key even when their kinds differ
/// (`Key::number(1.0)` collides with `Key::string("1")`), and keys order
/// lexically on the encoded text.
#[derive(Clone, Debug)]
pub struct Key {
    kind: Kind,
    text: String,
}

impl Key {
    pub fn string(text: impl Into<String>) -> Self {
        Key { kind: Kind::String, text: text.into() }
    }

    pub fn number(value: f64) -> Self {
        Key { kind: Kind::Number, text: canonical_number(value) }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The canonical textual encoding that identifies this key.
    pub fn as_text(&self) -> &str {
        &self.text
    }

    /// The numeric payload of a Number-kinded key.
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            Kind::Number => self.text.parse().ok(),
            _ => None,
        }
    }

    fn write(&self, out: &mut String) {
        match self.kind {
            Kind::String => {
                out.push('"');
                push_escaped(&self.text, out);
                out.push('"');
            }
            _ => out.push_str(&self.text),
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl From<&str> for Key {
    fn from(text: &str) -> Self {
        Key::string(text)
    }
}

impl From<String> for Key {
    fn from(text: String) -> Self {
        Key::string(text)
    }
}

impl From<f64> for Key {
    fn from(value: f64) -> Self {
        Key::number(value)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::number(value as f64)
    }
}

/// A misuse of the tree API, detected and reported instead of panicking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueError {
    /// index/get/size on a kind that has no children
    NotIndexable(Kind),
    /// append on something other than an Array
    NotAnArray(Kind),
    /// keys/insert on something other than a Dictionary
    NotADictionary(Kind),
    /// Array position not present; positions are never created implicitly
    MissingIndex { index: usize, len: usize },
    /// Array indexed by a key that does not encode an integral position
    NonIntegralIndex(String),
}

impl Display for ValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueError::NotIndexable(kind) => write!(f, "cannot index a {} value", kind),
            ValueError::NotAnArray(kind) => write!(f, "append requires an array, got {}", kind),
            ValueError::NotADictionary(kind) => write!(f, "operation requires a dictionary, got {}", kind),
            ValueError::MissingIndex { index, len } => {
                write!(f, "array index {} out of bounds (len {})", index, len)
            }
            ValueError::NonIntegralIndex(text) => {
                write!(f, "array index {:?} is not an integral position", text)
            }
        }
    }
}

impl std::error::Error for ValueError {}

/// One node of a JSON document tree.
///
/// A Value owns its descendants exclusively; the grammar is acyclic so a
/// tree can never contain itself. Dictionaries keep their entries sorted by
/// the key's textual encoding, so serialization order is the sort order,
/// not insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Dictionary(BTreeMap<Key, Value>),
}

fn array_position(key: &Key, len: usize) -> Result<usize, ValueError> {
    let number = match key.as_number() {
        Some(number) => number,
        None => return Err(ValueError::NonIntegralIndex(key.as_text().to_string())),
    };
    if number.fract() != 0.0 || number < 0.0 || number > usize::MAX as f64 {
        return Err(ValueError::NonIntegralIndex(key.as_text().to_string()));
    }
    let position = number as usize;
    if position >= len {
        return Err(ValueError::MissingIndex { index: position, len });
    }
    Ok(position)
}

impl Value {
    pub fn new_array() -> Self {
        Value::Array(Vec::new())
    }

    pub fn new_dictionary() -> Self {
        Value::Dictionary(BTreeMap::new())
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Dictionary(_) => Kind::Dictionary,
        }
    }

    /// Looks up a child for mutation.
    ///
    /// On an Array the key must name an existing position; positions are
    /// never created implicitly. On a Dictionary a missing key is inserted
    /// as Null before being returned, so indexing a Dictionary MUTATES it
    /// even when the caller only reads through the reference (upsert on
    /// read). Use [Value::get] for a lookup without side effects.
    pub fn index(&mut self, key: impl Into<Key>) -> Result<&mut Value, ValueError> {
        let key = key.into();
        match self {
            Value::Array(values) => {
                let position = array_position(&key, values.len())?;
                Ok(&mut values[position])
            }
            Value::Dictionary(entries) => Ok(entries.entry(key).or_insert(Value::Null)),
            other => Err(ValueError::NotIndexable(other.kind())),
        }
    }

    /// Non-mutating lookup. None for absent keys and for kinds without
    /// children.
    pub fn get(&self, key: impl Into<Key>) -> Option<&Value> {
        let key = key.into();
        match self {
            Value::Array(values) => {
                let position = array_position(&key, values.len()).ok()?;
                values.get(position)
            }
            Value::Dictionary(entries) => entries.get(&key),
            _ => None,
        }
    }

    /// Appends to an Array, the new value taking the next position.
    pub fn append(&mut self, value: impl Into<Value>) -> Result<(), ValueError> {
        match self {
            Value::Array(values) => {
                values.push(value.into());
                Ok(())
            }
            other => Err(ValueError::NotAnArray(other.kind())),
        }
    }

    /// Inserts a Dictionary entry, returning the value it replaced, if any.
    ///
    /// The first key inserted at a given encoding keeps its kind; a later
    /// colliding key only replaces the value.
    pub fn insert(
        &mut self,
        key: impl Into<Key>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, ValueError> {
        match self {
            Value::Dictionary(entries) => Ok(entries.insert(key.into(), value.into())),
            other => Err(ValueError::NotADictionary(other.kind())),
        }
    }

    /// Count of direct children of an Array or Dictionary.
    pub fn size(&self) -> Result<usize, ValueError> {
        match self {
            Value::Array(values) => Ok(values.len()),
            Value::Dictionary(entries) => Ok(entries.len()),
            other => Err(ValueError::NotIndexable(other.kind())),
        }
    }

    /// Dictionary keys in the collection's sort order (lexical on the
    /// encoded text), not insertion order.
    pub fn keys(&self) -> Result<Vec<&Key>, ValueError> {
        match self {
            Value::Dictionary(entries) => Ok(entries.keys().collect()),
            other => Err(ValueError::NotADictionary(other.kind())),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Renders the minimal single-line form. Numbers re-render through the
    /// canonical encoding, so the original literal spelling is not
    /// preserved.
    pub fn serialize_compact(&self) -> String {
        let mut out = String::new();
        self.write_compact(&mut out);
        out
    }

    fn write_compact(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Number(number) => out.push_str(&canonical_number(*number)),
            Value::String(text) => {
                out.push('"');
                push_escaped(text, out);
                out.push('"');
            }
            Value::Array(values) => {
                out.push('[');
                for (i, child) in values.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    child.write_compact(out);
                }
                out.push(']');
            }
            Value::Dictionary(entries) => {
                out.push('{');
                for (i, (key, child)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    key.write(out);
                    out.push(':');
                    child.write_compact(out);
                }
                out.push('}');
            }
        }
    }

    /// Renders the indented multi-line form. Every nesting level is indented
    /// by `indent` further spaces, every element except the last at its
    /// level is comma-terminated, and empty containers stay on one line.
    pub fn serialize_pretty(&self, indent: usize) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, indent, 0, false, false);
        out.pop();
        out
    }

    fn write_pretty(&self, out: &mut String, unit: usize, margin: usize, comma: bool, inline: bool) {
        if !inline {
            push_spaces(out, margin);
        }
        match self {
            Value::Array(values) if !values.is_empty() => {
                out.push('[');
                out.push('\n');
                for (i, child) in values.iter().enumerate() {
                    child.write_pretty(out, unit, margin + unit, i + 1 < values.len(), false);
                }
                push_spaces(out, margin);
                out.push(']');
            }
            Value::Dictionary(entries) if !entries.is_empty() => {
                out.push('{');
                out.push('\n');
                for (i, (key, child)) in entries.iter().enumerate() {
                    push_spaces(out, margin + unit);
                    key.write(out);
                    out.push_str(": ");
                    child.write_pretty(out, unit, margin + unit, i + 1 < entries.len(), true);
                }
                push_spaces(out, margin);
                out.push('}');
            }
            Value::Array(_) => out.push_str("[]"),
            Value::Dictionary(_) => out.push_str("{}"),
            scalar => scalar.write_compact(out),
        }
        if comma {
            out.push(',');
        }
        out.push('\n');
    }
}

fn push_spaces(out: &mut String, count: usize) {
    for _ in 0..count {
        out.push(' ');
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.serialize_compact())
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<f32> for Value {
    fn from(number: f32) -> Self {
        Value::Number(number as f64)
    }
}

impl From<i32> for Value {
    fn from(number: i32) -> Self {
        Value::Number(number as f64)
    }
}

impl From<u32> for Value {
    fn from(number: u32) -> Self {
        Value::Number(number as f64)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}
