use serde::{Deserialize, Serialize};
use std::fmt;

/// An absolute, slash-delimited pointer into the runtime data space.
///
/// The raw text is kept as written; [`Path::is_well_formed`] is checked by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(String);

impl Path {
    pub fn new(raw: impl Into<String>) -> Self {
        Path(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segments after the leading slash. Empty segments are yielded as-is.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.strip_prefix('/').unwrap_or(&self.0).split('/')
    }

    /// A path starts with `/`, has at least one segment, and no segment is empty.
    pub fn is_well_formed(&self) -> bool {
        self.0.starts_with('/') && self.segments().all(|s| !s.is_empty())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Literal and structural values used in properties, conditions and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    Path(Path),
    /// An opaque reference to a secret held by the runtime. Never resolved here.
    Credential(String),
    /// Keys keep their declaration order.
    Object(Vec<(String, Value)>),
    Array(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Path(_) => "path",
            Value::Credential(_) => "credential",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::String(_) | Value::Number(_) | Value::Bool(_))
    }

    /// True if a credential appears anywhere inside this value.
    pub fn contains_credential(&self) -> bool {
        match self {
            Value::Credential(_) => true,
            Value::Object(entries) => entries.iter().any(|(_, v)| v.contains_credential()),
            Value::Array(items) => items.iter().any(Value::contains_credential),
            _ => false,
        }
    }

    /// Visits every path nested in this value, depth first.
    pub fn for_each_path<'a>(&'a self, visit: &mut impl FnMut(&'a Path)) {
        match self {
            Value::Path(p) => visit(p),
            Value::Object(entries) => {
                for (_, v) in entries {
                    v.for_each_path(&mut *visit);
                }
            }
            Value::Array(items) => {
                for v in items {
                    v.for_each_path(&mut *visit);
                }
            }
            _ => {}
        }
    }
}

/// Renders the value in source syntax, as the parser accepts it back.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write_quoted(f, s),
            Value::Number(n) => write_number(f, *n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Path(p) => write!(f, "{}", p),
            Value::Credential(id) => {
                write!(f, "credential(")?;
                write_quoted(f, id)?;
                write!(f, ")")
            }
            Value::Object(entries) if entries.is_empty() => write!(f, "{{}}"),
            Value::Object(entries) => {
                write!(f, "{{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_key(f, key)?;
                    write!(f, ": {}", value)?;
                }
                write!(f, " }}")
            }
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Integral numbers print without a fraction.
pub(crate) fn write_number(f: &mut impl fmt::Write, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

pub(crate) fn write_quoted(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// Object keys print bare when they lex as identifiers.
pub(crate) fn write_key(f: &mut impl fmt::Write, key: &str) -> fmt::Result {
    if is_identifier(key) {
        f.write_str(key)
    } else {
        write_quoted(f, key)
    }
}

/// A string printed as a quoted, escaped literal.
pub(crate) struct Quoted<'a>(pub &'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_quoted(f, self.0)
    }
}

/// An object or property key, bare when it reads as an identifier.
pub(crate) struct Key<'a>(pub &'a str);

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_key(f, self.0)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, excluding the reserved words.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !is_reserved(text)
}

pub fn is_reserved(text: &str) -> bool {
    matches!(text, "true" | "false" | "null")
}
