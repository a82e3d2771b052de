//! Typed scalar values stored at the leaves of a configuration tree.
//!
//! Configuration documents carry no schema, so every leaf is classified by
//! looking at its text. The inference order is fixed:
//!
//! 1. integer (`42`, `-7`)
//! 2. float (`3.5`, `1e3`)
//! 3. boolean (`true` / `false`, any case)
//! 4. non-empty string
//! 5. empty
//!
//! Formatting is value-preserving rather than text-preserving: `True` is
//! written back as `true`, `01` as `1`.

use std::fmt;

/// A classified leaf value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypedValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    #[default]
    Empty,
}

impl TypedValue {
    /// Classify `text`. Never fails; unrecognised text becomes a string.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();

        if let Ok(v) = trimmed.parse::<i64>() {
            return Self::Integer(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return Self::Float(v);
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Self::Boolean(false);
        }
        if text.is_empty() {
            Self::Empty
        } else {
            Self::String(text.to_string())
        }
    }

    /// Text form written back to the document.
    pub fn format(&self) -> String {
        self.to_string()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Truthiness used for configuration flags such as `RFout`.
    ///
    /// Numbers are true when positive, strings when they read `true`, `yes`
    /// or `1`.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Integer(v) => *v > 0,
            Self::Float(v) => *v > 0.0,
            Self::String(s) => {
                let s = s.trim().to_ascii_lowercase();
                s == "true" || s == "yes" || s == "1"
            }
            Self::Empty => false,
        }
    }

    /// Integer view. Floats with no fractional part and numeric strings are
    /// accepted as well.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String view; only the `String` variant borrows.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON value with the natural JSON type.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Integer(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Empty => serde_json::Value::String(String::new()),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            // Debug keeps the fractional part (`1.0`) so the text re-parses
            // as a float.
            Self::Float(v) => write!(f, "{:?}", v),
            Self::Boolean(true) => f.write_str("true"),
            Self::Boolean(false) => f.write_str("false"),
            Self::String(s) => f.write_str(s),
            Self::Empty => Ok(()),
        }
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        if v.is_empty() {
            Self::Empty
        } else {
            Self::String(v.to_string())
        }
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        if v.is_empty() {
            Self::Empty
        } else {
            Self::String(v)
        }
    }
}
