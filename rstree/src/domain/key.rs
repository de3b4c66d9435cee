//! Node identifiers with strict equality semantics

use std::fmt;
use std::str::FromStr;

use serde_json::{Number, Value};

use crate::domain::error::TreeError;

/// Scalar identifier of a node.
///
/// Comparison is strict: a string never equals a number (`"1" != 1`), while
/// integral floats are normalized so `1` and `1.0` are the same key.
/// Arrays and objects cannot be keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum NodeKey {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    /// Non-integral, finite float stored by bit pattern
    Float(u64),
    Str(String),
}

impl NodeKey {
    /// Extract a key from a JSON scalar. Returns `None` for arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(NodeKey::Null),
            Value::Bool(b) => Some(NodeKey::Bool(*b)),
            Value::Number(n) => Some(Self::from_number(n)),
            Value::String(s) => Some(NodeKey::Str(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn from_number(n: &Number) -> Self {
        if let Some(i) = n.as_i64() {
            return NodeKey::Int(i);
        }
        match n.as_f64() {
            Some(f) => Self::from_f64(f),
            None => NodeKey::Str(n.to_string()),
        }
    }

    fn from_f64(f: f64) -> Self {
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            NodeKey::Int(f as i64)
        } else {
            NodeKey::Float(f.to_bits())
        }
    }

    /// Convert back into a JSON value (used when writing parent keys).
    pub fn to_value(&self) -> Value {
        match self {
            NodeKey::Null => Value::Null,
            NodeKey::Bool(b) => Value::Bool(*b),
            NodeKey::Int(i) => Value::from(*i),
            NodeKey::Float(bits) => Number::from_f64(f64::from_bits(*bits))
                .map(Value::Number)
                .unwrap_or(Value::Null),
            NodeKey::Str(s) => Value::String(s.clone()),
        }
    }

    /// Parse a JSON literal such as `null`, `0`, `"root"`.
    pub fn parse_literal(literal: &str) -> Result<Self, TreeError> {
        let value: Value = serde_json::from_str(literal.trim())
            .map_err(|e| TreeError::InvalidKey(format!("{literal}: {e}")))?;
        Self::from_value(&value)
            .ok_or_else(|| TreeError::InvalidKey(format!("{literal}: not a scalar")))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NodeKey::Null)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Null => write!(f, "null"),
            NodeKey::Bool(b) => write!(f, "{b}"),
            NodeKey::Int(i) => write!(f, "{i}"),
            NodeKey::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            NodeKey::Str(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for NodeKey {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_literal(s)
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        NodeKey::Str(s.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(s: String) -> Self {
        NodeKey::Str(s)
    }
}

impl From<i64> for NodeKey {
    fn from(i: i64) -> Self {
        NodeKey::Int(i)
    }
}

impl From<i32> for NodeKey {
    fn from(i: i32) -> Self {
        NodeKey::Int(i64::from(i))
    }
}

impl From<u32> for NodeKey {
    fn from(i: u32) -> Self {
        NodeKey::Int(i64::from(i))
    }
}

impl From<f64> for NodeKey {
    fn from(f: f64) -> Self {
        Self::from_f64(f)
    }
}

impl From<bool> for NodeKey {
    fn from(b: bool) -> Self {
        NodeKey::Bool(b)
    }
}

impl<T: Into<NodeKey>> From<Option<T>> for NodeKey {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(NodeKey::Null)
    }
}
