//! Runtime Value Representation
//!
//! A value is a single-owner tagged cell. Assigning a new value drops the
//! previous payload, so a slot can never hold two payloads or leak one.
//! Equality only holds between values of the same tag.

use std::fmt;

/// Runtime value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Slot that has never been written
    #[default]
    Uninit,

    /// 32-bit signed integer
    Int(i32),

    /// 32-bit IEEE float
    Float(f32),

    /// Owned string
    Str(String),
}

impl Value {
    /// Boolean coercion: nonzero numbers and non-empty strings are true.
    /// Uninitialized values have no truth value.
    pub fn truthy(&self) -> Option<bool> {
        match self {
            Value::Int(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::Str(s) => Some(!s.is_empty()),
            Value::Uninit => None,
        }
    }

    pub fn is_uninit(&self) -> bool {
        matches!(self, Value::Uninit)
    }

    /// Name of the tag, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Uninit => "uninitialized",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(v as i32)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uninit => write!(f, "uninitialized"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}
