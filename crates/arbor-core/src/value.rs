//! Opaque values exchanged with a handle provider
//!
//! The core never interprets a `RawHandle`; it only stores it and hands it
//! back to the provider that minted it.

use crate::errors::{ArborError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque token for an externally-owned object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawHandle(pub u64);

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// Argument or return value of a provider call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// No value (void return, missing optional argument)
    #[default]
    Empty,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    Text(String),
    /// Navigable reference to another external object
    Handle(RawHandle),
}

impl Value {
    /// Short name of the value's kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Handle(_) => "handle",
        }
    }

    /// The handle carried by this value, if any
    pub fn as_handle(&self) -> Option<RawHandle> {
        match self {
            Self::Handle(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Project onto an integer.
    ///
    /// Floats are accepted when they hold an exact integral value.
    pub fn to_int(&self, name: &str) -> Result<i64> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Float(v)
                if v.is_finite()
                    && v.fract() == 0.0
                    && *v >= i64::MIN as f64
                    && *v < i64::MAX as f64 =>
            {
                Ok(*v as i64)
            }
            other => Err(ArborError::type_mismatch(name, "int", other.kind())),
        }
    }

    /// Project onto text
    pub fn to_text(&self, name: &str) -> Result<String> {
        match self {
            Self::Text(v) => Ok(v.clone()),
            other => Err(ArborError::type_mismatch(name, "text", other.kind())),
        }
    }

    /// Project onto a boolean
    pub fn to_bool(&self, name: &str) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(ArborError::type_mismatch(name, "bool", other.kind())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "<empty>"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Handle(h) => write!(f, "{h}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<RawHandle> for Value {
    fn from(v: RawHandle) -> Self {
        Self::Handle(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_projection() {
        assert_eq!(Value::Int(3).to_int("Count").unwrap(), 3);
        assert_eq!(Value::Float(4.0).to_int("Count").unwrap(), 4);

        let err = Value::Float(4.5).to_int("Count").unwrap_err();
        assert_eq!(err, ArborError::type_mismatch("Count", "int", "float"));

        // 2^63 is one past i64::MAX and must not saturate.
        let err = Value::Float(2f64.powi(63)).to_int("Count").unwrap_err();
        assert_eq!(err, ArborError::type_mismatch("Count", "int", "float"));
        assert_eq!(
            Value::Float(-(2f64.powi(63))).to_int("Count").unwrap(),
            i64::MIN
        );

        let err = Value::Text("3".into()).to_int("Count").unwrap_err();
        assert!(matches!(err, ArborError::TypeMismatch { .. }));
    }

    #[test]
    fn test_text_and_bool_projection() {
        assert_eq!(Value::from("Sheet1").to_text("Name").unwrap(), "Sheet1");
        assert!(Value::from(true).to_bool("Visible").unwrap());

        assert!(Value::Int(1).to_bool("Visible").is_err());
        assert!(Value::Empty.to_text("Name").is_err());
    }

    #[test]
    fn test_only_handles_are_navigable() {
        assert_eq!(
            Value::Handle(RawHandle(9)).as_handle(),
            Some(RawHandle(9))
        );
        assert_eq!(Value::Int(9).as_handle(), None);
    }
}
