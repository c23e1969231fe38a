//! Object model for the scripted provider
//!
//! Describes an external object graph: named objects with scalar
//! properties, child properties pointing at other objects, indexed item
//! collections and callable methods. Loadable from TOML or built in code.

use arbor_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Errors while loading or validating an object model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The document could not be read or parsed
    #[error("Failed to load object model: {0}")]
    Load(String),

    /// A root or child points at an object that does not exist
    #[error("{owner} references unknown object {target}")]
    UnknownObject {
        /// Root identifier or `object.property` doing the referencing
        owner: String,
        /// Missing object name
        target: String,
    },
}

/// Scalar property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Text
    Text(String),
}

impl Scalar {
    /// Convert a provider argument into a scalar, if it is one
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(Self::Bool(*v)),
            Value::Int(v) => Some(Self::Int(*v)),
            Value::Float(v) => Some(Self::Float(*v)),
            Value::Text(v) => Some(Self::Text(v.clone())),
            Value::Empty | Value::Handle(_) => None,
        }
    }

    /// Core value for this scalar
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(v) => Value::Bool(*v),
            Self::Int(v) => Value::Int(*v),
            Self::Float(v) => Value::Float(*v),
            Self::Text(v) => Value::Text(v.clone()),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One external object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObjectSpec {
    /// Scalar properties
    pub properties: BTreeMap<String, Scalar>,
    /// Properties that resolve to another object
    pub children: BTreeMap<String, String>,
    /// Indexed collections, addressed with a 1-based integer argument
    pub items: BTreeMap<String, Vec<String>>,
    /// Callable methods
    pub methods: Vec<String>,
}

impl ObjectSpec {
    /// Empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar property
    pub fn property(mut self, name: &str, value: impl Into<Scalar>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    /// Add a property resolving to `object`
    pub fn child(mut self, name: &str, object: &str) -> Self {
        self.children.insert(name.to_string(), object.to_string());
        self
    }

    /// Add an indexed collection
    pub fn items(mut self, name: &str, objects: &[&str]) -> Self {
        self.items.insert(
            name.to_string(),
            objects.iter().map(|o| (*o).to_string()).collect(),
        );
        self
    }

    /// Add a callable method
    pub fn method(mut self, name: &str) -> Self {
        self.methods.push(name.to_string());
        self
    }
}

/// External object graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObjectModel {
    /// Root identifier to object name
    pub roots: BTreeMap<String, String>,
    /// Objects by name
    pub objects: BTreeMap<String, ObjectSpec>,
}

impl ObjectModel {
    /// Empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root identifier
    pub fn root(mut self, identifier: &str, object: &str) -> Self {
        self.roots.insert(identifier.to_string(), object.to_string());
        self
    }

    /// Add an object
    pub fn object(mut self, name: &str, spec: ObjectSpec) -> Self {
        self.objects.insert(name.to_string(), spec);
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ModelError> {
        let model: Self = toml::from_str(content).map_err(|e| ModelError::Load(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    /// Load a model from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Load(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Check every reference points at a defined object
    pub fn validate(&self) -> Result<(), ModelError> {
        let check = |owner: String, target: &String| {
            if self.objects.contains_key(target) {
                Ok(())
            } else {
                Err(ModelError::UnknownObject {
                    owner,
                    target: target.clone(),
                })
            }
        };

        for (identifier, object) in &self.roots {
            check(identifier.clone(), object)?;
        }
        for (name, spec) in &self.objects {
            for (property, target) in &spec.children {
                check(format!("{name}.{property}"), target)?;
            }
            for (property, targets) in &spec.items {
                for target in targets {
                    check(format!("{name}.{property}"), target)?;
                }
            }
        }
        Ok(())
    }
}
