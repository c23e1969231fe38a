//! Error types for Arbor operations
//!
//! `ArborError` is what every core operation returns. Provider implementations
//! only ever produce `ProviderError`, which the core propagates verbatim.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Failure reported by a handle provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{operation} failed: {message}")]
pub struct ProviderError {
    /// Provider operation that failed (`get_property`, `release`, ...)
    pub operation: String,
    /// Provider supplied description
    pub message: String,
}

impl ProviderError {
    /// Create a provider error for the given operation
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Unified error type for all Arbor operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ArborError {
    /// Operation attempted after teardown of the node began
    #[error("{node} is already closed")]
    Closed {
        /// Node that rejected the call
        node: NodeId,
    },

    /// The handle provider rejected a call
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A resolved property was expected to be navigable but is not
    #[error("{name} is not a handle (found {found})")]
    NotAHandle {
        /// Property that was resolved
        name: String,
        /// Kind of the value actually returned
        found: String,
    },

    /// A typed projection of a property value failed
    #[error("{name} is not {expected} (found {found})")]
    TypeMismatch {
        /// Property that was read
        name: String,
        /// Requested projection
        expected: String,
        /// Kind of the value actually returned
        found: String,
    },

    /// A child creation callback refused the new child
    #[error("Child rejected: {message}")]
    Callback {
        /// Reason given by the callback
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },
}

impl ArborError {
    /// Create a closed error for a node
    pub fn closed(node: NodeId) -> Self {
        Self::Closed { node }
    }

    /// Create a not-a-handle error
    pub fn not_a_handle(name: impl Into<String>, found: impl Into<String>) -> Self {
        Self::NotAHandle {
            name: name.into(),
            found: found.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        name: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a callback rejection error
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error means the node has been torn down
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

/// Standard Result type for Arbor operations
pub type Result<T> = std::result::Result<T, ArborError>;
