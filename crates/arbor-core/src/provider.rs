//! Handle provider contract
//!
//! A provider is whatever automation or IPC layer actually owns the external
//! objects. The core treats it as an opaque capability: every forwarding
//! operation on a node becomes exactly one provider call.

use crate::errors::ProviderError;
use crate::value::{RawHandle, Value};

/// Handles produced when instantiating a root object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootHandles {
    /// The application object that produced the dispatch handle
    pub application: RawHandle,
    /// The navigable handle the root node forwards calls to
    pub dispatch: RawHandle,
}

/// Capability that owns external objects and performs calls on them
pub trait HandleProvider: Send + Sync {
    /// Instantiate a root object by identifier.
    ///
    /// Implementations must not leak the application handle when obtaining
    /// the dispatch handle fails.
    fn create_root(&self, identifier: &str) -> Result<RootHandles, ProviderError>;

    /// Read a named property
    fn get_property(
        &self,
        handle: RawHandle,
        name: &str,
        args: &[Value],
    ) -> Result<Value, ProviderError>;

    /// Write a named property
    fn put_property(
        &self,
        handle: RawHandle,
        name: &str,
        args: &[Value],
    ) -> Result<(), ProviderError>;

    /// Invoke a named method
    fn call_method(
        &self,
        handle: RawHandle,
        name: &str,
        args: &[Value],
    ) -> Result<Value, ProviderError>;

    /// Release a handle. Called exactly once per handle by the core.
    fn release(&self, handle: RawHandle) -> Result<(), ProviderError>;

    /// Decide whether a returned value is itself a navigable handle
    fn as_handle(&self, value: &Value) -> Option<RawHandle> {
        value.as_handle()
    }
}
