//! # Arbor Core - ownership tree for externally-owned handles
//!
//! Arbor manages handles to objects that live outside the process (COM-style
//! automation objects, remote IPC objects) and are reached by asking a parent
//! handle for a named child. It guarantees that:
//!
//! - every handle is released exactly once
//! - a parent is never released while a child obtained from it is live
//! - forwarding calls are rejected once teardown of a node has begun
//! - closing any node, from any thread, tears its subtree down without
//!   deadlock or double release
//!
//! ## Usage
//!
//! ```rust,ignore
//! let root = ResourceNode::create_root(provider, "Excel.Application")?;
//! let sheets = root.child("Sheets")?;
//! let count = sheets.get_int("Count")?;
//! root.close(); // releases sheets, then the root
//! ```
//!
//! Talking to the external objects is delegated to a [`HandleProvider`].

#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod node;
pub mod provider;
pub mod value;

mod close;
mod guard;
mod pending;

pub use config::TreeConfig;
pub use errors::{ArborError, ProviderError, Result};
pub use node::{NodeId, NodeState, ResourceNode};
pub use provider::{HandleProvider, RootHandles};
pub use value::{RawHandle, Value};
