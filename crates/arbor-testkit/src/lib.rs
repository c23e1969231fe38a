//! Arbor Testing Infrastructure
//!
//! Provides a scripted in-memory [`FakeProvider`] with release accounting,
//! an [`ObjectModel`] describing the external object graph it serves, and
//! ready-made fixtures.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust,no_run
//! use arbor_testkit::*;
//!
//! let (provider, root) = workbook_root();
//! let sheets = root.child("Sheets").unwrap();
//! root.close();
//! assert!(sheets.is_closed());
//! assert_eq!(provider.released_objects(), vec!["sheets", "app"]);
//! ```

pub mod fixtures;
pub mod logging;
pub mod model;
pub mod provider;

pub use fixtures::*;
pub use logging::init_tracing;
pub use model::{ModelError, ObjectModel, ObjectSpec, Scalar};
pub use provider::{
    CallRecord, FakeProvider, HandleKind, LiveHandle, Operation, ReleasedHandle,
};
