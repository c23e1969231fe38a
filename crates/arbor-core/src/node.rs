//! Resource nodes
//!
//! A `ResourceNode` owns exactly one external handle (plus the application
//! handle for roots) and the children acquired through it. Cloning a
//! `ResourceNode` clones a reference to the same node.
//!
//! ## Lock Usage
//!
//! Each node has two locks:
//! - the access guard (`parking_lot::RwLock`) protecting the closed flag
//! - `children` (`parking_lot::Mutex`), always exclusive, so concurrent
//!   child registrations on one parent never lose updates
//!
//! A node never holds its own guard while taking another node's lock. The
//! only cross-node lock is the parent's `children` during self-detach.

use crate::config::TreeConfig;
use crate::errors::{ArborError, Result};
use crate::guard::AccessGuard;
use crate::pending::PendingChildren;
use crate::provider::HandleProvider;
use crate::value::{RawHandle, Value};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, trace};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Build an id from its raw value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Lifecycle of a node. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Forwarding calls are accepted
    Live,
    /// Teardown has begun
    Closing,
    /// Every handle owned by the node has been released
    Closed,
}

pub(crate) const LIVE: u8 = 0;
pub(crate) const CLOSING: u8 = 1;
pub(crate) const CLOSED: u8 = 2;

/// State shared by every node of one tree
pub(crate) struct TreeContext {
    pub(crate) provider: Arc<dyn HandleProvider>,
    pub(crate) config: TreeConfig,
}

/// Link from a child to the node that produced it
pub(crate) struct ParentLink {
    pub(crate) node: Weak<NodeInner>,
    pub(crate) pending: Arc<PendingChildren>,
}

pub(crate) struct NodeInner {
    pub(crate) id: NodeId,
    pub(crate) label: String,
    pub(crate) tree: Arc<TreeContext>,
    pub(crate) handle: RawHandle,
    pub(crate) application: Option<RawHandle>,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) children: Mutex<Vec<ResourceNode>>,
    pub(crate) guard: AccessGuard,
    pub(crate) pending: Arc<PendingChildren>,
    pub(crate) state: AtomicU8,
    pub(crate) close_signal: watch::Sender<bool>,
    /// Set once the close algorithm has finished; losers of the latch wait on it
    pub(crate) finished: Mutex<bool>,
    pub(crate) finished_cv: Condvar,
}

impl NodeInner {
    fn new(
        label: &str,
        tree: Arc<TreeContext>,
        handle: RawHandle,
        application: Option<RawHandle>,
        parent: Option<ParentLink>,
    ) -> Self {
        let id = NodeId::next();
        let (close_signal, _) = watch::channel(false);
        Self {
            id,
            label: label.to_string(),
            tree,
            handle,
            application,
            parent,
            children: Mutex::new(Vec::new()),
            guard: AccessGuard::new(id),
            pending: Arc::new(PendingChildren::new()),
            state: AtomicU8::new(LIVE),
            close_signal,
            finished: Mutex::new(false),
            finished_cv: Condvar::new(),
        }
    }
}

impl Drop for NodeInner {
    fn drop(&mut self) {
        if self.state.load(Ordering::Acquire) == LIVE {
            debug!(node = %self.id, label = %self.label, "node dropped while live, closing");
            self.close();
        }
    }
}

/// A node of the ownership tree
#[derive(Clone)]
pub struct ResourceNode {
    pub(crate) inner: Arc<NodeInner>,
}

impl ResourceNode {
    /// Instantiate a root object through `provider` with the default config
    pub fn create_root(provider: Arc<dyn HandleProvider>, identifier: &str) -> Result<Self> {
        Self::create_root_with_config(provider, identifier, TreeConfig::default())
    }

    /// Instantiate a root object through `provider`
    pub fn create_root_with_config(
        provider: Arc<dyn HandleProvider>,
        identifier: &str,
        config: TreeConfig,
    ) -> Result<Self> {
        config.validate()?;
        let handles = provider.create_root(identifier)?;
        let tree = Arc::new(TreeContext { provider, config });
        let inner = NodeInner::new(
            identifier,
            tree,
            handles.dispatch,
            Some(handles.application),
            None,
        );
        debug!(node = %inner.id, identifier, "root created");
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Construct a child of `parent`. Counts as pending on the parent from
    /// this moment until the child finishes closing.
    fn child_of(parent: &ResourceNode, label: &str, handle: RawHandle) -> Self {
        parent.inner.pending.increment();
        let link = ParentLink {
            node: Arc::downgrade(&parent.inner),
            pending: Arc::clone(&parent.inner.pending),
        };
        let inner = NodeInner::new(
            label,
            Arc::clone(&parent.inner.tree),
            handle,
            None,
            Some(link),
        );
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Node identity
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Property name or root identifier that produced this node
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// The external handle owned by this node
    pub fn handle(&self) -> RawHandle {
        self.inner.handle
    }

    /// The application handle, present on roots only
    pub fn application_handle(&self) -> Option<RawHandle> {
        self.inner.application
    }

    /// Whether this node has no parent
    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Current lifecycle state
    pub fn state(&self) -> NodeState {
        match self.inner.state.load(Ordering::Acquire) {
            LIVE => NodeState::Live,
            CLOSING => NodeState::Closing,
            _ => NodeState::Closed,
        }
    }

    /// Whether teardown has begun
    pub fn is_closed(&self) -> bool {
        self.inner.guard.is_closed()
    }

    /// Number of registered children
    pub fn child_count(&self) -> usize {
        self.inner.children.lock().len()
    }

    /// Snapshot of the registered children
    pub fn children(&self) -> Vec<ResourceNode> {
        self.inner.children.lock().clone()
    }

    /// Children constructed but not yet fully closed, registered or not
    pub fn pending_children(&self) -> usize {
        self.inner.pending.count()
    }

    /// Whether `other` is a reference to the same node
    pub fn same_node(&self, other: &ResourceNode) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Receiver that flips to `true` when teardown begins
    pub fn closed_signal(&self) -> watch::Receiver<bool> {
        self.inner.close_signal.subscribe()
    }

    /// Resolve once teardown has begun
    pub async fn wait_closed(&self) {
        let mut signal = self.closed_signal();
        loop {
            if *signal.borrow() {
                return;
            }
            if signal.changed().await.is_err() {
                return;
            }
        }
    }

    /// Tear down this node and everything below it, then detach from the
    /// parent. Idempotent; a concurrent caller blocks until the first
    /// caller's teardown has finished.
    pub fn close(&self) {
        self.inner.close();
    }

    fn provider(&self) -> &dyn HandleProvider {
        self.inner.tree.provider.as_ref()
    }

    /// Read a property
    pub fn get(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.inner.guard.protected_call(|| {
            trace!(node = %self.inner.id, property = name, "get");
            Ok(self.provider().get_property(self.inner.handle, name, args)?)
        })
    }

    /// Write a property
    pub fn put(&self, name: &str, args: &[Value]) -> Result<()> {
        self.inner.guard.protected_call(|| {
            trace!(node = %self.inner.id, property = name, "put");
            Ok(self.provider().put_property(self.inner.handle, name, args)?)
        })
    }

    /// Invoke a method, discarding its result
    pub fn call(&self, name: &str, args: &[Value]) -> Result<()> {
        self.call_with_result(name, args).map(|_| ())
    }

    /// Invoke a method and return its result
    pub fn call_with_result(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.inner.guard.protected_call(|| {
            trace!(node = %self.inner.id, method = name, "call");
            Ok(self.provider().call_method(self.inner.handle, name, args)?)
        })
    }

    /// Read an integer property
    pub fn get_int(&self, name: &str) -> Result<i64> {
        self.get_int_with_args(name, &[])
    }

    /// Read an integer property with arguments
    pub fn get_int_with_args(&self, name: &str, args: &[Value]) -> Result<i64> {
        self.get(name, args)?.to_int(name)
    }

    /// Read a text property
    pub fn get_string(&self, name: &str) -> Result<String> {
        self.get_string_with_args(name, &[])
    }

    /// Read a text property with arguments
    pub fn get_string_with_args(&self, name: &str, args: &[Value]) -> Result<String> {
        self.get(name, args)?.to_text(name)
    }

    /// Read a boolean property
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.get_bool_with_args(name, &[])
    }

    /// Read a boolean property with arguments
    pub fn get_bool_with_args(&self, name: &str, args: &[Value]) -> Result<bool> {
        self.get(name, args)?.to_bool(name)
    }

    /// Acquire the child behind property `name`
    pub fn child(&self, name: &str) -> Result<ResourceNode> {
        self.acquire_child(name, &[])
    }

    /// Acquire the child behind property `name` called with `args`
    pub fn acquire_child(&self, name: &str, args: &[Value]) -> Result<ResourceNode> {
        self.acquire_child_with(name, args, |_| Ok(()))
    }

    /// Acquire the child behind property `name`, running `on_create` before
    /// the child is registered.
    ///
    /// If `on_create` fails the child is closed, never registered, and the
    /// callback's error is returned. `on_create` runs without this node's
    /// guard held; it must not close this node from the same thread.
    pub fn acquire_child_with<F>(
        &self,
        name: &str,
        args: &[Value],
        on_create: F,
    ) -> Result<ResourceNode>
    where
        F: FnOnce(&ResourceNode) -> Result<()>,
    {
        let child = self.inner.guard.protected_call(|| {
            let value = self.provider().get_property(self.inner.handle, name, args)?;
            let Some(handle) = self.provider().as_handle(&value) else {
                return Err(ArborError::not_a_handle(name, value.kind()));
            };
            Ok(ResourceNode::child_of(self, name, handle))
        })?;

        if let Err(err) = on_create(&child) {
            debug!(node = %child.id(), parent = %self.inner.id, error = %err, "child rejected by callback");
            child.close();
            return Err(err);
        }

        // The parent may have begun teardown while the callback ran.
        let registered = self.inner.guard.protected_call(|| {
            self.inner.children.lock().push(child.clone());
            Ok(())
        });
        if let Err(err) = registered {
            child.close();
            return Err(err);
        }

        debug!(node = %child.id(), parent = %self.inner.id, property = name, "child acquired");
        Ok(child)
    }
}

impl fmt::Debug for ResourceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceNode")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("handle", &self.inner.handle)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_are_unique() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
        assert_eq!(NodeId::from_raw(a.as_u64()), a);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::from_raw(12).to_string(), "node-12");
    }
}
