//! Cascade close
//!
//! Tears a subtree down exactly once. The children list is emptied under
//! the node's exclusive guard before recursing, so a child's self-detach
//! during a cascade finds nothing to remove and never re-enters the
//! parent's locks.

use crate::node::{NodeInner, CLOSED, CLOSING, LIVE};
use crate::value::RawHandle;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, trace, warn};

impl NodeInner {
    pub(crate) fn close(&self) {
        if self
            .state
            .compare_exchange(LIVE, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.wait_finished();
            return;
        }

        let children = {
            let mut closed = self.guard.exclusive();
            self.close_signal.send_replace(true);
            *closed = true;
            std::mem::take(&mut *self.children.lock())
        };
        debug!(
            node = %self.id,
            label = %self.label,
            children = children.len(),
            "closing node"
        );

        for child in children {
            child.inner.close();
        }

        let interval = self.tree.config.pending_wait_warn_interval();
        self.pending.wait_until_zero(interval, |outstanding| {
            warn!(
                node = %self.id,
                label = %self.label,
                pending = outstanding,
                "still waiting for children to close"
            );
        });

        self.release(self.handle, "dispatch");
        if let Some(application) = self.application {
            self.release(application, "application");
        }

        self.detach_from_parent();
        self.state.store(CLOSED, Ordering::Release);
        *self.finished.lock() = true;
        self.finished_cv.notify_all();
        debug!(node = %self.id, label = %self.label, "node closed");
    }

    /// Block until the caller that won the close latch is done.
    ///
    /// Only the winner recurses into children, so a waiter never waits on
    /// its own teardown.
    fn wait_finished(&self) {
        let mut finished = self.finished.lock();
        while !*finished {
            self.finished_cv.wait(&mut finished);
        }
    }

    fn release(&self, handle: RawHandle, role: &'static str) {
        match self.tree.provider.release(handle) {
            Ok(()) => trace!(node = %self.id, %handle, role, "handle released"),
            Err(err) => {
                if self.tree.config.log_release_failures {
                    warn!(node = %self.id, %handle, role, error = %err, "handle release failed");
                }
            }
        }
    }

    /// Remove this node from its parent's children and deliver the
    /// pending-child decrement.
    fn detach_from_parent(&self) {
        let Some(link) = &self.parent else {
            return;
        };

        // Upgrade fails only while the parent is being dropped, in which
        // case its children were already drained.
        let parent = link.node.upgrade();
        let removed = parent.as_ref().and_then(|parent| {
            let mut siblings = parent.children.lock();
            if siblings.is_empty() {
                return None;
            }
            let position = siblings
                .iter()
                .position(|sibling| std::ptr::eq(Arc::as_ptr(&sibling.inner), self))?;
            Some(siblings.swap_remove(position))
        });
        if removed.is_some() {
            trace!(node = %self.id, "detached from parent");
        }

        // Decrement before dropping our strong reference: if that reference
        // is the last one, the parent's own close must not wait on us.
        link.pending.decrement();
        drop(removed);
        drop(parent);
    }
}
