//! Access guard
//!
//! Shared mode admits any number of concurrent forwarding calls; exclusive
//! mode is taken only by the close algorithm to flip the closed flag.
//!
//! ## Lock Usage
//!
//! Uses `parking_lot::RwLock` because:
//! - its task-fair policy blocks new readers once a writer is queued, so a
//!   close cannot be starved by a stream of reads
//! - the closed check happens after the read side is held, never before

use crate::errors::{ArborError, Result};
use crate::node::NodeId;
use parking_lot::{RwLock, RwLockWriteGuard};

#[derive(Debug)]
pub(crate) struct AccessGuard {
    node: NodeId,
    closed: RwLock<bool>,
}

impl AccessGuard {
    pub(crate) fn new(node: NodeId) -> Self {
        Self {
            node,
            closed: RwLock::new(false),
        }
    }

    /// Run `operation` under shared mode unless the node is closed.
    pub(crate) fn protected_call<T>(&self, operation: impl FnOnce() -> Result<T>) -> Result<T> {
        let closed = self.closed.read();
        if *closed {
            return Err(ArborError::closed(self.node));
        }
        let result = operation();
        drop(closed);
        result
    }

    /// Enter exclusive mode. Waits for in-flight shared holders.
    pub(crate) fn exclusive(&self) -> RwLockWriteGuard<'_, bool> {
        self.closed.write()
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_protected_call_runs_until_closed() {
        let guard = AccessGuard::new(NodeId::from_raw(1));
        assert_eq!(guard.protected_call(|| Ok(5)).unwrap(), 5);

        *guard.exclusive() = true;

        let ran = AtomicBool::new(false);
        let result = guard.protected_call(|| {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        });
        assert!(result.unwrap_err().is_closed());
        assert!(!ran.load(Ordering::SeqCst));
        assert!(guard.is_closed());
    }

    #[test]
    fn test_operation_error_propagates() {
        let guard = AccessGuard::new(NodeId::from_raw(2));
        let result: Result<()> = guard.protected_call(|| Err(ArborError::callback("nope")));
        assert_eq!(result.unwrap_err(), ArborError::callback("nope"));
    }

    #[test]
    fn test_exclusive_waits_for_in_flight_reader() {
        let guard = Arc::new(AccessGuard::new(NodeId::from_raw(3)));
        let started = Arc::new(Barrier::new(2));
        let finished = Arc::new(AtomicBool::new(false));

        let reader = {
            let guard = Arc::clone(&guard);
            let started = Arc::clone(&started);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                guard.protected_call(|| {
                    started.wait();
                    thread::sleep(Duration::from_millis(50));
                    finished.store(true, Ordering::SeqCst);
                    Ok(())
                })
            })
        };

        started.wait();
        let mut closed = guard.exclusive();
        assert!(finished.load(Ordering::SeqCst));
        *closed = true;
        drop(closed);

        assert!(reader.join().unwrap().is_ok());
    }
}
