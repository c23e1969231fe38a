//! Pending-child counter
//!
//! Counts children that were constructed but have not finished their own
//! close. Shared between a node and its children through an `Arc`, so a
//! child can deliver its decrement even while the parent is being dropped.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct PendingChildren {
    count: Mutex<usize>,
    drained: Condvar,
}

impl PendingChildren {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment(&self) {
        *self.count.lock() += 1;
    }

    pub(crate) fn decrement(&self) {
        let mut count = self.count.lock();
        debug_assert!(*count > 0, "pending-child counter underflow");
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    pub(crate) fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Block until every counted child has finished closing.
    ///
    /// `on_slow` is invoked with the outstanding count each time `interval`
    /// elapses without the counter reaching zero.
    pub(crate) fn wait_until_zero(&self, interval: Duration, mut on_slow: impl FnMut(usize)) {
        let mut count = self.count.lock();
        while *count > 0 {
            if self.drained.wait_for(&mut count, interval).timed_out() && *count > 0 {
                on_slow(*count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wait_returns_immediately_when_zero() {
        let pending = PendingChildren::new();
        pending.wait_until_zero(Duration::from_millis(1), |_| panic!("not slow"));
        assert_eq!(pending.count(), 0);
    }

    #[test]
    fn test_wait_blocks_until_decremented() {
        let pending = Arc::new(PendingChildren::new());
        pending.increment();
        pending.increment();

        let worker = {
            let pending = Arc::clone(&pending);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                pending.decrement();
                thread::sleep(Duration::from_millis(30));
                pending.decrement();
            })
        };

        let mut warnings = Vec::new();
        pending.wait_until_zero(Duration::from_millis(5), |n| warnings.push(n));
        worker.join().unwrap();

        assert_eq!(pending.count(), 0);
        assert!(!warnings.is_empty());
        assert!(warnings.iter().all(|n| *n == 1 || *n == 2));
    }
}
