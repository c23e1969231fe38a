//! Concurrency Tests
//!
//! Concurrent close, reads racing teardown, concurrent child registration
//! and the async close signal.

use arbor_core::{ArborError, NodeState, ResourceNode, Value};
use arbor_testkit::{init_tracing, workbook_root, FakeProvider, HandleKind};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn release_position(provider: &FakeProvider, node: &ResourceNode) -> usize {
    provider
        .release_log()
        .iter()
        .position(|r| r.handle == node.handle())
        .unwrap()
}

#[test]
fn concurrent_close_releases_each_handle_once() {
    init_tracing();
    for _ in 0..20 {
        let (provider, root) = workbook_root();
        let sheets = root.child("Sheets").unwrap();
        let rows = sheets.child("Rows").unwrap();
        let nodes = [root.clone(), root.clone(), sheets.clone(), rows.clone()];

        let barrier = Arc::new(Barrier::new(nodes.len()));
        let workers: Vec<_> = nodes
            .into_iter()
            .map(|node| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    node.close();
                    assert_eq!(node.state(), NodeState::Closed);
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert!(provider.double_releases().is_empty());
        assert!(provider.live_handles().is_empty());
        assert!(release_position(&provider, &rows) < release_position(&provider, &sheets));
        assert!(release_position(&provider, &sheets) < release_position(&provider, &root));
    }
}

#[test]
fn second_close_waits_for_teardown_in_flight() {
    let (provider, root) = workbook_root();
    let sheets = root.child("Sheets").unwrap();
    sheets.child("Rows").unwrap();
    provider.set_release_delay(Duration::from_millis(100));

    let mut signal = root.closed_signal();
    let first = {
        let root = root.clone();
        thread::spawn(move || root.close())
    };
    while !*signal.borrow_and_update() {
        thread::sleep(Duration::from_millis(1));
    }

    root.close();
    assert!(provider.live_handles().is_empty());
    assert_eq!(root.state(), NodeState::Closed);
    assert_eq!(sheets.state(), NodeState::Closed);

    first.join().unwrap();
    assert!(provider.double_releases().is_empty());
}

#[test]
fn child_close_waits_for_parent_cascade_in_flight() {
    let (provider, root) = workbook_root();
    let sheets = root.child("Sheets").unwrap();
    let rows = sheets.child("Rows").unwrap();
    provider.set_release_delay(Duration::from_millis(50));

    let mut signal = rows.closed_signal();
    let cascade = {
        let root = root.clone();
        thread::spawn(move || root.close())
    };
    while !*signal.borrow_and_update() {
        thread::sleep(Duration::from_millis(1));
    }

    rows.close();
    assert_eq!(rows.state(), NodeState::Closed);
    assert!(!provider.live_handles().contains_key(&rows.handle()));

    cascade.join().unwrap();
    assert!(provider.live_handles().is_empty());
}

#[test]
fn reads_racing_close_either_complete_or_fail_closed() {
    let (provider, root) = workbook_root();
    provider.set_get_delay(Duration::from_millis(2));

    let barrier = Arc::new(Barrier::new(3));
    let readers: Vec<_> = (0..2)
        .map(|_| {
            let root = root.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut completed = 0usize;
                loop {
                    match root.get("Name", &[]) {
                        Ok(value) => {
                            assert_eq!(value, Value::from("Microsoft Excel"));
                            completed += 1;
                        }
                        Err(ArborError::Closed { .. }) => return completed,
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            })
        })
        .collect();

    barrier.wait();
    thread::sleep(Duration::from_millis(20));
    root.close();
    let calls_at_close = provider.calls().len();

    let completed: usize = readers.into_iter().map(|r| r.join().unwrap()).sum();

    // Every provider call that started finished before the close was
    // granted; none started afterwards.
    assert_eq!(provider.calls().len(), calls_at_close);
    assert_eq!(completed, calls_at_close);
    assert!(root.get("Name", &[]).unwrap_err().is_closed());
}

#[test]
fn concurrent_acquire_registers_every_child() {
    let (provider, root) = workbook_root();
    let threads = 8;
    let per_thread = 10;

    let barrier = Arc::new(Barrier::new(threads));
    let workers: Vec<_> = (0..threads)
        .map(|_| {
            let root = root.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    root.child("Sheets").unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(root.child_count(), threads * per_thread);
    assert_eq!(root.pending_children(), threads * per_thread);

    root.close();
    assert_eq!(provider.released_objects().len(), threads * per_thread + 1);
    assert!(provider.live_handles().is_empty());
}

#[test]
fn acquire_racing_close_never_leaks() {
    for _ in 0..20 {
        let (provider, root) = workbook_root();
        let barrier = Arc::new(Barrier::new(2));

        let acquirer = {
            let root = root.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut acquired = Vec::new();
                loop {
                    match root.child("Sheets") {
                        Ok(child) => acquired.push(child),
                        Err(err) => {
                            assert!(err.is_closed());
                            return acquired;
                        }
                    }
                }
            })
        };

        barrier.wait();
        thread::sleep(Duration::from_millis(1));
        root.close();
        let acquired = acquirer.join().unwrap();

        assert!(acquired.iter().all(ResourceNode::is_closed));
        assert!(provider.live_handles().is_empty());
        assert!(provider.double_releases().is_empty());
    }
}

#[test]
fn independent_child_close_racing_parent_close() {
    for _ in 0..20 {
        let (provider, root) = workbook_root();
        let sheets = root.child("Sheets").unwrap();
        let rows = sheets.child("Rows").unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let child_closer = {
            let sheets = sheets.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                sheets.close();
            })
        };

        barrier.wait();
        root.close();
        child_closer.join().unwrap();

        assert!(provider.double_releases().is_empty());
        assert!(provider.live_handles().is_empty());
        assert_eq!(root.child_count(), 0);
        assert_eq!(root.pending_children(), 0);
        assert!(release_position(&provider, &rows) < release_position(&provider, &sheets));
        assert!(release_position(&provider, &sheets) < release_position(&provider, &root));
    }
}

#[test]
fn parent_close_waits_for_child_close_in_flight() {
    let (provider, root) = workbook_root();
    let sheets = root.child("Sheets").unwrap();
    provider.set_release_delay(Duration::from_millis(50));

    let mut signal = sheets.closed_signal();
    let child_closer = {
        let sheets = sheets.clone();
        thread::spawn(move || sheets.close())
    };

    // Wait until the child's teardown has begun, then close the parent.
    while !*signal.borrow_and_update() {
        thread::sleep(Duration::from_millis(1));
    }
    root.close();

    let log = provider.release_log();
    let sheets_at = release_position(&provider, &sheets);
    let root_at = release_position(&provider, &root);
    assert!(sheets_at < root_at);
    assert_eq!(log.last().unwrap().kind, HandleKind::Application);

    child_closer.join().unwrap();
    assert!(provider.live_handles().is_empty());
}

#[tokio::test]
async fn wait_closed_resolves_when_another_thread_closes() {
    let (_provider, root) = workbook_root();
    let sheets = root.child("Sheets").unwrap();

    let closer = {
        let root = root.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            root.close();
        })
    };

    tokio::time::timeout(Duration::from_secs(5), sheets.wait_closed())
        .await
        .expect("close signal observed");
    assert!(sheets.is_closed());

    closer.join().unwrap();
}

#[tokio::test]
async fn wait_closed_returns_immediately_for_closed_node() {
    let (_provider, root) = workbook_root();
    root.close();

    tokio::time::timeout(Duration::from_millis(100), root.wait_closed())
        .await
        .expect("already closed");
}
