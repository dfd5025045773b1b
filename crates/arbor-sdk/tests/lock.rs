//! Integration tests for the mutation lock.
//!
//! These tests verify:
//! - Grants resolve strictly in arrival order
//! - A wait timeout fails only the request that timed out
//! - The safety timeout reclaims an abandoned grant and advances the queue
//! - Editor batches from concurrent tasks never interleave

use arbor_core::Node;
use arbor_sdk::{Editor, EditorConfig, LockConfigBuilder, MutationLock, SdkError};
use arbor_store::{NodeStore, StoreConfigBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::task;
use tokio_test::{assert_pending, assert_ready_ok};

#[tokio::test]
async fn test_grants_follow_arrival_order() {
    let lock = MutationLock::default();
    let x = lock.acquire("x").await.unwrap();

    let mut y = task::spawn(lock.acquire("y"));
    let mut z = task::spawn(lock.acquire("z"));
    assert_pending!(y.poll());
    assert_pending!(z.poll());
    let queued: Vec<String> = lock.queue().into_iter().map(|r| r.owner_id).collect();
    assert_eq!(queued, vec!["y", "z"]);

    lock.release(&x.lock_id).unwrap();
    assert!(y.is_woken());
    let y_holder = assert_ready_ok!(y.poll());
    assert_eq!(y_holder.owner_id, "y");
    assert_pending!(z.poll());
    assert_eq!(lock.holder().unwrap().owner_id, "y");

    lock.release(&y_holder.lock_id).unwrap();
    let z_holder = assert_ready_ok!(z.poll());
    assert_eq!(z_holder.owner_id, "z");
    lock.release(&z_holder.lock_id).unwrap();

    let stats = lock.stats();
    assert_eq!(stats.acquisitions, 3);
    assert_eq!(stats.releases, 3);
    assert_eq!(stats.timeouts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_timeout_fails_only_that_request() {
    let lock = MutationLock::new(
        LockConfigBuilder::new()
            .wait_timeout(Duration::from_secs(1))
            .build(),
    );
    let x = lock.acquire("x").await.unwrap();

    let short = lock.acquire_with_timeout("short", Duration::from_millis(100));
    let long = lock.acquire_with_timeout("long", Duration::from_secs(5));
    let releaser = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        lock.release(&x.lock_id).unwrap();
    };
    let (short, long, ()) = tokio::join!(short, long, releaser);

    match short {
        Err(SdkError::LockTimeout { owner, waited_ms }) => {
            assert_eq!(owner, "short");
            assert!(waited_ms >= 100);
        }
        other => panic!("expected a timeout, got {:?}", other),
    }
    let long = long.unwrap();
    assert_eq!(long.owner_id, "long");
    assert_eq!(lock.stats().timeouts, 1);
    assert!(lock.queue().is_empty());
    lock.release(&long.lock_id).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_safety_timeout_reclaims_abandoned_lock() {
    let lock = MutationLock::new(
        LockConfigBuilder::new()
            .wait_timeout(Duration::from_secs(10))
            .safety_timeout(Duration::from_secs(1))
            .build(),
    );
    let abandoned = lock.acquire("x").await.unwrap();

    let next = lock.acquire("y").await.unwrap();
    assert_eq!(next.owner_id, "y");
    assert!(next.acquired_at.duration_since(abandoned.acquired_at) >= Duration::from_secs(1));

    let stats = lock.stats();
    assert_eq!(stats.forced_releases, 1);
    assert!(stats.mean_wait >= Duration::from_millis(500));
    assert!(stats.mean_wait < Duration::from_millis(600));

    assert_eq!(
        lock.release(&abandoned.lock_id),
        Err(SdkError::LockMismatch {
            expected: next.lock_id.clone(),
            presented: abandoned.lock_id.clone(),
        })
    );
    lock.release(&next.lock_id).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches_do_not_interleave() {
    let mut store = NodeStore::with_config(StoreConfigBuilder::new().session_id("mt").build());
    let doc = store.create_node(Node::new("doc")).unwrap();
    let editor = Arc::new(Editor::with_config(store, EditorConfig::default()));

    let mut handles = Vec::new();
    for writer in 0..8 {
        let editor = editor.clone();
        let doc = doc.clone();
        handles.push(tokio::spawn(async move {
            editor
                .batch(&format!("w{}", writer), move |store| {
                    let id = store.add_child(doc.as_str(), Node::text_node("p", ""), None)?;
                    for step in 0..5 {
                        store.insert_text(id.as_str(), step, &writer.to_string());
                    }
                    Ok(id)
                })
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let (id, ops) = handle.await.unwrap().unwrap();
        assert_eq!(ops.len(), 7);
        ids.push(id);
    }

    editor.read(|store| {
        let children = store.get_node(doc.as_str()).unwrap().content;
        assert_eq!(children.len(), 8);
        for id in &ids {
            let text = store.get_node(id.as_str()).unwrap().text_str().to_string();
            assert_eq!(text.len(), 5);
            assert!(text.chars().all(|c| c == text.chars().next().unwrap()));
        }
    });
    assert_eq!(editor.lock().stats().acquisitions, 8);
}
