//! Unit tests for the in-process rendezvous backend.

use std::sync::Arc;
use std::time::Duration;

use checkpoint_relay::rendezvous::{channel_name, MemoryRendezvous, Rendezvous, CHANNEL_PREFIX};
use checkpoint_relay::AppError;

const SHORT: Duration = Duration::from_millis(50);
const LONG: Duration = Duration::from_secs(5);

#[test]
fn channel_name_is_prefixed() {
    assert_eq!(channel_name("abc"), "agent-conv-abc");
    assert!(channel_name("x").starts_with(CHANNEL_PREFIX));
    assert_ne!(channel_name("a"), channel_name("b"));
}

#[tokio::test]
async fn put_before_get_is_buffered() {
    let rv = MemoryRendezvous::new();
    rv.ensure("t1").await.expect("ensure");
    rv.put("t1", "yes".into()).await.expect("put");
    let got = rv.get("t1", SHORT).await.expect("get");
    assert_eq!(got.as_deref(), Some("yes"));
}

#[tokio::test]
async fn value_is_consumed_once() {
    let rv = MemoryRendezvous::new();
    rv.ensure("t1").await.expect("ensure");
    rv.put("t1", "yes".into()).await.expect("put");
    assert!(rv.get("t1", SHORT).await.expect("get").is_some());
    assert!(rv.get("t1", SHORT).await.expect("get").is_none());
}

#[tokio::test]
async fn last_write_wins() {
    let rv = MemoryRendezvous::new();
    rv.ensure("t1").await.expect("ensure");
    rv.put("t1", "first".into()).await.expect("put");
    rv.put("t1", "second".into()).await.expect("put");
    let got = rv.get("t1", SHORT).await.expect("get");
    assert_eq!(got.as_deref(), Some("second"));
    assert!(rv.get("t1", SHORT).await.expect("get").is_none());
}

#[tokio::test]
async fn get_times_out_with_none() {
    let rv = MemoryRendezvous::new();
    rv.ensure("t1").await.expect("ensure");
    let started = std::time::Instant::now();
    let got = rv.get("t1", SHORT).await.expect("get");
    assert!(got.is_none());
    assert!(started.elapsed() >= SHORT);
}

#[tokio::test]
async fn blocked_get_wakes_on_put() {
    let rv = Arc::new(MemoryRendezvous::new());
    rv.ensure("t1").await.expect("ensure");

    let reader = {
        let rv = Arc::clone(&rv);
        tokio::spawn(async move { rv.get("t1", LONG).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    rv.put("t1", "answer".into()).await.expect("put");

    let got = reader.await.expect("join").expect("get");
    assert_eq!(got.as_deref(), Some("answer"));
}

#[tokio::test]
async fn channels_do_not_cross_talk() {
    let rv = MemoryRendezvous::new();
    rv.ensure("a").await.expect("ensure");
    rv.put("a", "for-a".into()).await.expect("put");
    assert!(rv.get("b", SHORT).await.expect("get").is_none());
    assert_eq!(rv.get("a", SHORT).await.expect("get").as_deref(), Some("for-a"));
}

#[tokio::test]
async fn delete_is_idempotent() {
    let rv = MemoryRendezvous::new();
    rv.ensure("t1").await.expect("ensure");
    assert!(rv.contains("t1").await);

    rv.delete("t1").await;
    rv.delete("t1").await;
    rv.delete("never-created").await;
    assert!(!rv.contains("t1").await);
}

#[tokio::test]
async fn delete_drops_unconsumed_value() {
    let rv = MemoryRendezvous::new();
    rv.ensure("t1").await.expect("ensure");
    rv.put("t1", "stale".into()).await.expect("put");
    rv.delete("t1").await;
    assert!(rv.get("t1", SHORT).await.expect("get").is_none());
}

#[tokio::test]
async fn put_without_channel_is_not_found() {
    let rv = MemoryRendezvous::new();
    let err = rv
        .put("finished", "too late".into())
        .await
        .expect_err("no channel");
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(!rv.contains("finished").await);
}

#[tokio::test]
async fn late_replies_do_not_accumulate_channels() {
    let rv = MemoryRendezvous::new();
    rv.ensure("t1").await.expect("ensure");
    rv.delete("t1").await;

    for attempt in 0..100 {
        assert!(rv.put("t1", format!("retry {attempt}")).await.is_err());
        assert!(rv.put(&format!("gone-{attempt}"), "x".into()).await.is_err());
    }
    assert!(!rv.contains("t1").await);
    assert!(!rv.contains("gone-0").await);
}
