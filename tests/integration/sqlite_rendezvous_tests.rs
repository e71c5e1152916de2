//! `SQLite` rendezvous backend and retention purge.

use std::sync::Arc;
use std::time::Duration;

use checkpoint_relay::persistence::db;
use checkpoint_relay::persistence::retention::purge;
use checkpoint_relay::rendezvous::{channel_name, Rendezvous, SqliteRendezvous};
use checkpoint_relay::AppError;

const POLL: Duration = Duration::from_millis(10);
const SHORT: Duration = Duration::from_millis(60);

async fn memory_backend() -> SqliteRendezvous {
    let pool = db::connect_memory().await.expect("db");
    SqliteRendezvous::new(Arc::new(pool), POLL)
}

#[tokio::test]
async fn put_then_get_consumes_once() {
    let rv = memory_backend().await;
    rv.ensure("t1").await.expect("ensure");
    rv.put("t1", "yes".into()).await.expect("put");

    assert_eq!(rv.get("t1", SHORT).await.expect("get").as_deref(), Some("yes"));
    assert!(rv.get("t1", SHORT).await.expect("get").is_none());
}

#[tokio::test]
async fn last_write_wins() {
    let rv = memory_backend().await;
    rv.ensure("t1").await.expect("ensure");
    rv.put("t1", "first".into()).await.expect("put");
    rv.put("t1", "second".into()).await.expect("put");

    assert_eq!(rv.get("t1", SHORT).await.expect("get").as_deref(), Some("second"));
    assert!(rv.get("t1", SHORT).await.expect("get").is_none());
}

#[tokio::test]
async fn get_times_out_with_none() {
    let rv = memory_backend().await;
    rv.ensure("t1").await.expect("ensure");
    assert!(rv.get("t1", SHORT).await.expect("get").is_none());
}

#[tokio::test]
async fn polling_reader_sees_later_put() {
    let rv = Arc::new(memory_backend().await);
    rv.ensure("t1").await.expect("ensure");
    let reader = {
        let rv = Arc::clone(&rv);
        tokio::spawn(async move { rv.get("t1", Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    rv.put("t1", "answer".into()).await.expect("put");

    let got = reader.await.expect("join").expect("get");
    assert_eq!(got.as_deref(), Some("answer"));
}

#[tokio::test]
async fn no_cross_talk_between_channels() {
    let rv = memory_backend().await;
    rv.ensure("a").await.expect("ensure");
    rv.put("a", "for-a".into()).await.expect("put");
    assert!(rv.get("b", SHORT).await.expect("get").is_none());
    assert_eq!(rv.get("a", SHORT).await.expect("get").as_deref(), Some("for-a"));
}

#[tokio::test]
async fn ensure_and_delete_are_idempotent() {
    let rv = memory_backend().await;
    rv.ensure("t1").await.expect("ensure");
    rv.ensure("t1").await.expect("ensure again");
    assert!(rv.contains("t1").await.expect("contains"));

    rv.put("t1", "pending".into()).await.expect("put");
    rv.delete("t1").await;
    rv.delete("t1").await;
    assert!(!rv.contains("t1").await.expect("contains"));
    assert!(rv.get("t1", SHORT).await.expect("get").is_none());
}

#[tokio::test]
async fn put_after_delete_is_not_found_and_leaves_nothing() {
    let pool = Arc::new(db::connect_memory().await.expect("db"));
    let rv = SqliteRendezvous::new(Arc::clone(&pool), POLL);
    rv.ensure("t1").await.expect("ensure");
    rv.delete("t1").await;

    let err = rv.put("t1", "late".into()).await.expect_err("channel gone");
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(!rv.contains("t1").await.expect("contains"));

    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rendezvous_message")
        .fetch_one(pool.as_ref())
        .await
        .expect("count");
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn answers_survive_across_backend_instances() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("rendezvous.db");

    let producer = SqliteRendezvous::new(Arc::new(db::connect(&path).await.expect("db")), POLL);
    producer.ensure("t1").await.expect("ensure");
    producer.put("t1", "durable".into()).await.expect("put");

    let consumer = SqliteRendezvous::new(Arc::new(db::connect(&path).await.expect("db")), POLL);
    assert_eq!(
        consumer.get("t1", SHORT).await.expect("get").as_deref(),
        Some("durable")
    );
}

#[tokio::test]
async fn retention_purges_only_old_channels() {
    let pool = Arc::new(db::connect_memory().await.expect("db"));
    let rv = SqliteRendezvous::new(Arc::clone(&pool), POLL);

    rv.ensure("fresh").await.expect("ensure");
    rv.put("fresh", "keep".into()).await.expect("put");
    let old = (chrono::Utc::now() - chrono::Duration::hours(48)).to_rfc3339();
    sqlx::query("INSERT INTO rendezvous_channel (name, created_at) VALUES (?1, ?2)")
        .bind(channel_name("stale"))
        .bind(&old)
        .execute(pool.as_ref())
        .await
        .expect("insert channel");
    sqlx::query("INSERT INTO rendezvous_message (channel, value, created_at) VALUES (?1, ?2, ?3)")
        .bind(channel_name("stale"))
        .bind("abandoned")
        .bind(&old)
        .execute(pool.as_ref())
        .await
        .expect("insert message");

    let purged = purge(&pool, 24).await.expect("purge");

    assert_eq!(purged, 1);
    assert!(!rv.contains("stale").await.expect("contains"));
    assert!(rv.get("stale", SHORT).await.expect("get").is_none());
    assert_eq!(rv.get("fresh", SHORT).await.expect("get").as_deref(), Some("keep"));
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent() {
    let pool = db::connect_memory().await.expect("db");
    checkpoint_relay::persistence::schema::bootstrap_schema(&pool)
        .await
        .expect("second bootstrap");
}
