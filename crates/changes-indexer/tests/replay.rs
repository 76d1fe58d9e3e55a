//! End-to-end replay of a change feed into the in-memory index.

use std::sync::Arc;
use std::time::Duration;

use changes_indexer::{
    changes_channel, ChangeContext, ChangeProcessor, IndexConfig, Indexer, Transform,
};
use checkpoint::{CheckpointStore, Sequence};
use index_sink::{MemorySink, RiverRequestFactory};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn processor(config: IndexConfig) -> ChangeProcessor {
    ChangeProcessor::new(
        config.for_database("users"),
        Arc::new(RiverRequestFactory::new("_river", "users")),
    )
}

#[tokio::test(start_paused = true)]
async fn test_replays_feed_and_persists_checkpoint() {
    init_tracing();
    let sink = Arc::new(MemorySink::default());
    let (tx, queue) = changes_channel(64);
    let config = IndexConfig {
        ignore_attachments: true,
        bulk_size: 2,
        ..Default::default()
    };
    let indexer = Indexer::new("users", queue, Arc::clone(&sink), processor(config));
    let handle = indexer.handle();

    let feed = [
        r#"{"seq": 1, "id": "alice", "doc": {"_id": "alice", "_rev": "1-a", "age": 30}}"#,
        r#"{"seq": 2, "id": "bob", "doc": {"_id": "bob", "_rev": "1-b", "_attachments": {"cv.pdf": {}}}}"#,
        r#"{"seq": 3, "id": "_design/app", "doc": {"views": {}}}"#,
        r#"{"seq": 4, "id": "alice", "deleted": true}"#,
        r#"this line is corrupt"#,
        r#"{"seq": [5, "g1AAAA"], "id": "carol", "_index": "vip", "doc": {"_id": "carol"}}"#,
    ];
    for line in feed {
        tx.send(line.to_string()).await.unwrap();
    }
    drop(tx);

    indexer.spawn().await.unwrap();

    assert!(handle.is_closed());
    assert!(sink.get("users", "users", "alice").await.is_none());
    let bob = sink.get("users", "users", "bob").await.unwrap();
    assert_eq!(json!(bob), json!({"_id": "bob"}));
    assert!(sink.get("vip", "users", "carol").await.is_some());
    assert!(sink.get("users", "users", "_design/app").await.is_none());

    let resumed = sink.resume_from("users").await.unwrap().unwrap();
    assert_eq!(resumed, Sequence::from_value(&json!([5, "g1AAAA"])).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_batch_is_replayed_after_restart() {
    init_tracing();
    let sink = Arc::new(MemorySink::default());
    sink.reject_id("bob").await;

    let feed = vec![
        r#"{"seq": 1, "id": "alice", "doc": {"n": 1}}"#.to_string(),
        r#"{"seq": 2, "id": "bob", "doc": {"n": 2}}"#.to_string(),
    ];

    // First run: the only batch is rejected, nothing is persisted.
    let (tx, queue) = changes_channel(64);
    for line in &feed {
        tx.send(line.clone()).await.unwrap();
    }
    drop(tx);
    Indexer::new("users", queue, Arc::clone(&sink), processor(IndexConfig::default()))
        .spawn()
        .await
        .unwrap();

    assert_eq!(sink.read_last_seq("users").await.unwrap(), None);
    assert!(sink.is_empty().await);

    // Restart from the (absent) checkpoint: the whole feed is replayed.
    sink.accept_id("bob").await;
    let (tx, queue) = changes_channel(64);
    for line in &feed {
        tx.send(line.clone()).await.unwrap();
    }
    drop(tx);
    Indexer::new("users", queue, Arc::clone(&sink), processor(IndexConfig::default()))
        .spawn()
        .await
        .unwrap();

    assert!(sink.get("users", "users", "alice").await.is_some());
    assert!(sink.get("users", "users", "bob").await.is_some());
    assert_eq!(
        sink.read_last_seq("users").await.unwrap().as_deref(),
        Some("2")
    );
}

#[tokio::test(start_paused = true)]
async fn test_failing_transform_skips_write_but_advances_checkpoint() {
    init_tracing();
    let sink = Arc::new(MemorySink::default());
    let (tx, queue) = changes_channel(64);
    let transform: Arc<dyn Transform> = Arc::new(|ctx: ChangeContext| {
        if ctx.id().as_deref() == Some("poison") {
            anyhow::bail!("cannot transform poison");
        }
        Ok(ctx)
    });
    let indexer = Indexer::new(
        "users",
        queue,
        Arc::clone(&sink),
        processor(IndexConfig::default()).with_transform(transform),
    );

    tx.send(r#"{"seq": 1, "id": "ok", "doc": {}}"#.to_string())
        .await
        .unwrap();
    tx.send(r#"{"seq": 2, "id": "poison", "doc": {}}"#.to_string())
        .await
        .unwrap();
    drop(tx);

    indexer.spawn().await.unwrap();

    assert!(sink.get("users", "users", "ok").await.is_some());
    assert!(sink.get("users", "users", "poison").await.is_none());
    assert_eq!(
        sink.read_last_seq("users").await.unwrap().as_deref(),
        Some("2")
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_writes_after_close() {
    init_tracing();
    let sink = Arc::new(MemorySink::default());
    let (tx, queue) = changes_channel(64);
    let indexer = Indexer::new("users", queue, Arc::clone(&sink), processor(IndexConfig::default()));
    let handle = indexer.handle();
    let task = indexer.spawn();

    tx.send(r#"{"seq": 1, "id": "a", "doc": {}}"#.to_string())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.close();
    task.await.unwrap();
    let calls = sink.bulk_calls().await;

    let _ = tx.send(r#"{"seq": 2, "id": "b", "doc": {}}"#.to_string()).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(calls, 1);
    assert_eq!(sink.bulk_calls().await, 1);
    assert!(sink.get("users", "users", "b").await.is_none());
}
