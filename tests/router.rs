mod common;

use std::sync::Arc;

use ragline::index::MemoryIndex;
use ragline::router::EventRouter;
use ragline::store::MemoryObjectStore;
use serde_json::json;

use common::{bucket_coordinator, BrokenFetchStore};

fn storage_record(bucket: &str, key: &str) -> serde_json::Value {
    json!({"s3": {"bucket": {"name": bucket}, "object": {"key": key}}})
}

#[tokio::test]
async fn bare_notification_triggers_one_load_per_record() {
    let store = MemoryObjectStore::new();
    store.insert("bkt", "docs/a.txt", "alpha");
    store.insert("bkt", "docs/b.txt", "beta");
    let index = Arc::new(MemoryIndex::new());
    let router = EventRouter::new(bucket_coordinator(
        index.clone(),
        Arc::new(store),
        "bkt",
        "assets",
    ));

    let envelope = json!({"Records": [
        storage_record("bkt", "docs/a.txt"),
        storage_record("bkt", "docs/b.txt"),
    ]});
    let outcome = router.handle(&envelope).await;

    assert_eq!(outcome.processed, 2);
    assert!(outcome.is_clean());
    assert_eq!(index.unit_count(), 2);
}

#[tokio::test]
async fn queue_wrapped_notification_is_unwrapped_and_processed() {
    let store = MemoryObjectStore::new();
    store.insert("bkt", "docs/a.txt", "alpha");
    let index = Arc::new(MemoryIndex::new());
    let router = EventRouter::new(bucket_coordinator(
        index.clone(),
        Arc::new(store),
        "bkt",
        "assets",
    ));

    let inner = json!({"Records": [storage_record("bkt", "docs/a.txt")]});
    let envelope = json!({"Records": [{"body": inner.to_string()}]});
    let outcome = router.handle(&envelope).await;

    assert_eq!(outcome.processed, 1);
    assert_eq!(index.unit_count(), 1);
}

#[tokio::test]
async fn malformed_record_is_skipped_while_its_sibling_is_processed() {
    let store = MemoryObjectStore::new();
    store.insert("bkt", "docs/good.txt", "good content");
    let index = Arc::new(MemoryIndex::new());
    let router = EventRouter::new(bucket_coordinator(
        index.clone(),
        Arc::new(store),
        "bkt",
        "assets",
    ));

    let envelope = json!({"Records": [
        {"body": "{definitely not json"},
        storage_record("bkt", "docs/good.txt"),
    ]});
    let outcome = router.handle(&envelope).await;

    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.failed, 0);
    assert_eq!(index.unit_count(), 1);
}

#[tokio::test]
async fn redelivered_notification_is_idempotent_at_the_content_level() {
    let store = MemoryObjectStore::new();
    store.insert("bkt", "docs/a.txt", "alpha");
    let index = Arc::new(MemoryIndex::new());
    let router = EventRouter::new(bucket_coordinator(
        index.clone(),
        Arc::new(store),
        "bkt",
        "assets",
    ));

    let envelope = json!({"Records": [storage_record("bkt", "docs/a.txt")]});
    router.handle(&envelope).await;
    let second = router.handle(&envelope).await;

    assert_eq!(second.processed, 1);
    assert_eq!(index.unit_count(), 1);
}

#[tokio::test]
async fn a_failing_load_is_counted_but_does_not_raise() {
    let seeded = MemoryObjectStore::new();
    seeded.insert("bkt", "docs/a.txt", "alpha");
    let index = Arc::new(MemoryIndex::new());
    let router = EventRouter::new(bucket_coordinator(
        index.clone(),
        Arc::new(BrokenFetchStore::new(seeded)),
        "bkt",
        "assets",
    ));

    let envelope = json!({"Records": [storage_record("bkt", "docs/a.txt")]});
    let outcome = router.handle(&envelope).await;

    assert_eq!(outcome.processed, 0);
    assert_eq!(outcome.failed, 1);
    assert_eq!(index.unit_count(), 0);
}
