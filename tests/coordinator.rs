mod common;

use std::sync::Arc;

use ragline::index::MemoryIndex;
use ragline::store::MemoryObjectStore;
use ragline::types::AssetLocation;
use tempfile::tempdir;

use common::{bucket_coordinator, local_coordinator};

#[tokio::test]
async fn bucket_config_resolves_to_the_object_store() {
    let store = MemoryObjectStore::new();
    store.insert("my-bucket", "assets/guide.txt", "the guide");
    let index = Arc::new(MemoryIndex::new());
    let coordinator = bucket_coordinator(index.clone(), Arc::new(store), "my-bucket", "assets");

    let response = coordinator.load(None).await.unwrap();
    assert_eq!(response.indexed_units, 1);
    assert_eq!(index.unit_count(), 1);

    let sources = coordinator.data_sources().await.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].location, "my-bucket/assets");
}

#[tokio::test]
async fn missing_bucket_falls_back_to_a_local_recursive_scan() {
    let dir = tempdir().unwrap();
    tokio::fs::create_dir_all(dir.path().join("nested")).await.unwrap();
    tokio::fs::write(dir.path().join("a.txt"), "alpha").await.unwrap();
    tokio::fs::write(dir.path().join("nested/b.txt"), "beta").await.unwrap();

    let index = Arc::new(MemoryIndex::new());
    let coordinator = local_coordinator(index.clone(), &dir.path().to_string_lossy());

    let response = coordinator.load(None).await.unwrap();
    assert_eq!(response.indexed_units, 2);

    // Local units never claim an object-store source URL.
    let sources = coordinator.data_sources().await.unwrap();
    assert_eq!(sources[0].unit_count, 2);
}

#[tokio::test]
async fn repeat_loads_do_not_duplicate_index_entries() {
    let store = MemoryObjectStore::new();
    store.insert("bkt", "assets/a.txt", "alpha");
    let index = Arc::new(MemoryIndex::new());
    let coordinator = bucket_coordinator(index.clone(), Arc::new(store), "bkt", "assets");

    let first = coordinator.load(None).await.unwrap();
    let second = coordinator.load(None).await.unwrap();

    assert_eq!(first.doc_id, second.doc_id);
    assert_eq!(second.indexed_units, 0);
    assert_eq!(second.skipped_existing, 1);
    assert_eq!(index.unit_count(), 1);
}

#[tokio::test]
async fn explicit_location_overrides_the_configured_source() {
    let store = MemoryObjectStore::new();
    store.insert("bkt", "assets/a.txt", "alpha");
    store.insert("bkt", "incoming/new.txt", "fresh");
    let index = Arc::new(MemoryIndex::new());
    let coordinator = bucket_coordinator(index.clone(), Arc::new(store), "bkt", "assets");

    let response = coordinator
        .load(Some(AssetLocation::bucket("bkt", "incoming/new.txt")))
        .await
        .unwrap();
    assert_eq!(response.indexed_units, 1);

    let sources = coordinator.data_sources().await.unwrap();
    assert_eq!(sources[0].location, "bkt/incoming/new.txt");
}

#[tokio::test]
async fn reset_clears_the_index_and_a_later_load_wins() {
    let store = MemoryObjectStore::new();
    store.insert("bkt", "assets/a.txt", "alpha");
    let index = Arc::new(MemoryIndex::new());
    let coordinator = bucket_coordinator(index.clone(), Arc::new(store), "bkt", "assets");

    coordinator.load(None).await.unwrap();
    coordinator.reset().await.unwrap();
    assert_eq!(index.unit_count(), 0);

    // The operation after reset repopulates from scratch; nothing stale
    // resurrects.
    let response = coordinator.load(None).await.unwrap();
    assert_eq!(response.indexed_units, 1);
    assert_eq!(index.unit_count(), 1);
}
