#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ragline::chat::{ChatError, ChatPlatform};
use ragline::config::{Config, EnvOnlySecrets};
use ragline::coordinator::IngestionCoordinator;
use ragline::index::{DataSource, IndexError, IndexResponse, KnowledgeIndex};
use ragline::loader::BucketLoader;
use ragline::query::{QueryOptions, QueryReply};
use ragline::scan::FsScanner;
use ragline::store::{MemoryObjectStore, ObjectPage, ObjectStore, StoreError};
use ragline::types::{AssetLocation, LoadOutcome};

/// One message captured by [`RecordingPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub text: String,
    pub thread_ts: Option<String>,
}

/// Chat platform fake that records every post and hands back sequential
/// timestamps.
#[derive(Clone, Default)]
pub struct RecordingPlatform {
    messages: Arc<Mutex<Vec<PostedMessage>>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<PostedMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, ChatError> {
        let mut messages = self.messages.lock().unwrap();
        messages.push(PostedMessage {
            channel: channel.to_string(),
            text: text.to_string(),
            thread_ts: thread_ts.map(str::to_string),
        });
        Ok(format!("ts-{}", messages.len()))
    }
}

/// Index fake with a programmable reply and a shared call log, used to assert
/// ordering between acknowledgment and index work.
#[derive(Clone)]
pub struct ScriptedIndex {
    log: Arc<Mutex<Vec<String>>>,
    reply: QueryReply,
    fail_queries: bool,
}

impl ScriptedIndex {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            reply: QueryReply::Answer("scripted answer".to_string()),
            fail_queries: false,
        }
    }

    pub fn with_reply(mut self, reply: QueryReply) -> Self {
        self.reply = reply;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    /// Shared log handle; test ack callbacks push into the same log.
    pub fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.log.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeIndex for ScriptedIndex {
    async fn add(
        &self,
        _location: &AssetLocation,
        outcome: LoadOutcome,
    ) -> Result<IndexResponse, IndexError> {
        self.log.lock().unwrap().push("add".to_string());
        Ok(IndexResponse {
            doc_id: outcome.doc_id.clone(),
            indexed_units: outcome.unit_count(),
            skipped_existing: 0,
        })
    }

    async fn query(
        &self,
        _question: &str,
        _options: &QueryOptions,
    ) -> Result<QueryReply, IndexError> {
        self.log.lock().unwrap().push("query".to_string());
        if self.fail_queries {
            Err(IndexError::Downstream("model unavailable".to_string()))
        } else {
            Ok(self.reply.clone())
        }
    }

    async fn reset(&self) -> Result<(), IndexError> {
        self.log.lock().unwrap().push("reset".to_string());
        Ok(())
    }

    async fn data_sources(&self) -> Result<Vec<DataSource>, IndexError> {
        self.log.lock().unwrap().push("data_sources".to_string());
        Ok(Vec::new())
    }
}

/// Object store whose fetches always fail, for fail-fast assertions.
#[derive(Clone)]
pub struct BrokenFetchStore {
    inner: MemoryObjectStore,
}

impl BrokenFetchStore {
    pub fn new(inner: MemoryObjectStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ObjectStore for BrokenFetchStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage, StoreError> {
        self.inner.list_page(bucket, prefix, token).await
    }

    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::Fetch {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: "injected failure".to_string(),
        })
    }
}

/// Coordinator wired to the given index and store, with a bucket-configured
/// [`Config`] so location resolution prefers the object store.
pub fn bucket_coordinator(
    index: Arc<dyn KnowledgeIndex>,
    store: Arc<dyn ObjectStore>,
    bucket: &str,
    assets_root: &str,
) -> IngestionCoordinator {
    let scanner = Arc::new(FsScanner::new());
    let loader = BucketLoader::new(store, scanner.clone()).with_endpoint("https://ep");
    let config = Config::new(
        Some(bucket.to_string()),
        assets_root,
        Arc::new(EnvOnlySecrets),
    );
    IngestionCoordinator::new(index, loader, scanner, config)
}

/// Coordinator with no bucket configured, resolving to a local root.
pub fn local_coordinator(
    index: Arc<dyn KnowledgeIndex>,
    assets_root: &str,
) -> IngestionCoordinator {
    let scanner = Arc::new(FsScanner::new());
    let store = Arc::new(MemoryObjectStore::new());
    let loader = BucketLoader::new(store, scanner.clone()).with_endpoint("https://ep");
    let config = Config::new(None, assets_root, Arc::new(EnvOnlySecrets));
    IngestionCoordinator::new(index, loader, scanner, config)
}
