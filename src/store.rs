//! Object store boundary: paged listing and object retrieval.
//!
//! The real backing store (S3 or compatible) lives outside this crate; the
//! pipeline only ever talks to the [`ObjectStore`] trait. [`MemoryObjectStore`]
//! is an in-memory implementation for tests and local development.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by an object store implementation.
///
/// Every variant is fatal for the load that observed it; partial listings are
/// never ingested.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to list bucket {bucket}: {message}")]
    Listing { bucket: String, message: String },

    #[error("failed to fetch {bucket}/{key}: {message}")]
    Fetch {
        bucket: String,
        key: String,
        message: String,
    },
}

/// One key in an object listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }

    /// Zero-byte keys ending in a path separator are listing artifacts, not
    /// content, and must never be downloaded.
    pub fn is_directory_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// One page of an object listing.
///
/// `next_token`, when present, must be passed back to [`ObjectStore::list_page`]
/// to continue the listing; callers may not assume any particular page size.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub entries: Vec<ObjectEntry>,
    pub next_token: Option<String>,
}

/// Boundary trait over a bucket-addressed object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of keys under `prefix`, continuing from `token` if given.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage, StoreError>;

    /// Fetch the full body of one object.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// In-memory object store for tests and local development.
///
/// Keys are held in sorted order so listings are deterministic. The page size
/// is configurable to exercise pagination in callers.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<BTreeMap<(String, String), Vec<u8>>>>,
    page_size: usize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            page_size: 0,
        }
    }

    /// Force listings to return at most `page_size` entries per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Insert an object body under `bucket`/`key`.
    pub fn insert(&self, bucket: impl Into<String>, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.into(), key.into()), body.into());
    }

    fn keys_under(&self, bucket: &str, prefix: &str) -> Vec<ObjectEntry> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), body)| ObjectEntry::new(k.clone(), body.len() as u64))
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage, StoreError> {
        let all = self.keys_under(bucket, prefix);
        let start = match token {
            Some(t) => t.parse::<usize>().map_err(|_| StoreError::Listing {
                bucket: bucket.to_string(),
                message: format!("bad continuation token: {t}"),
            })?,
            None => 0,
        };
        let page_size = if self.page_size == 0 {
            all.len().max(1)
        } else {
            self.page_size
        };
        let entries: Vec<ObjectEntry> = all.iter().skip(start).take(page_size).cloned().collect();
        let next = start + entries.len();
        let next_token = (next < all.len()).then(|| next.to_string());
        Ok(ObjectPage {
            entries,
            next_token,
        })
    }

    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::Fetch {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "no such key".to_string(),
            })
    }
}
