//! Bucket loader: stages an object-store prefix into scratch storage and
//! extracts content units with a content-addressed corpus fingerprint.
//!
//! The loader owns a fresh [`tempfile::TempDir`] per invocation; the directory
//! and everything staged under it are removed on every exit path, including
//! failure. Any listing or staging error aborts the whole load; partial
//! ingestion is never surfaced.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::scan::{DocumentScanner, ScanError};
use crate::store::{ObjectStore, StoreError};
use crate::types::{AssetLocation, ContentUnit, LoadOutcome, UnitMetadata};

/// Default endpoint used to build `source_url`s for staged objects.
pub const DEFAULT_ENDPOINT_URL: &str = "https://s3.us-east-1.amazonaws.com";

/// Errors raised during a bucket load. All variants are fatal for that load.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Listing or fetching from the object store failed.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] StoreError),

    /// Writing a staged object to scratch storage failed.
    #[error("failed to stage {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content extraction over the staged tree failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Loads a bucket prefix into the retrieval pipeline.
#[derive(Clone)]
pub struct BucketLoader {
    store: Arc<dyn ObjectStore>,
    scanner: Arc<dyn DocumentScanner>,
    endpoint_url: String,
}

impl BucketLoader {
    pub fn new(store: Arc<dyn ObjectStore>, scanner: Arc<dyn DocumentScanner>) -> Self {
        Self {
            store,
            scanner,
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
        }
    }

    /// Override the endpoint used when rendering `source_url`s.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    /// Stage every non-directory object under `bucket`/`prefix`, extract
    /// content units, and fingerprint the corpus.
    ///
    /// The listing is exhausted page by page before any fingerprinting
    /// happens; directory markers are skipped without a download. Each staged
    /// path is recorded in an explicit key map so extracted units can be
    /// re-associated with their object key afterwards; a unit whose path is
    /// not in the map gets an empty `source_url`.
    pub async fn load(&self, bucket: &str, prefix: &str) -> Result<LoadOutcome, LoaderError> {
        let location = AssetLocation::bucket(bucket, prefix).to_string();
        info!(%bucket, %prefix, "loading objects from store");

        let scratch = tempfile::tempdir().map_err(|source| LoaderError::Staging {
            path: PathBuf::from("<scratch>"),
            source,
        })?;

        let mut staged_to_key: HashMap<PathBuf, String> = HashMap::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .store
                .list_page(bucket, prefix, token.as_deref())
                .await?;
            for entry in &page.entries {
                if entry.is_directory_marker() {
                    debug!(key = %entry.key, "skipping directory marker");
                    continue;
                }
                let local_path = scratch.path().join(&entry.key);
                if let Some(parent) = local_path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|source| LoaderError::Staging {
                            path: parent.to_path_buf(),
                            source,
                        })?;
                }
                let body = self.store.fetch(bucket, &entry.key).await?;
                tokio::fs::write(&local_path, &body)
                    .await
                    .map_err(|source| LoaderError::Staging {
                        path: local_path.clone(),
                        source,
                    })?;
                staged_to_key.insert(local_path, entry.key.clone());
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        let documents = self.scanner.scan(scratch.path()).await?;

        let mut units = Vec::with_capacity(documents.len());
        for doc in documents {
            let metadata = match staged_to_key.get(&doc.path) {
                Some(key) => {
                    let url = format!("{}/{bucket}/{key}", self.endpoint_url);
                    UnitMetadata::remote(url, bucket)
                }
                None => UnitMetadata {
                    origin_bucket: Some(bucket.to_string()),
                    ..UnitMetadata::default()
                },
            };
            units.push(ContentUnit::new(doc.content, metadata));
        }

        let bodies: Vec<&str> = units.iter().map(|u| u.content.as_str()).collect();
        let doc_id = fingerprint(&bodies, &location);
        info!(%doc_id, units = units.len(), "load complete");

        Ok(LoadOutcome { doc_id, units })
    }
}

/// Deterministic corpus fingerprint: SHA-256 over the JSON array of content
/// bodies in unit order, concatenated with the location string.
///
/// The framing is load-bearing; downstream consumers key off `doc_id` for
/// content-level dedup, so it must not change between releases.
pub fn fingerprint(bodies: &[&str], location: &str) -> String {
    let framed = serde_json::to_string(bodies).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(framed.as_bytes());
    hasher.update(location.as_bytes());
    format!("{:x}", hasher.finalize())
}
