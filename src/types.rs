//! Core data model shared across the ingestion and dispatch pipelines.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One normalized piece of ingested text plus its provenance metadata.
///
/// Produced by the loader, immutable once created, consumed by the
/// ingestion coordinator and ultimately the retrieval index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub content: String,
    pub metadata: UnitMetadata,
}

impl ContentUnit {
    pub fn new(content: impl Into<String>, metadata: UnitMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// Provenance attached to a [`ContentUnit`].
///
/// `source_url` is non-empty only when the unit was resolved against a real
/// staged object key; locally scanned documents carry an empty URL and record
/// their path in `tags` instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitMetadata {
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_bucket: Option<String>,
    #[serde(default)]
    pub tags: serde_json::Map<String, serde_json::Value>,
}

impl UnitMetadata {
    /// Metadata for a unit staged from an object store.
    pub fn remote(source_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            origin_bucket: Some(bucket.into()),
            tags: serde_json::Map::new(),
        }
    }

    /// Metadata for a unit scanned from the local filesystem.
    pub fn local(path: &std::path::Path) -> Self {
        let mut tags = serde_json::Map::new();
        tags.insert(
            "path".to_string(),
            serde_json::Value::String(path.display().to_string()),
        );
        Self {
            source_url: String::new(),
            origin_bucket: None,
            tags,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.tags.insert(key.into(), value);
        self
    }
}

/// Concrete source of documents for one load invocation.
///
/// Resolved once per invocation and immutable thereafter. The `Display`
/// rendering doubles as the location string fed into the corpus fingerprint,
/// so its format is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    Bucket { bucket: String, prefix: String },
    Local { root: PathBuf },
}

impl AssetLocation {
    pub fn bucket(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::Bucket {
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::Local { root: root.into() }
    }
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bucket { bucket, prefix } if prefix.is_empty() => write!(f, "{bucket}"),
            Self::Bucket { bucket, prefix } => write!(f, "{bucket}/{prefix}"),
            Self::Local { root } => write!(f, "{}", root.display()),
        }
    }
}

/// Result of one complete load: the corpus fingerprint plus every unit
/// extracted from the location, in extraction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub doc_id: String,
    pub units: Vec<ContentUnit>,
}

impl LoadOutcome {
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
