//! Ingestion coordinator: drives the loader and supplies content to the
//! boundary index.
//!
//! `load` is idempotent at the content level: the coordinator's sole duty is
//! to hand the index the complete current unit set each call; dedup belongs to
//! the index's content addressing. `reset` destructively clears the index with
//! no merge semantics: whichever of a racing load/reset lands later wins.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::index::{DataSource, IndexError, IndexResponse, KnowledgeIndex};
use crate::loader::{fingerprint, BucketLoader, LoaderError};
use crate::scan::{DocumentScanner, ScanError};
use crate::types::{AssetLocation, ContentUnit, LoadOutcome, UnitMetadata};

/// Errors surfaced by coordinator operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Orchestrates loads and resets against the boundary index.
#[derive(Clone)]
pub struct IngestionCoordinator {
    index: Arc<dyn KnowledgeIndex>,
    loader: BucketLoader,
    scanner: Arc<dyn DocumentScanner>,
    config: Config,
}

impl IngestionCoordinator {
    pub fn new(
        index: Arc<dyn KnowledgeIndex>,
        loader: BucketLoader,
        scanner: Arc<dyn DocumentScanner>,
        config: Config,
    ) -> Self {
        Self {
            index,
            loader,
            scanner,
            config,
        }
    }

    /// Load documents from `location`, or from the configured primary source
    /// when none is given, and supply the result to the index.
    pub async fn load(
        &self,
        location: Option<AssetLocation>,
    ) -> Result<IndexResponse, CoordinatorError> {
        let location = location.unwrap_or_else(|| self.config.primary_asset_location());
        info!(location = %location, "loading data");

        let outcome = match &location {
            AssetLocation::Bucket { bucket, prefix } => self.loader.load(bucket, prefix).await?,
            AssetLocation::Local { root } => self.load_local(&location, root).await?,
        };

        Ok(self.index.add(&location, outcome).await?)
    }

    /// Destructively clear the index.
    pub async fn reset(&self) -> Result<(), CoordinatorError> {
        info!("resetting data");
        Ok(self.index.reset().await?)
    }

    /// List the sources currently represented in the index.
    pub async fn data_sources(&self) -> Result<Vec<DataSource>, CoordinatorError> {
        Ok(self.index.data_sources().await?)
    }

    async fn load_local(
        &self,
        location: &AssetLocation,
        root: &std::path::Path,
    ) -> Result<LoadOutcome, CoordinatorError> {
        let documents = self.scanner.scan(root).await?;
        let units: Vec<ContentUnit> = documents
            .into_iter()
            .map(|doc| {
                let metadata = UnitMetadata::local(&doc.path);
                ContentUnit::new(doc.content, metadata)
            })
            .collect();
        let bodies: Vec<&str> = units.iter().map(|u| u.content.as_str()).collect();
        let doc_id = fingerprint(&bodies, &location.to_string());
        Ok(LoadOutcome { doc_id, units })
    }
}
