//! Boundary retrieval index: the external RAG engine this core orchestrates
//! but does not implement.
//!
//! Production deployments plug their engine in behind [`KnowledgeIndex`].
//! [`MemoryIndex`] is an in-process reference implementation with
//! content-addressed dedup and naive term-overlap retrieval, good enough for
//! tests and local experimentation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::query::{Citation, QueryOptions, QueryReply};
use crate::types::{AssetLocation, ContentUnit, LoadOutcome};

/// Failure at the index/model boundary.
///
/// Propagated unmodified through the query service; the dispatch layer is
/// responsible for converting it into a user-visible message.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("downstream failure: {0}")]
    Downstream(String),
}

/// Summary of one `add` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub doc_id: String,
    /// Units newly written this call.
    pub indexed_units: usize,
    /// Units already present under the same content address.
    pub skipped_existing: usize,
}

/// One registered source of indexed content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub location: String,
    pub doc_id: String,
    pub unit_count: usize,
}

/// Boundary trait over the retrieval-augmented-generation engine.
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// Supply the complete current unit set for `location`. Content-level
    /// dedup is the index's duty; callers may re-send unchanged corpora.
    async fn add(
        &self,
        location: &AssetLocation,
        outcome: LoadOutcome,
    ) -> Result<IndexResponse, IndexError>;

    /// Answer a question against the indexed content.
    async fn query(
        &self,
        question: &str,
        options: &QueryOptions,
    ) -> Result<QueryReply, IndexError>;

    /// Destructively clear all indexed content.
    async fn reset(&self) -> Result<(), IndexError>;

    /// List the sources currently represented in the index.
    async fn data_sources(&self) -> Result<Vec<DataSource>, IndexError>;
}

#[derive(Debug, Clone)]
struct IndexedUnit {
    unit: ContentUnit,
    content_address: String,
}

#[derive(Debug, Default)]
struct MemoryIndexState {
    units: Vec<IndexedUnit>,
    sources: HashMap<String, DataSource>,
}

/// In-process reference index.
///
/// Units are content-addressed by a SHA-256 of their body, so repeat loads of
/// an unchanged corpus are no-ops. Retrieval scores passages by term overlap
/// with the question; the "answer" is the best passage, which is all a
/// model-free reference needs.
#[derive(Clone, Default)]
pub struct MemoryIndex {
    state: Arc<Mutex<MemoryIndexState>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of units currently held.
    pub fn unit_count(&self) -> usize {
        self.state.lock().unwrap().units.len()
    }

    fn content_address(unit: &ContentUnit) -> String {
        let mut hasher = Sha256::new();
        hasher.update(unit.content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn matches_filter(
        unit: &ContentUnit,
        filter: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> bool {
        let Some(filter) = filter else {
            return true;
        };
        filter.iter().all(|(key, expected)| match key.as_str() {
            "source_url" => unit.metadata.source_url == expected.as_str().unwrap_or_default(),
            "origin_bucket" => {
                unit.metadata.origin_bucket.as_deref() == expected.as_str()
            }
            _ => unit.metadata.tags.get(key) == Some(expected),
        })
    }

    fn score(question: &str, passage: &str) -> f64 {
        let question_terms: Vec<String> = question
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if question_terms.is_empty() {
            return 0.0;
        }
        let passage_lower = passage.to_lowercase();
        let hits = question_terms
            .iter()
            .filter(|t| passage_lower.contains(t.as_str()))
            .count();
        hits as f64 / question_terms.len() as f64
    }

    fn assemble_prompt(question: &str, options: &QueryOptions, passages: &[&str]) -> String {
        let mut prompt = String::new();
        if let Some(system) = &options.system_prompt {
            prompt.push_str(system);
            prompt.push('\n');
        }
        match &options.prompt {
            Some(custom) => prompt.push_str(custom),
            None => prompt.push_str("Answer using the provided context."),
        }
        prompt.push('\n');
        for passage in passages {
            prompt.push_str(passage);
            prompt.push('\n');
        }
        prompt.push_str(question);
        prompt
    }
}

#[async_trait]
impl KnowledgeIndex for MemoryIndex {
    async fn add(
        &self,
        location: &AssetLocation,
        outcome: LoadOutcome,
    ) -> Result<IndexResponse, IndexError> {
        let mut state = self.state.lock().unwrap();
        let mut indexed = 0usize;
        let mut skipped = 0usize;
        let unit_count = outcome.unit_count();
        for unit in outcome.units {
            let address = Self::content_address(&unit);
            if state.units.iter().any(|u| u.content_address == address) {
                skipped += 1;
                continue;
            }
            state.units.push(IndexedUnit {
                unit,
                content_address: address,
            });
            indexed += 1;
        }
        state.sources.insert(
            location.to_string(),
            DataSource {
                location: location.to_string(),
                doc_id: outcome.doc_id.clone(),
                unit_count,
            },
        );
        info!(location = %location, indexed, skipped, "index add complete");
        Ok(IndexResponse {
            doc_id: outcome.doc_id,
            indexed_units: indexed,
            skipped_existing: skipped,
        })
    }

    async fn query(
        &self,
        question: &str,
        options: &QueryOptions,
    ) -> Result<QueryReply, IndexError> {
        let state = self.state.lock().unwrap();
        let mut scored: Vec<(&IndexedUnit, f64)> = state
            .units
            .iter()
            .filter(|u| Self::matches_filter(&u.unit, options.where_filter.as_ref()))
            .map(|u| (u, Self::score(question, &u.unit.content)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let passages: Vec<&str> = scored
            .iter()
            .take(3)
            .map(|(u, _)| u.unit.content.as_str())
            .collect();

        let answer = if options.dry_run {
            Self::assemble_prompt(question, options, &passages)
        } else {
            scored
                .first()
                .map(|(u, _)| u.unit.content.clone())
                .unwrap_or_else(|| "No indexed content matched the question.".to_string())
        };

        if options.citations {
            let citations = scored
                .iter()
                .take(3)
                .map(|(u, score)| Citation {
                    passage: u.unit.content.clone(),
                    score: *score,
                    source_url: u.unit.metadata.source_url.clone(),
                    metadata: serde_json::to_value(&u.unit.metadata)
                        .unwrap_or(serde_json::Value::Null),
                })
                .collect();
            Ok(QueryReply::WithCitations { answer, citations })
        } else {
            Ok(QueryReply::Answer(answer))
        }
    }

    async fn reset(&self) -> Result<(), IndexError> {
        let mut state = self.state.lock().unwrap();
        state.units.clear();
        state.sources.clear();
        info!("index reset");
        Ok(())
    }

    async fn data_sources(&self) -> Result<Vec<DataSource>, IndexError> {
        let state = self.state.lock().unwrap();
        let mut sources: Vec<DataSource> = state.sources.values().cloned().collect();
        sources.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(sources)
    }
}
