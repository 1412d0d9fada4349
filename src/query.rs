//! Query surface: generation tunables, reply shapes, and the thin service
//! that forwards questions to the boundary index.
//!
//! Failures are propagated unmodified; retry and backoff, if wanted, belong to
//! the caller or the delivery mechanism.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::index::{IndexError, KnowledgeIndex};

/// Generation and retrieval tunables for one query.
///
/// Every field defaults; callers override only what they need:
///
/// ```
/// use ragline::query::QueryOptions;
///
/// let options = QueryOptions::new()
///     .with_temperature(0.2)
///     .with_citations(true);
/// assert_eq!(options.model, "gpt-3.5-turbo");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub prompt: Option<String>,
    pub system_prompt: Option<String>,
    /// Validate prompt assembly without invoking the model.
    pub dry_run: bool,
    /// Restricts which indexed content is retrieval-eligible.
    pub where_filter: Option<serde_json::Map<String, serde_json::Value>>,
    /// When set, replies carry the supporting passages.
    pub citations: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.5,
            max_tokens: 1000,
            top_p: 1.0,
            prompt: None,
            system_prompt: None,
            dry_run: false,
            where_filter: None,
            citations: false,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_where_filter(
        mut self,
        filter: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.where_filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_citations(mut self, citations: bool) -> Self {
        self.citations = citations;
        self
    }
}

/// One supporting passage attached to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub passage: String,
    pub score: f64,
    pub source_url: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Reply from the index/model boundary.
///
/// The shape is part of the contract: callers must branch on the variant
/// rather than assume a bare answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryReply {
    Answer(String),
    WithCitations {
        answer: String,
        citations: Vec<Citation>,
    },
}

impl QueryReply {
    pub fn answer(&self) -> &str {
        match self {
            Self::Answer(answer) => answer,
            Self::WithCitations { answer, .. } => answer,
        }
    }

    pub fn citations(&self) -> Option<&[Citation]> {
        match self {
            Self::Answer(_) => None,
            Self::WithCitations { citations, .. } => Some(citations),
        }
    }
}

/// Wraps a question and its tunables into a call against the boundary index.
#[derive(Clone)]
pub struct QueryService {
    index: Arc<dyn KnowledgeIndex>,
}

impl QueryService {
    pub fn new(index: Arc<dyn KnowledgeIndex>) -> Self {
        Self { index }
    }

    /// Ask one question. No retries; failures propagate unmodified.
    pub async fn query(
        &self,
        question: &str,
        options: &QueryOptions,
    ) -> Result<QueryReply, IndexError> {
        self.index.query(question, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_tunables() {
        let options = QueryOptions::new();
        assert_eq!(options.model, "gpt-3.5-turbo");
        assert_eq!(options.temperature, 0.5);
        assert_eq!(options.max_tokens, 1000);
        assert_eq!(options.top_p, 1.0);
        assert!(!options.dry_run);
        assert!(!options.citations);
        assert!(options.where_filter.is_none());
    }

    #[test]
    fn reply_branching_exposes_citations_only_when_present() {
        let bare = QueryReply::Answer("42".to_string());
        assert_eq!(bare.answer(), "42");
        assert!(bare.citations().is_none());

        let cited = QueryReply::WithCitations {
            answer: "42".to_string(),
            citations: vec![Citation {
                passage: "the answer".to_string(),
                score: 0.9,
                source_url: "https://example.com/doc".to_string(),
                metadata: serde_json::Value::Null,
            }],
        };
        assert_eq!(cited.citations().unwrap().len(), 1);
    }
}
