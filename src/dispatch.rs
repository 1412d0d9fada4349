//! Two-phase dispatch protocol for chat triggers.
//!
//! The chat platform enforces a hard acknowledgment deadline, so each trigger
//! is split across two scheduling domains joined by a channel: the synchronous
//! fast path fires the acknowledgment callback with a provisional status
//! before any model or index work, then hands the trigger to a deferred worker
//! with no deadline. The worker queries, formats, and posts through the
//! platform's asynchronous mechanism (never the original response channel)
//! and converts every failure into a user-visible message so a broken request
//! is never silently dropped.
//!
//! State machine per trigger: `Received -> Acknowledged -> {Completed | Failed}`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chat::{ChatError, ChatPlatform, Command, Trigger};
use crate::coordinator::{CoordinatorError, IngestionCoordinator};
use crate::index::IndexError;
use crate::query::{Citation, QueryOptions, QueryReply, QueryService};

/// Fixed platform acknowledgment deadline.
pub const ACK_DEADLINE: Duration = Duration::from_secs(3);

/// Provisional status sent with the acknowledgment.
pub const ACK_STATUS: &str = "Thinking...";

/// Passages longer than this are truncated in citation blocks.
pub const PASSAGE_LIMIT: usize = 300;

/// Lifecycle of one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Received,
    Acknowledged,
    Completed,
    Failed,
}

/// One trigger in flight: identity, deadline, and payload. Lives for a single
/// interaction; ack and result delivery are causally ordered but separately
/// scheduled.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub trigger_id: String,
    pub received_at: DateTime<Utc>,
    pub ack_deadline: Duration,
    pub trigger: Trigger,
}

impl DispatchRequest {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger_id: Uuid::new_v4().to_string(),
            received_at: Utc::now(),
            ack_deadline: ACK_DEADLINE,
            trigger,
        }
    }
}

/// Receipt returned from the fast path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub trigger_id: String,
    pub state: DispatchState,
}

/// Errors raised on the fast path. The deferred path never raises; it posts.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("deferred worker is no longer running")]
    WorkerUnavailable,
}

#[derive(Debug, Error)]
enum ProcessError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

/// Front end for the two-phase protocol: acknowledge now, process later.
pub struct Dispatcher {
    tx: flume::Sender<DispatchRequest>,
    worker: JoinHandle<()>,
}

impl Dispatcher {
    /// Spawn the deferred worker and return the dispatch handle.
    ///
    /// `options` is the query template applied to every `ask`; set
    /// `citations` on it to get threaded source listings.
    pub fn spawn(
        platform: Arc<dyn ChatPlatform>,
        coordinator: IngestionCoordinator,
        query: QueryService,
        options: QueryOptions,
    ) -> Self {
        let (tx, rx) = flume::unbounded::<DispatchRequest>();
        let worker_state = Worker {
            platform,
            coordinator,
            query,
            options,
        };
        let worker = tokio::spawn(async move {
            while let Ok(request) = rx.recv_async().await {
                worker_state.process(request).await;
            }
        });
        Self { tx, worker }
    }

    /// Fast path: fire the acknowledgment callback with a provisional status,
    /// then enqueue the trigger for deferred processing.
    ///
    /// The callback is invoked before any path that can reach the model or
    /// index, for every trigger, including ones that ultimately fail.
    pub fn dispatch<F>(&self, trigger: Trigger, ack: F) -> Result<DispatchReceipt, DispatchError>
    where
        F: FnOnce(&str),
    {
        let request = DispatchRequest::new(trigger);
        let trigger_id = request.trigger_id.clone();
        info!(%trigger_id, state = ?DispatchState::Received, "trigger received");

        ack(ACK_STATUS);
        info!(%trigger_id, state = ?DispatchState::Acknowledged, "trigger acknowledged");

        self.tx
            .send(request)
            .map_err(|_| DispatchError::WorkerUnavailable)?;
        Ok(DispatchReceipt {
            trigger_id,
            state: DispatchState::Acknowledged,
        })
    }

    /// Drop the intake side and wait for the worker to drain its queue.
    pub async fn join(self) {
        drop(self.tx);
        if let Err(err) = self.worker.await {
            error!(%err, "dispatch worker panicked");
        }
    }
}

struct Worker {
    platform: Arc<dyn ChatPlatform>,
    coordinator: IngestionCoordinator,
    query: QueryService,
    options: QueryOptions,
}

impl Worker {
    /// Deferred phase. Every failure is converted to a user-visible message
    /// here; nothing propagates past this boundary.
    async fn process(&self, request: DispatchRequest) {
        let trigger_id = request.trigger_id.clone();
        match self.run_command(&request).await {
            Ok(()) => {
                info!(%trigger_id, state = ?DispatchState::Completed, "trigger completed");
            }
            Err(err) => {
                warn!(%trigger_id, state = ?DispatchState::Failed, %err, "trigger failed");
                let text = format!(
                    "Sorry <@{}>, I couldn't finish that request: {err}",
                    request.trigger.user
                );
                if let Err(post_err) = self
                    .platform
                    .post_message(&request.trigger.channel, &text, None)
                    .await
                {
                    error!(%trigger_id, %post_err, "failed to deliver failure message");
                }
            }
        }
    }

    async fn run_command(&self, request: &DispatchRequest) -> Result<(), ProcessError> {
        let channel = &request.trigger.channel;
        match Command::parse(&request.trigger.text) {
            Command::Ask { question } => self.answer(channel, &question).await,
            Command::Load => {
                let response = self.coordinator.load(None).await?;
                let text = format!(
                    "Load complete: {} new units indexed, {} already present (doc `{}`).",
                    response.indexed_units, response.skipped_existing, response.doc_id
                );
                self.platform.post_message(channel, &text, None).await?;
                Ok(())
            }
            Command::Reset => {
                self.coordinator.reset().await?;
                self.platform
                    .post_message(channel, "Index cleared.", None)
                    .await?;
                Ok(())
            }
            Command::DataSources => {
                let sources = self.coordinator.data_sources().await?;
                let text = if sources.is_empty() {
                    "No data sources indexed yet.".to_string()
                } else {
                    let mut lines = vec!["Indexed sources:".to_string()];
                    for source in sources {
                        lines.push(format!(
                            "• {} ({} units, doc `{}`)",
                            source.location, source.unit_count, source.doc_id
                        ));
                    }
                    lines.join("\n")
                };
                self.platform.post_message(channel, &text, None).await?;
                Ok(())
            }
            Command::KnockKnock => {
                self.platform
                    .post_message(channel, "_Who's there?_", None)
                    .await?;
                Ok(())
            }
            Command::Unknown { .. } => {
                self.platform
                    .post_message(channel, Command::help_text(), None)
                    .await?;
                Ok(())
            }
        }
    }

    async fn answer(&self, channel: &str, question: &str) -> Result<(), ProcessError> {
        let reply = self.query.query(question, &self.options).await?;
        let summary = format_summary(question, reply.answer());
        let summary_ts = self.platform.post_message(channel, &summary, None).await?;

        if let QueryReply::WithCitations { citations, .. } = &reply {
            if !citations.is_empty() {
                let block = format_citations(citations);
                self.platform
                    .post_message(channel, &block, Some(&summary_ts))
                    .await?;
            }
        }
        Ok(())
    }
}

/// Standalone summary message posted for every answered question.
pub fn format_summary(question: &str, answer: &str) -> String {
    format!("Q: _{question}_ A: {answer}")
}

/// Threaded citation block: one line per citation with score, source link,
/// and a truncated passage.
pub fn format_citations(citations: &[Citation]) -> String {
    let mut lines = vec!["Sources:".to_string()];
    for (idx, citation) in citations.iter().enumerate() {
        let link = if citation.source_url.is_empty() {
            "(no source)".to_string()
        } else {
            format!("<{}>", citation.source_url)
        };
        lines.push(format!(
            "{}. {link} (score {:.2}): {}",
            idx + 1,
            citation.score,
            truncate_passage(&citation.passage, PASSAGE_LIMIT)
        ));
    }
    lines.join("\n")
}

/// Truncate `passage` beyond `limit` characters, appending an ellipsis.
/// Counts characters, not bytes, so multibyte text never splits mid-scalar.
pub fn truncate_passage(passage: &str, limit: usize) -> String {
    if passage.chars().count() <= limit {
        passage.to_string()
    } else {
        let mut truncated: String = passage.chars().take(limit).collect();
        truncated.push_str("...");
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_passage_truncates_to_limit_plus_ellipsis() {
        let passage = "x".repeat(500);
        let truncated = truncate_passage(&passage, PASSAGE_LIMIT);
        assert_eq!(truncated.chars().count(), PASSAGE_LIMIT + 3);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn short_passage_is_unmodified() {
        let passage = "y".repeat(50);
        assert_eq!(truncate_passage(&passage, PASSAGE_LIMIT), passage);
    }

    #[test]
    fn passage_at_the_limit_is_unmodified() {
        let passage = "z".repeat(PASSAGE_LIMIT);
        assert_eq!(truncate_passage(&passage, PASSAGE_LIMIT), passage);
    }

    #[test]
    fn citation_block_carries_score_and_link() {
        let citations = vec![Citation {
            passage: "relevant passage".to_string(),
            score: 0.8731,
            source_url: "https://ep/bkt/docs/a.txt".to_string(),
            metadata: serde_json::Value::Null,
        }];
        let block = format_citations(&citations);
        assert!(block.starts_with("Sources:"));
        assert!(block.contains("<https://ep/bkt/docs/a.txt>"));
        assert!(block.contains("score 0.87"));
        assert!(block.contains("relevant passage"));
    }

    #[test]
    fn summary_format_quotes_the_question() {
        assert_eq!(
            format_summary("why?", "because."),
            "Q: _why?_ A: because."
        );
    }
}
