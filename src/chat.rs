//! Chat platform boundary and the command surface triggered from chat.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while posting to the chat platform.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("failed to post to {channel}: {message}")]
    Post { channel: String, message: String },
}

/// One inbound chat trigger: the command text and where to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub text: String,
    pub channel: String,
    pub user: String,
}

impl Trigger {
    pub fn new(
        text: impl Into<String>,
        channel: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            channel: channel.into(),
            user: user.into(),
        }
    }
}

/// Boundary trait over the chat platform's asynchronous posting mechanism.
///
/// `thread_ts`, when given, threads the message under an earlier one. The
/// returned timestamp identifies the posted message for later threading.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, ChatError>;
}

/// Closed command set recognized from chat text, resolved once per trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask { question: String },
    Load,
    Reset,
    DataSources,
    KnockKnock,
    Unknown { original: String },
}

impl Command {
    /// Parse a trigger's text. Bare text with no recognized verb is treated
    /// as a question, matching how chat users actually type.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("knock knock") {
            return Self::KnockKnock;
        }
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default().trim();
        match verb.to_ascii_lowercase().as_str() {
            "ask" if !rest.is_empty() => Self::Ask {
                question: rest.to_string(),
            },
            "ask" => Self::Unknown {
                original: trimmed.to_string(),
            },
            "load" if rest.is_empty() => Self::Load,
            "reset" if rest.is_empty() => Self::Reset,
            "sources" | "data-sources" if rest.is_empty() => Self::DataSources,
            _ if trimmed.is_empty() => Self::Unknown {
                original: String::new(),
            },
            _ => Self::Ask {
                question: trimmed.to_string(),
            },
        }
    }

    /// Help text posted in reply to unrecognized input.
    pub fn help_text() -> &'static str {
        "Commands: `ask <question>` to query the knowledge base, `load` to \
         ingest the configured sources, `reset` to clear the index, `sources` \
         to list what is indexed."
    }
}
