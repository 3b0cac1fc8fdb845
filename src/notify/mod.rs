pub mod delivery;
pub mod pacing;
pub mod retry;
pub mod telegram;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Markup mode understood by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    Plain,
    Markdown,
    Html,
}

impl ParseMode {
    /// Bot API `parse_mode` value; plain text sends none.
    pub fn api_value(&self) -> Option<&'static str> {
        match self {
            ParseMode::Plain => None,
            ParseMode::Markdown => Some("Markdown"),
            ParseMode::Html => Some("HTML"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Summary,
    /// 1-based page number out of `total`.
    Page { number: usize, total: usize },
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Summary => write!(f, "summary"),
            MessageKind::Page { number, total } => write!(f, "page {number}/{total}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchMessage {
    pub kind: MessageKind,
    pub text: String,
    pub parse_mode: ParseMode,
    pub disable_preview: bool,
}

pub type MessageId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendErrorKind {
    Timeout,
    Network,
    /// Platform rejected the call.
    Api { code: u16 },
    RateLimited,
    Decode,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct SendError {
    pub kind: SendErrorKind,
    pub message: String,
    /// Seconds the platform asked us to wait before retrying.
    pub retry_after: Option<u64>,
}

impl SendError {
    pub fn new(kind: SendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }
}

/// Outbound capability of the broadcast channel.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    async fn send(&self, msg: &DispatchMessage) -> Result<MessageId, SendError>;
    async fn pin(&self, id: MessageId) -> Result<(), SendError>;
    fn name(&self) -> &str;
}

/// Logs every message instead of sending it (dry runs).
pub struct LogChannel {
    next_id: std::sync::atomic::AtomicI64,
}

impl LogChannel {
    pub fn new() -> Self {
        Self {
            next_id: std::sync::atomic::AtomicI64::new(1),
        }
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Channel for LogChannel {
    async fn send(&self, msg: &DispatchMessage) -> Result<MessageId, SendError> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        tracing::info!(message_id = id, kind = %msg.kind, chars = msg.text.chars().count(), "dry run: not sending");
        tracing::debug!(message_id = id, "{}", msg.text);
        Ok(id)
    }

    async fn pin(&self, id: MessageId) -> Result<(), SendError> {
        tracing::info!(message_id = id, "dry run: not pinning");
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
