//! Remote collaborators reached over HTTP

mod chat;
mod quotes;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::conversation::ActionTag;

pub use chat::HttpChatBackend;
pub use quotes::{Quote, QuoteProvider};

/// Errors from the remote chat backend.
///
/// Callers treat every variant uniformly (the conversation surface shows
/// the safety fallback, never a raw error), so the variants exist for
/// diagnostics only.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A bot reply from the remote backend.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// The reply text. May be empty when the backend declined to answer.
    pub response: String,
    /// Action suggestion tags, absent when the backend attached none.
    pub action: Option<Vec<ActionTag>>,
}

/// The remote chat collaborator. The companion never inspects the reply
/// beyond the `{response, action}` shape; the intelligence is elsewhere.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, text: &str, session_id: Uuid) -> Result<ChatReply, ChatError>;
}
