//! HTTP implementation of the remote chat backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::ActionTag;

use super::{ChatBackend, ChatError, ChatReply};

pub struct HttpChatBackend {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    text: &'a str,
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    response: String,
    #[serde(default)]
    action: Option<Vec<ActionTag>>,
}

impl HttpChatBackend {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(&self, text: &str, session_id: Uuid) -> Result<ChatReply, ChatError> {
        let request = ChatRequestBody {
            text,
            session_id: session_id.to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::InvalidResponse(format!("{}: {}", status, body)));
        }

        let body: ChatResponseBody = response.json().await?;

        Ok(ChatReply {
            response: body.response,
            action: body.action,
        })
    }
}
