//! Application configuration

pub mod prompts;

use std::env;

use serde::{Deserialize, Serialize};

pub use prompts::{builtin as prompts_builtin, PromptSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Remote chat backend, `POST {text, session_id}`.
    pub chat_backend_url: String,
    /// Quote endpoint for the idle-screen decoration.
    pub quote_url: String,
    /// Document/sheet provisioning service. Journal and mood-tracker
    /// routes answer 503 when unset.
    pub docs_service_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            chat_backend_url: env::var("CHAT_BACKEND_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5000/chat".into()),
            quote_url: env::var("QUOTE_URL")
                .unwrap_or_else(|_| "https://quotes-api-self.vercel.app/quote".into()),
            docs_service_url: env::var("DOCS_SERVICE_URL").ok(),
        })
    }
}
