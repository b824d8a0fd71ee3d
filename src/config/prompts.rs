//! Companion voice: idle prompts and the safety fallback
//!
//! Deployments can restyle the companion's wording with a TOML prompt set:
//!
//! ```toml
//! [voice]
//! greeting = "Hi! What would you like to talk about?"
//! fallback = "I'm still here with you. Want to tell me more?"
//!
//! [idle]
//! prompts = ["What's on your mind?", "How was your day?"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;

/// A loadable set of user-facing prompt strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSet {
    #[serde(default)]
    pub voice: VoicePrompts,

    #[serde(default)]
    pub idle: IdlePrompts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicePrompts {
    /// Opening bot line shown when a conversation starts.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Shown in place of a reply when the backend fails or declines.
    /// The conversation surface never shows a technical error.
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlePrompts {
    /// Rotating invitations shown on the pre-chat screen.
    #[serde(default = "default_idle_prompts")]
    pub prompts: Vec<String>,
}

fn default_greeting() -> String {
    builtin::GREETING.to_string()
}

fn default_fallback() -> String {
    builtin::SAFETY_FALLBACK.to_string()
}

fn default_idle_prompts() -> Vec<String> {
    builtin::IDLE_PROMPTS.iter().map(|p| p.to_string()).collect()
}

impl Default for VoicePrompts {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            fallback: default_fallback(),
        }
    }
}

impl Default for IdlePrompts {
    fn default() -> Self {
        Self {
            prompts: default_idle_prompts(),
        }
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            voice: VoicePrompts::default(),
            idle: IdlePrompts::default(),
        }
    }
}

impl PromptSet {
    pub async fn from_file(path: &Path) -> Result<Self, PromptError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PromptError::IoError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| PromptError::ParseError(e.to_string()))
    }
}

/// Errors from prompt set loading
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Cycles through the idle prompts, one per request.
#[derive(Debug)]
pub struct PromptRotation {
    prompts: Vec<String>,
    next: AtomicUsize,
}

impl PromptRotation {
    pub fn new(prompts: Vec<String>) -> Self {
        let prompts = if prompts.is_empty() {
            default_idle_prompts()
        } else {
            prompts
        };
        Self {
            prompts,
            next: AtomicUsize::new(0),
        }
    }

    pub fn next(&self) -> &str {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        &self.prompts[i % self.prompts.len()]
    }
}

/// Built-in wording that ships with the companion.
pub mod builtin {
    /// Opening bot line for a new conversation.
    pub const GREETING: &str =
        "Hello! I'm here to listen and chat. How can I assist you today?";

    /// Shown when the backend errors out or returns an empty reply.
    pub const SAFETY_FALLBACK: &str =
        "I'm having a little trouble finding the right words, but I'm still here with you. \
         Would you like to tell me more about how you're feeling?";

    /// Pre-chat screen invitations.
    pub const IDLE_PROMPTS: [&str; 5] = [
        "What's on your mind right now?",
        "How are you feeling today?",
        "Is there anything you'd like to talk about?",
        "What's been on your mind lately?",
        "Feel free to share your thoughts...",
    ];
}
