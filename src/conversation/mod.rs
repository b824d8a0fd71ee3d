//! Conversation types and the append-only message log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::Affordance;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// An action suggestion tag attached to a bot reply by the remote backend.
///
/// The vocabulary is untrusted free-form data; anything outside the known
/// set is carried through as `Other` and resolved to the general affordance
/// composite rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTag {
    Write,
    Breathe,
    Meditate,
    Crisis,
    Other(String),
}

impl ActionTag {
    pub fn as_str(&self) -> &str {
        match self {
            ActionTag::Write => "write",
            ActionTag::Breathe => "breathe",
            ActionTag::Meditate => "meditate",
            ActionTag::Crisis => "crisis",
            ActionTag::Other(s) => s,
        }
    }
}

impl From<&str> for ActionTag {
    fn from(s: &str) -> Self {
        match s {
            "write" => ActionTag::Write,
            "breathe" => ActionTag::Breathe,
            "meditate" => ActionTag::Meditate,
            "crisis" => ActionTag::Crisis,
            other => ActionTag::Other(other.to_string()),
        }
    }
}

impl Serialize for ActionTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionTag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ActionTag::from(s.as_str()))
    }
}

/// A single exchanged message. Immutable once appended to the log.
///
/// `actions` holds the raw tags from the remote reply; `affordances` is
/// what is actually rendered with the message. A bot message can retain
/// tags while rendering no affordance (cadence miss).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Ordinal position in the log, assigned at append time.
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    #[serde(default)]
    pub actions: Vec<ActionTag>,
    #[serde(default)]
    pub affordances: Vec<Affordance>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            sender: Sender::User,
            text: text.into(),
            actions: Vec::new(),
            affordances: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn bot(
        id: u64,
        text: impl Into<String>,
        actions: Vec<ActionTag>,
        affordances: Vec<Affordance>,
    ) -> Self {
        Self {
            id,
            sender: Sender::Bot,
            text: text.into(),
            actions,
            affordances,
            created_at: Utc::now(),
        }
    }
}

/// Append-only log of exchanged messages. Insertion order is display order.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
    bot_count: u64,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Sender alternation is deliberately not enforced;
    /// a user may send several in a row while the bot is slow.
    pub fn append(&mut self, message: Message) {
        if message.sender == Sender::Bot {
            self.bot_count += 1;
        }
        self.messages.push(message);
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Number of bot messages appended so far.
    pub fn bot_count(&self) -> u64 {
        self.bot_count
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Ordinal the next appended message will receive.
    pub fn next_id(&self) -> u64 {
        self.messages.len() as u64
    }
}

/// A single dialogue with the remote backend.
///
/// The session id is generated once, treated as an opaque correlation
/// token, and passed unchanged on every remote call.
#[derive(Debug)]
pub struct ConversationSession {
    pub session_id: Uuid,
    pub log: ConversationLog,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            log: ConversationLog::new(),
        }
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}
