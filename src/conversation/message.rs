use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, never-reused message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A single entry in the conversation. Fields are private so a message
/// cannot change after it has been appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    sender: Sender,
    text: String,
    timestamp: DateTime<Utc>,
    /// Sanitized bot text, computed once per message
    #[serde(skip)]
    display: OnceCell<String>,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.sender == other.sender
            && self.text == other.text
            && self.timestamp == other.timestamp
    }
}

impl Eq for Message {}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        let message = Self::new(Sender::Bot, text);
        // warm the cache so snapshot clones carry the sanitized text
        message.display_text();
        message
    }

    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            display: OnceCell::new(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// Raw text as received; bot text is not sanitized here
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    /// Text as it is shown on screen and placed on the clipboard
    pub fn display_text(&self) -> &str {
        match self.sender {
            Sender::User => &self.text,
            Sender::Bot => self
                .display
                .get_or_init(|| crate::sanitize::sanitize(&self.text)),
        }
    }
}
