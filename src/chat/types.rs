use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ChatHistoryItem;

/// Role of the message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            MessageRole::User => "You",
            MessageRole::Assistant => "AI Assistant",
        }
    }
}

/// One line of the transcript as the user sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            country: None,
            timestamp: Utc::now(),
            error: false,
        }
    }

    pub fn assistant(content: impl Into<String>, country: Option<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            country,
            timestamp: Utc::now(),
            error: false,
        }
    }

    /// An assistant-side line standing in for a failed answer.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            ..Self::assistant(message, None)
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// A stored exchange becomes the question followed by its answer.
    pub fn from_history(item: &ChatHistoryItem) -> [ChatMessage; 2] {
        [
            ChatMessage::user(item.question.clone()).at(item.created_at),
            ChatMessage::assistant(item.answer.clone(), item.country.clone()).at(item.created_at),
        ]
    }
}

/// The exact question to replay on retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    pub question: String,
    pub country: Option<String>,
}
