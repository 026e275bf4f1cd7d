use chrono::{Local, Utc};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::chat::types::{ChatMessage, PendingQuestion};
use crate::error::{Error, Result};

/// Transcript state for one chat view.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    last_error: Option<String>,
    pending_retry: Option<PendingQuestion>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn pending_retry(&self) -> Option<&PendingQuestion> {
        self.pending_retry.as_ref()
    }

    /// Replaces the transcript with stored history. Returns the number of
    /// exchanges loaded; an empty history leaves the transcript alone.
    pub async fn load_history(&mut self, client: &ApiClient) -> usize {
        let history = match client.get_chat_history().await {
            Ok(history) => history,
            Err(e) => {
                warn!("Failed to load chat history: {}", e);
                return 0;
            }
        };

        if history.is_empty() {
            return 0;
        }

        self.messages = history.iter().flat_map(ChatMessage::from_history).collect();
        info!("Loaded {} exchanges from history", history.len());
        history.len()
    }

    /// Sends a question and appends the answer, or an error line on failure.
    /// A blank question is ignored.
    pub async fn send(&mut self, client: &ApiClient, question: &str, country: Option<&str>) -> Option<&ChatMessage> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        let pending = PendingQuestion {
            question: question.to_string(),
            country: country.map(str::to_string),
        };
        Some(self.dispatch(client, pending).await)
    }

    /// Replays the last failed question, if any.
    pub async fn retry(&mut self, client: &ApiClient) -> Option<&ChatMessage> {
        let pending = self.pending_retry.clone()?;
        debug!("Retrying question: {}", pending.question);
        Some(self.dispatch(client, pending).await)
    }

    async fn dispatch(&mut self, client: &ApiClient, pending: PendingQuestion) -> &ChatMessage {
        self.last_error = None;
        self.pending_retry = None;
        self.messages.push(ChatMessage::user(pending.question.clone()));

        let reply = match client.send_message(&pending.question, pending.country.as_deref()).await {
            Ok(response) => ChatMessage::assistant(response.answer, response.country),
            Err(e) => {
                warn!("Failed to send message: {}", e);
                self.last_error = Some(e.message().to_string());
                self.pending_retry = Some(pending);
                ChatMessage::failure(e.message())
            }
        };

        self.messages.push(reply);
        &self.messages[self.messages.len() - 1]
    }

    /// Clears the view only; stored history on the server is untouched.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.last_error = None;
        self.pending_retry = None;
    }

    pub fn search(&self, query: &str) -> Vec<&ChatMessage> {
        if query.is_empty() {
            return self.messages.iter().collect();
        }
        let needle = query.to_lowercase();
        self.messages
            .iter()
            .filter(|message| message.content.to_lowercase().contains(&needle))
            .collect()
    }

    /// Plain-text transcript, one block per message.
    pub fn export(&self) -> Result<String> {
        if self.messages.is_empty() {
            return Err(Error::chat("No messages to export"));
        }

        let blocks: Vec<String> = self
            .messages
            .iter()
            .map(|message| {
                let time = message.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
                let country = message
                    .country
                    .as_ref()
                    .map(|c| format!(" [{}]", c))
                    .unwrap_or_default();
                format!(
                    "[{}] {}{}:\n{}\n",
                    time,
                    message.role.display_name(),
                    country,
                    message.content
                )
            })
            .collect();

        Ok(blocks.join("\n"))
    }

    pub fn export_file_name() -> String {
        format!("study-abroad-chat-{}.txt", Utc::now().format("%Y-%m-%d"))
    }
}
