//! Chat actor message types.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::db::{ChatId, NewPlayer};

/// The Telegram user behind an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
}

impl UserInfo {
    pub fn display_name(&self) -> &str {
        if !self.first_name.is_empty() {
            &self.first_name
        } else {
            self.username.as_deref().unwrap_or("player")
        }
    }

    pub fn to_new_player(&self) -> NewPlayer {
        NewPlayer {
            tg_id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
        }
    }
}

/// A button press or command in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundUpdate {
    pub chat_id: ChatId,
    pub user: UserInfo,
    /// Callback data or command text.
    pub data: String,
}

/// Messages that can be sent to a ChatActor
#[derive(Debug)]
pub enum ChatMessage {
    /// Process an update from the chat
    Update {
        update: InboundUpdate,
        response: oneshot::Sender<ChatResponse>,
    },

    /// Stop the actor
    Close,
}

/// Outcome of one update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "message", rename_all = "snake_case")]
pub enum ChatResponse {
    /// The update was applied.
    Applied,

    /// The update was not allowed; the chat was told why.
    Rejected(String),

    /// The update could not be processed.
    Failed(String),
}

impl ChatResponse {
    /// Check if response is success
    pub fn is_success(&self) -> bool {
        matches!(self, ChatResponse::Applied)
    }

    /// Get error message if response is error
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ChatResponse::Applied => None,
            ChatResponse::Rejected(msg) | ChatResponse::Failed(msg) => Some(msg),
        }
    }
}
