//! Chat types for Morphic.
//!
//! A chat is owned by one user, is private unless shared, and holds an
//! ordered list of `UiMessage`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::message::UiMessage;

/// Title given to a chat before the title generator has run.
pub const UNTITLED_CHAT: &str = "Untitled";

/// Who can read a chat.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (visibility IN ('public', 'private'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("invalid visibility: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Whether `user_id` may read this chat.
    pub fn is_readable_by(&self, user_id: &str) -> bool {
        self.visibility == Visibility::Public || self.user_id == user_id
    }
}

/// A chat together with its messages, as cached and served to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatWithMessages {
    #[serde(flatten)]
    pub chat: Chat,
    pub messages: Vec<UiMessage>,
}

/// One page of a user's chat history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPage {
    pub chats: Vec<Chat>,
    /// Offset of the next page, or `None` when this was the last one.
    pub next_offset: Option<u32>,
}

/// What the client asked the chat endpoint to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ChatTrigger {
    #[default]
    SubmitMessage,
    RegenerateAssistantMessage,
}
