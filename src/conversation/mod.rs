//! Conversation Store
//!
//! An append-only, ordered log of role-tagged messages for one chat
//! session. Nothing is ever edited or removed; the whole log is read back
//! for rendering and for every model call.

pub mod sessions;

pub use sessions::SessionRegistry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{LLMMessage, LLMRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl From<Role> for LLMRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => LLMRole::User,
            Role::Assistant => LLMRole::Assistant,
        }
    }
}

/// A single chat turn. Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl From<&Message> for LLMMessage {
    fn from(msg: &Message) -> Self {
        LLMMessage::new(msg.role.into(), msg.content.clone())
    }
}

/// Ordered chat history for one session.
///
/// Consecutive messages with the same role are allowed: an upload turn can
/// be followed directly by a typed user turn.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, content: impl Into<String>) -> &Message {
        self.push(Role::User, content.into())
    }

    pub fn append_assistant(&mut self, content: impl Into<String>) -> &Message {
        self.push(Role::Assistant, content.into())
    }

    fn push(&mut self, role: Role, content: String) -> &Message {
        self.messages.push(Message::new(role, content));
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// How much of the history is forwarded to the model on each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryWindow {
    /// Forward the entire conversation.
    #[default]
    Unbounded,
    /// Forward only the most recent `n` messages.
    LastN(usize),
}

impl HistoryWindow {
    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(n) if n > 0 => HistoryWindow::LastN(n),
            _ => HistoryWindow::Unbounded,
        }
    }

    /// The slice of `messages` this window selects, in original order.
    pub fn select<'a>(&self, messages: &'a [Message]) -> &'a [Message] {
        match *self {
            HistoryWindow::Unbounded => messages,
            HistoryWindow::LastN(n) => &messages[messages.len().saturating_sub(n)..],
        }
    }
}
