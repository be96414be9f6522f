//! Message and Conversation domain types.
//!
//! Two parallel views of a session live here:
//! - [`Conversation`] is the durable, append-only log of [`Message`]s that
//!   the user sees (user input, final answers, errors).
//! - [`ChatMessage`] is the model-facing turn shape actually sent to the
//!   generation service, including tool-call and tool-result turns.
//!
//! [`Conversation::project`] derives the second from the first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of an entry in the durable conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant's final answer for an utterance
    Assistant,
    /// Local status notes
    System,
    /// A failed utterance
    Error,
}

/// A single entry in the durable log. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Monotonic id, unique within the conversation
    pub id: u64,

    pub role: Role,

    pub text: String,

    pub timestamp: DateTime<Utc>,
}

/// Role of a model-facing turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call embedded in an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as the raw JSON string the model produced
    pub arguments: String,
}

/// A turn in the message list sent to the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,

    /// The text content (may be empty for assistant turns that only call tools)
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::Assistant, content)
    }

    /// An assistant turn that carries the step's text plus every tool call it made.
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<MessageToolCall>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::plain(ChatRole::Assistant, content)
        }
    }

    /// A tool-result turn paired with its call by id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(ChatRole::Tool, content)
        }
    }
}

/// The durable message log of one interactive session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,

    messages: Vec<Message>,

    next_id: u64,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            next_id: 0,
        }
    }

    /// Append an entry and return its id.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(Message {
            id,
            role,
            text: text.into(),
            timestamp: Utc::now(),
        });
        id
    }

    /// All entries, in append order.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// The most recently appended entry.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Project the whole log into model-facing turns. See [`project`].
    pub fn project(&self) -> Vec<ChatMessage> {
        project(&self.messages)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Map user and assistant entries to chat turns; every other role is dropped.
pub fn project(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter_map(|m| match m.role {
            Role::User => Some(ChatMessage::user(&m.text)),
            Role::Assistant => Some(ChatMessage::assistant(&m.text)),
            Role::System | Role::Error => None,
        })
        .collect()
}
