//! Conversation messages and per-user history records.
//!
//! Messages are ordered and append-only per user. The sequence conceptually
//! alternates user/assistant but the store does not enforce alternation;
//! any sequence of appends is legal and preserved in insertion order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One entry in a user's conversation history.
///
/// The same shape is sent to the chat-completion API, so the serde
/// representation matches the wire format exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A per-user document in the history store.
///
/// Created lazily on first contact and never deleted; a clear operation
/// empties an array field but keeps the record. Array fields are created as
/// singletons on first append.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRecord {
    /// Chat/user identifier
    pub id: String,

    /// Named array fields (the conversation lives under "messages")
    #[serde(default)]
    pub fields: HashMap<String, Vec<Value>>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    /// Raw contents of a named array field (empty slice if absent)
    pub fn array_field(&self, name: &str) -> &[Value] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The conversation history, in insertion order
    pub fn messages(&self) -> Result<Vec<ChatMessage>, serde_json::Error> {
        self.array_field(crate::history::MESSAGES_FIELD)
            .iter()
            .map(|value| serde_json::from_value(value.clone()))
            .collect()
    }
}
