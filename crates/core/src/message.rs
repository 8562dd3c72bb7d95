//! Message domain types.
//!
//! These are the value objects sent to the model service on every step:
//! prior history → new user message → model turns and synthesized
//! observation turns appended by the agent loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (observation turns are also sent as user turns)
    User,
    /// The model
    Model,
}

/// A single message in the running message list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new model message.
    pub fn model(content: impl Into<String>) -> Self {
        Self::with_role(Role::Model, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Who should I main in Valorant?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Who should I main in Valorant?");
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::model("gg")).unwrap();
        assert!(json.contains("\"role\":\"model\""));
    }
}
