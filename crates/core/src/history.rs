//! Chat history collaborator.
//!
//! The agent core only reads prior turns. The caller persists the final
//! sanitized exchange after the agent returns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::message::{Message, Role};

/// One persisted chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Convert into a message for the model service.
    pub fn to_message(&self) -> Message {
        match self.role {
            Role::User => Message::user(&self.content),
            Role::Model => Message::model(&self.content),
        }
    }
}

/// Ordered per-user, per-session chat history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The most recent `limit` turns for a session, oldest first.
    async fn recent(
        &self,
        user_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryTurn>, StoreError>;

    /// Append a turn to a session.
    async fn append(
        &self,
        user_id: &str,
        session_id: &str,
        turn: HistoryTurn,
    ) -> Result<(), StoreError>;

    /// The most recent `limit` user-authored messages across all sessions, oldest first.
    async fn recent_user_messages(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_converts_to_message() {
        let turn = HistoryTurn::new(Role::Model, "Try Jett on Ascent.");
        let msg = turn.to_message();
        assert_eq!(msg.role, Role::Model);
        assert_eq!(msg.content, "Try Jett on Ascent.");
    }
}
