//! In-memory chat history, keyed by user and session.

use async_trait::async_trait;
use nexus_core::error::StoreError;
use nexus_core::history::{HistoryStore, HistoryTurn};
use nexus_core::message::Role;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type SessionKey = (String, String);

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionKey, Vec<HistoryTurn>>,
    /// user id → user-authored messages across sessions, in append order
    user_messages: HashMap<String, Vec<String>>,
}

/// Ephemeral history store; lost on restart.
#[derive(Default)]
pub struct InMemoryHistory {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn recent(
        &self,
        user_id: &str,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryTurn>, StoreError> {
        let inner = self.inner.read().await;
        let turns = inner
            .sessions
            .get(&(user_id.to_string(), session_id.to_string()))
            .map(|turns| {
                let skip = turns.len().saturating_sub(limit);
                turns[skip..].to_vec()
            })
            .unwrap_or_default();
        Ok(turns)
    }

    async fn append(
        &self,
        user_id: &str,
        session_id: &str,
        turn: HistoryTurn,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if turn.role == Role::User {
            inner
                .user_messages
                .entry(user_id.to_string())
                .or_default()
                .push(turn.content.clone());
        }
        inner
            .sessions
            .entry((user_id.to_string(), session_id.to_string()))
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn recent_user_messages(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().await;
        let messages = inner
            .user_messages
            .get(user_id)
            .map(|msgs| {
                let skip = msgs.len().saturating_sub(limit);
                msgs[skip..].to_vec()
            })
            .unwrap_or_default();
        Ok(messages)
    }
}
