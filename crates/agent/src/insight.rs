//! Background profile insights.
//!
//! After a chat exchange, the player's recent messages are summarized by
//! the model and merged into the derived `analysis` of their profile. The
//! task runs detached from the request: it never delays or fails a reply,
//! and its failures are only logged.

use nexus_core::history::HistoryStore;
use nexus_core::message::Message;
use nexus_core::profile::ProfileStore;
use nexus_core::provider::{GenerateRequest, Provider};
use nexus_tools::generative::strip_code_fence;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const RECENT_USER_MESSAGES: usize = 5;
const MAX_CONVERSATION_HOOKS: usize = 8;
const MAX_DISCOVERED_INTERESTS: usize = 10;

/// What the model noticed in the latest messages. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct Insights {
    #[serde(default)]
    pub new_interests: Vec<String>,
    #[serde(default)]
    pub mood_pattern: String,
    #[serde(default)]
    pub skill_observations: String,
    #[serde(default)]
    pub updated_personality_notes: String,
    #[serde(default)]
    pub topics_to_follow_up: Vec<String>,
}

impl Insights {
    pub fn is_empty(&self) -> bool {
        self.new_interests.is_empty()
            && self.mood_pattern.trim().is_empty()
            && self.skill_observations.trim().is_empty()
            && self.updated_personality_notes.trim().is_empty()
            && self.topics_to_follow_up.is_empty()
    }

    /// Fold these insights into an existing analysis map.
    pub fn merge_into(self, existing: &Map<String, Value>) -> Map<String, Value> {
        let mut updated = existing.clone();

        if !self.updated_personality_notes.trim().is_empty() {
            updated.insert("personality_notes".into(), self.updated_personality_notes.into());
        }
        if !self.mood_pattern.trim().is_empty() {
            updated.insert("recent_mood".into(), self.mood_pattern.into());
        }
        if !self.topics_to_follow_up.is_empty() {
            let mut hooks = self.topics_to_follow_up;
            hooks.extend(string_list(updated.get("conversation_hooks")));
            hooks.truncate(MAX_CONVERSATION_HOOKS);
            updated.insert("conversation_hooks".into(), hooks.into());
        }
        if !self.new_interests.is_empty() {
            let mut interests = string_list(updated.get("discovered_interests"));
            for interest in self.new_interests {
                if !interests.contains(&interest) {
                    interests.push(interest);
                }
            }
            interests.truncate(MAX_DISCOVERED_INTERESTS);
            updated.insert("discovered_interests".into(), interests.into());
        }
        if !self.skill_observations.trim().is_empty() {
            updated.insert("skill_assessment".into(), self.skill_observations.into());
        }

        updated
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Re-derives the profile analysis from recent conversation.
pub struct ProfileInsights {
    provider: Arc<dyn Provider>,
    model: String,
    min_messages: usize,
}

impl ProfileInsights {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            min_messages: 4,
        }
    }

    /// Minimum conversation length before any analysis is attempted.
    pub fn with_min_messages(mut self, min: usize) -> Self {
        self.min_messages = min;
        self
    }

    /// Produce an updated analysis, or `None` when there is nothing new.
    ///
    /// `conversation_len` counts every turn in the session; `user_messages`
    /// are the player's latest messages, oldest first.
    pub async fn evolve(
        &self,
        conversation_len: usize,
        user_messages: &[String],
        existing: &Map<String, Value>,
    ) -> Option<Map<String, Value>> {
        if conversation_len < self.min_messages {
            return None;
        }

        let start = user_messages.len().saturating_sub(RECENT_USER_MESSAGES);
        let recent = &user_messages[start..];
        if recent.is_empty() {
            return None;
        }

        let request = GenerateRequest::new(&self.model, vec![Message::user(insight_prompt(recent, existing))])
            .with_temperature(0.3)
            .with_max_tokens(300);

        let text = match self.provider.generate(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Profile insight call failed");
                return None;
            }
        };

        let insights: Insights = match serde_json::from_str(strip_code_fence(&text)) {
            Ok(insights) => insights,
            Err(e) => {
                warn!(error = %e, "Profile insight reply was not valid JSON");
                return None;
            }
        };

        if insights.is_empty() {
            debug!("No new profile insights");
            return None;
        }

        Some(insights.merge_into(existing))
    }

    /// Run [`evolve`](Self::evolve) for a user in a detached task and store the result.
    pub fn spawn(
        self: Arc<Self>,
        user_id: String,
        session_id: String,
        history: Arc<dyn HistoryStore>,
        profiles: Arc<dyn ProfileStore>,
        history_limit: usize,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let result: Result<(), nexus_core::Error> = async {
                let turns = history.recent(&user_id, &session_id, history_limit).await?;
                if turns.len() < self.min_messages {
                    return Ok(());
                }
                let Some(profile) = profiles.get(&user_id).await? else {
                    return Ok(());
                };
                let messages = history
                    .recent_user_messages(&user_id, RECENT_USER_MESSAGES)
                    .await?;

                if let Some(analysis) = self.evolve(turns.len(), &messages, &profile.analysis).await {
                    profiles.update_analysis(&user_id, analysis).await?;
                    debug!(user = %user_id, "Profile analysis updated");
                }
                Ok(())
            }
            .await;

            if let Err(e) = result {
                warn!(user = %user_id, error = %e, "Profile evolution failed");
            }
        })
    }
}

fn insight_prompt(messages: &[String], existing: &Map<String, Value>) -> String {
    let conversation = messages
        .iter()
        .map(|m| format!("- {m}"))
        .collect::<Vec<_>>()
        .join("\n");
    let existing = Value::Object(existing.clone());

    format!(
        "You are analyzing a gamer's recent messages to update their player profile.\n\n\
         Existing profile analysis:\n{existing}\n\n\
         Recent messages from the player:\n{conversation}\n\n\
         Extract any NEW insights about this player. Only include fields that have \
         genuinely new information. Respond with JSON:\n\
         {{\"new_interests\": [\"any new games or topics they mentioned\"],\n\
         \"mood_pattern\": \"their general mood/attitude in these messages\",\n\
         \"skill_observations\": \"anything revealed about their skill level\",\n\
         \"updated_personality_notes\": \"refined understanding of their personality\",\n\
         \"topics_to_follow_up\": [\"specific things to remember for next time\"]}}\n\
         Respond ONLY with valid JSON. If nothing new to add, respond with {{}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use nexus_core::history::HistoryTurn;
    use nexus_core::message::Role;
    use nexus_core::profile::PlayerProfile;
    use nexus_memory::{InMemoryHistory, InMemoryProfiles};
    use serde_json::json;

    fn messages(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("message {i}")).collect()
    }

    #[test]
    fn merge_prepends_hooks_and_unions_interests() {
        let existing = json!({
            "player_archetype": "grinder",
            "conversation_hooks": ["a", "b", "c", "d", "e", "f", "g"],
            "discovered_interests": ["Hades"]
        });
        let insights = Insights {
            new_interests: vec!["Hades".into(), "Celeste".into()],
            mood_pattern: "tilted".into(),
            topics_to_follow_up: vec!["x".into(), "y".into()],
            ..Insights::default()
        };

        let merged = insights.merge_into(existing.as_object().unwrap());
        assert_eq!(merged["player_archetype"], "grinder");
        assert_eq!(merged["recent_mood"], "tilted");
        assert_eq!(merged["conversation_hooks"], json!(["x", "y", "a", "b", "c", "d", "e", "f"]));
        assert_eq!(merged["discovered_interests"], json!(["Hades", "Celeste"]));
        assert!(!merged.contains_key("skill_assessment"));
    }

    #[test]
    fn interests_capped() {
        let insights = Insights {
            new_interests: (0..15).map(|i| format!("game {i}")).collect(),
            ..Insights::default()
        };
        let merged = insights.merge_into(&Map::new());
        assert_eq!(merged["discovered_interests"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn too_short_conversation_skips_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let insights = ProfileInsights::new(provider.clone(), "m");
        assert!(insights.evolve(3, &messages(2), &Map::new()).await.is_none());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn fenced_reply_is_merged() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            "```json\n{\"skill_observations\": \"Solid aim, weak utility\", \"new_interests\": []}\n```",
        ]));
        let insights = ProfileInsights::new(provider.clone(), "m");
        let updated = insights.evolve(6, &messages(7), &Map::new()).await.unwrap();
        assert_eq!(updated["skill_assessment"], "Solid aim, weak utility");

        let request = &provider.requests()[0];
        let prompt = &request.messages[0].content;
        assert!(prompt.contains("- message 3\n"));
        assert!(prompt.contains("- message 7"));
        assert!(!prompt.contains("- message 2\n"));
        assert_eq!(request.max_tokens, Some(300));
    }

    #[tokio::test]
    async fn empty_insights_mean_no_update() {
        let provider = Arc::new(ScriptedProvider::new(vec!["{}"]));
        let insights = ProfileInsights::new(provider, "m");
        assert!(insights.evolve(4, &messages(2), &Map::new()).await.is_none());
    }

    #[tokio::test]
    async fn garbage_reply_means_no_update() {
        let provider = Arc::new(ScriptedProvider::new(vec!["I think they like shooters."]));
        let insights = ProfileInsights::new(provider, "m");
        assert!(insights.evolve(4, &messages(2), &Map::new()).await.is_none());
    }

    #[tokio::test]
    async fn spawned_task_updates_profile() {
        let history = Arc::new(InMemoryHistory::new());
        for i in 0..2 {
            history
                .append("u1", "default", HistoryTurn::new(Role::User, format!("q{i}")))
                .await
                .unwrap();
            history
                .append("u1", "default", HistoryTurn::new(Role::Model, format!("a{i}")))
                .await
                .unwrap();
        }
        let profiles = Arc::new(InMemoryProfiles::new());
        profiles.insert("u1", PlayerProfile::new("tenz")).await;

        let provider = Arc::new(ScriptedProvider::new(vec![r#"{"mood_pattern": "hyped"}"#]));
        let insights = Arc::new(ProfileInsights::new(provider, "m"));
        insights
            .spawn("u1".into(), "default".into(), history, profiles.clone(), 20)
            .await
            .unwrap();

        let profile = profiles.get("u1").await.unwrap().unwrap();
        assert_eq!(profile.analysis["recent_mood"], "hyped");
    }

    #[tokio::test]
    async fn spawned_task_swallows_missing_profile() {
        let history = Arc::new(InMemoryHistory::new());
        for i in 0..4 {
            history
                .append("ghost", "s", HistoryTurn::new(Role::User, format!("q{i}")))
                .await
                .unwrap();
        }
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let insights = Arc::new(ProfileInsights::new(provider.clone(), "m"));
        insights
            .spawn("ghost".into(), "s".into(), history, Arc::new(InMemoryProfiles::new()), 20)
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 0);
    }
}
