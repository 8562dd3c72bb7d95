//! The closed tool set and its dispatcher.
//!
//! Tool names arrive as free text from the model. They are matched once,
//! in `GameTool::parse`, and everything after that is a typed variant.
//! Dispatch never fails: unknown names and handler errors come back as
//! `{"error": ...}` observations the model can react to.

use nexus_core::error::ToolError;
use nexus_core::profile::PlayerProfile;
use nexus_core::tool::{ToolDefinition, ToolInvocation};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::generative::Generated;
use crate::resolver::{DataResolver, QueryKind};

/// A validated tool request.
#[derive(Debug, Clone, PartialEq)]
pub enum GameTool {
    SearchGameInfo { game: String, query_type: QueryKind },
    RecommendGames { based_on: String },
    GetPlayerProfile,
    CompareGames { game1: String, game2: String },
}

impl GameTool {
    /// Match an invocation against the known tools, including legacy aliases.
    pub fn parse(invocation: &ToolInvocation) -> Result<Self, ToolError> {
        let arg = |key: &str| invocation.arg_str(key).trim().to_string();

        match invocation.name.as_str() {
            "search_game_info" => Ok(Self::SearchGameInfo {
                game: arg("game"),
                query_type: QueryKind::from_arg(invocation.arg_str("query_type")),
            }),
            "search_knowledge_base" => Ok(Self::SearchGameInfo {
                game: arg("game"),
                query_type: QueryKind::from_arg(invocation.arg_str("query")),
            }),
            "get_game_meta" => Ok(Self::SearchGameInfo {
                game: arg("game"),
                query_type: QueryKind::Meta,
            }),
            "recommend_games" => Ok(Self::RecommendGames {
                based_on: arg("based_on"),
            }),
            "get_player_profile" => Ok(Self::GetPlayerProfile),
            "compare_games" => Ok(Self::CompareGames {
                game1: arg("game1"),
                game2: arg("game2"),
            }),
            other => Err(ToolError::NotFound(other.to_string())),
        }
    }

    /// Descriptions interpolated into the agent's system instruction.
    pub fn definitions() -> Vec<ToolDefinition> {
        let def = |name: &str, description: &str, params: &[(&str, &str)]| ToolDefinition {
            name: name.into(),
            description: description.into(),
            parameters: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };

        vec![
            def(
                "search_game_info",
                "Search for information about a specific game. Fetches LIVE data: current meta, tips, character and weapon info. Use this whenever the user asks about any game. Works for ANY game, not just popular ones.",
                &[
                    ("game", "The game name (e.g. 'League of Legends', 'Valorant', 'Elden Ring', 'Palworld')"),
                    ("query_type", "What to look for: 'meta' (current meta/tier list), 'general' (overview/tips), or 'recommendations' (similar games)"),
                ],
            ),
            def(
                "recommend_games",
                "Get personalized game recommendations, based on a game the user likes or on their playstyle. Returns live data.",
                &[(
                    "based_on",
                    "A game name (for 'similar to X') OR a playstyle ('competitive', 'casual', 'explorer', 'social')",
                )],
            ),
            def(
                "get_player_profile",
                "Get the user's gaming profile: favorite games, ranks, roles, playstyle and goals. Use this to personalize any recommendation or advice.",
                &[],
            ),
            def(
                "compare_games",
                "Compare two games side by side with live data. Use when the user asks 'should I play X or Y' or 'difference between X and Y'.",
                &[("game1", "First game name"), ("game2", "Second game name")],
            ),
        ]
    }
}

/// Ambient per-request state handed to tool handlers.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The caller's stored profile, if any.
    pub profile: Option<PlayerProfile>,
}

impl ToolContext {
    pub fn with_profile(profile: Option<PlayerProfile>) -> Self {
        Self { profile }
    }
}

/// Routes invocations to handlers backed by the data resolution chain.
#[derive(Clone)]
pub struct ToolRegistry {
    resolver: Arc<DataResolver>,
}

impl ToolRegistry {
    pub fn new(resolver: Arc<DataResolver>) -> Self {
        Self { resolver }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        GameTool::definitions()
    }

    /// Run one invocation. Always returns a JSON object.
    pub async fn dispatch(&self, invocation: &ToolInvocation, ctx: &ToolContext) -> serde_json::Value {
        let result = match GameTool::parse(invocation) {
            Ok(tool) => {
                debug!(tool = %invocation.name, "Dispatching tool");
                self.execute(tool, ctx).await
            }
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| json!({ "error": e.to_string() }))
    }

    async fn execute(&self, tool: GameTool, ctx: &ToolContext) -> Result<serde_json::Value, ToolError> {
        match tool {
            GameTool::SearchGameInfo { game, query_type } => {
                require("search_game_info", "game", &game)?;
                Ok(self.search_game_info(&game, query_type).await)
            }
            GameTool::RecommendGames { based_on } => {
                require("recommend_games", "based_on", &based_on)?;
                Ok(self.recommend_games(&based_on).await)
            }
            GameTool::GetPlayerProfile => Ok(player_profile(ctx.profile.as_ref())),
            GameTool::CompareGames { game1, game2 } => {
                require("compare_games", "game1", &game1)?;
                require("compare_games", "game2", &game2)?;
                Ok(self.compare_games(&game1, &game2).await)
            }
        }
    }

    async fn search_game_info(&self, game: &str, query_type: QueryKind) -> serde_json::Value {
        let resolved = self.resolver.resolve(game, query_type).await;
        if !resolved.found() {
            return json!({
                "found": false,
                "message": format!("No data found for '{game}'"),
            });
        }

        json!({
            "found": true,
            "game": game,
            "data": resolved.into_payload(),
        })
    }

    /// Try `based_on` as a game first, then as a playstyle descriptor.
    async fn recommend_games(&self, based_on: &str) -> serde_json::Value {
        let resolved = self.resolver.resolve_recommendations(based_on).await;
        if let Some(games) = non_empty_list(resolved.data.get("similar_games")) {
            return json!({
                "found": true,
                "based_on": based_on,
                "recommendations": games,
            });
        }

        let descriptor = format!("games for {based_on} players");
        if let Some(Generated::Structured(data)) = self
            .resolver
            .generative()
            .fetch(&descriptor, QueryKind::Recommendations)
            .await
        {
            if let Some(games) = non_empty_list(data.get("similar_games")) {
                return json!({
                    "found": true,
                    "based_on": based_on,
                    "recommendations": games,
                });
            }
        }

        json!({
            "found": false,
            "message": format!("Couldn't generate recommendations for '{based_on}'"),
        })
    }

    /// Fetch general data for both games; each side fails independently.
    async fn compare_games(&self, game1: &str, game2: &str) -> serde_json::Value {
        let mut comparison = serde_json::Map::new();
        for game in [game1, game2] {
            let resolved = self.resolver.resolve(game, QueryKind::General).await;
            let side = if resolved.found() && !resolved.data.contains_key("error") {
                let mut data = resolved.data;
                data.insert("found".into(), true.into());
                serde_json::Value::Object(data)
            } else {
                json!({ "found": false, "error": format!("Could not fetch data for {game}") })
            };
            comparison.insert(game.to_string(), side);
        }

        json!({ "found": true, "comparison": comparison })
    }
}

fn require(tool: &str, param: &str, value: &str) -> Result<(), ToolError> {
    if value.is_empty() {
        return Err(ToolError::InvalidArguments(format!(
            "{tool} requires a non-empty '{param}'"
        )));
    }
    Ok(())
}

fn non_empty_list(value: Option<&serde_json::Value>) -> Option<&serde_json::Value> {
    value.filter(|v| v.as_array().is_some_and(|a| !a.is_empty()))
}

fn player_profile(profile: Option<&PlayerProfile>) -> serde_json::Value {
    let Some(p) = profile else {
        return json!({ "found": false, "message": "No user profile available" });
    };

    json!({
        "found": true,
        "username": p.username,
        "favorite_games": p.favorite_games,
        "skill_levels": p.skill_levels,
        "ranks": p.ranks,
        "main_roles": p.main_roles,
        "playstyle": p.playstyle,
        "goals": p.goals,
        "platforms": p.platforms,
    })
}
