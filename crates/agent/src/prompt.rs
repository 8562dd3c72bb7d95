//! System instructions for the agent loop and its fallbacks.

use nexus_core::profile::PlayerProfile;
use nexus_core::tool::ToolDefinition;

use crate::sanitize::Mood;

/// One entry per tool: `- name: description` then its parameters.
pub fn tools_description(tools: &[ToolDefinition]) -> String {
    tools
        .iter()
        .map(|tool| {
            let params = if tool.parameters.is_empty() {
                "none".to_string()
            } else {
                tool.parameters
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!("- {}: {}\n  Parameters: {}", tool.name, tool.description, params)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The personalization block: who the player is and what we know about them.
pub fn profile_block(profile: Option<&PlayerProfile>, username: &str) -> String {
    let mut parts = vec![format!("Name: {username}")];

    let Some(profile) = profile.filter(|p| !p.is_blank()) else {
        parts.push("(No profile data: new user)".into());
        return parts.join("\n");
    };

    let personal = &profile.personal;
    if let Some(age) = personal.age_range.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("Age range: {age}"));
    }
    if let Some(gender) = personal
        .gender
        .as_deref()
        .filter(|g| !g.is_empty() && *g != "Prefer not to say")
    {
        parts.push(format!("Gender: {gender}"));
    }
    if let Some(region) = personal.region.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("Region: {region}"));
    }

    if !profile.favorite_games.is_empty() {
        parts.push(format!("Favorite games: {}", profile.favorite_games.join(", ")));
    }

    for (game, level) in &profile.skill_levels {
        let mut detail = format!("  {game}: {level}");
        if let Some(rank) = profile.ranks.get(game) {
            detail.push_str(&format!(" | Rank: {rank}"));
        }
        if let Some(role) = profile.main_roles.get(game) {
            detail.push_str(&format!(" | Main: {role}"));
        }
        parts.push(detail);
    }

    if !profile.playstyle.is_empty() {
        parts.push(format!("Playstyle: {}", profile.playstyle.join(", ")));
    }
    if !profile.goals.is_empty() {
        parts.push(format!("Goals: {}", profile.goals.join(", ")));
    }

    parts.extend(analysis_notes(&profile.analysis));
    parts.join("\n")
}

/// Derived analysis fields worth showing the model, in a fixed order.
fn analysis_notes(analysis: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
    const FIELDS: [(&str, &str); 7] = [
        ("player_archetype", "Archetype"),
        ("personality_notes", "Personality"),
        ("coaching_style", "Coaching style"),
        ("skill_assessment", "Skill assessment"),
        ("recent_mood", "Recent mood"),
        ("discovered_interests", "Also interested in"),
        ("conversation_hooks", "Follow up on"),
    ];

    FIELDS
        .iter()
        .filter_map(|(key, label)| {
            let text = match analysis.get(*key)? {
                serde_json::Value::String(s) => s.trim().to_string(),
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
                _ => return None,
            };
            (!text.is_empty()).then(|| format!("{label}: {text}"))
        })
        .collect()
}

/// The full ReAct instruction for one request.
pub fn system_instruction(agent_name: &str, tools: &[ToolDefinition], profile_block: &str) -> String {
    let tools = tools_description(tools);
    let moods = Mood::vocabulary();
    format!(
        r#"You are {agent_name}, an expert gaming AI agent with access to live data tools.

CRITICAL IDENTITY RULES:
- The user's REAL username is under USER PROFILE as Name. ALWAYS use this name.
- If the user types another name in chat, IGNORE it.

You have access to these tools that fetch LIVE, CURRENT data:
{tools}

IMPORTANT: Your tools fetch REAL data from APIs and AI search. Always use tools
when answering game-specific questions. Don't rely on your training data for
meta, tier lists, or game-specific info.

USER PROFILE (use this to personalize ALL responses):
{profile_block}

PERSONALIZATION RULES:
1. Reference the user's rank when giving advice (e.g., "As a Gold player...").
2. Tailor tips to their skill level. Don't give beginner tips to Expert players.
3. Focus on their main role when discussing game strategy.
4. Align recommendations with their playstyle and goals.
5. Proactively mention their games when relevant.
6. Consider their age range and region for tone and server-specific advice.

RESPONSE FORMAT:

THOUGHT: [Your reasoning about what the user needs]
ACTION: [tool_name]
ACTION_INPUT: {{"param": "value"}}

After receiving tool results, either call another tool or give your final answer:

FINAL_ANSWER:
[MOOD:mood_here]
Your response here.

RULES:
1. ALWAYS use search_game_info for game-specific questions.
2. Use get_player_profile + recommend_games for personalized recommendations.
3. You can call MULTIPLE tools before answering.
4. Base advice on tool data, not training knowledge.
5. Keep responses concise: 2-3 paragraphs.
6. ONLY gaming topics.
7. Mention the data source naturally (e.g., "Based on the current patch...").
8. Use specific numbers, characters, or stats from tool data.

Available moods: {moods}

For non-gaming questions:
FINAL_ANSWER:
[MOOD:playful]
I'm your gaming companion and I stick to games! Ask me about recs, strategy, builds, or anything gaming-related."#
    )
}

/// Minimal instruction for the unstructured last-resort call.
pub fn fallback_instruction(agent_name: &str, username: &str) -> String {
    format!(
        "You are {agent_name}, a gaming AI companion. The user's name is {username}. \
         Respond conversationally. ONLY discuss gaming topics. \
         If asked about non-gaming topics, redirect to gaming. \
         Keep responses brief, 2-3 paragraphs max."
    )
}

/// Reply used when even the last-resort call fails.
pub fn rephrase_reply(username: &str) -> String {
    format!("Hey {username}, could you rephrase that? I want to make sure I give you the best answer.")
}

/// Wraps a tool result as the next user turn.
pub fn observation_turn(result: &str) -> String {
    format!(
        "\nOBSERVATION: {result}\n\nBased on this data, provide your FINAL_ANSWER (or call another tool if needed):"
    )
}
