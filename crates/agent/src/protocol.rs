//! Line-oriented parser for the textual ReAct protocol.
//!
//! The model is asked to answer in this shape:
//!
//! ```text
//! THOUGHT: what the user needs
//! ACTION: search_game_info
//! ACTION_INPUT: {"game": "Valorant", "query_type": "meta"}
//! ```
//!
//! or, once it has enough data:
//!
//! ```text
//! FINAL_ANSWER:
//! [MOOD:excited]
//! Jett is still a top pick on Ascent...
//! ```
//!
//! Models drift from the format constantly, so the parser is tolerant:
//! every field is optional and nothing here can fail.

use nexus_core::tool::ToolInvocation;
use serde_json::{Map, Value};

pub const THOUGHT: &str = "THOUGHT:";
pub const ACTION: &str = "ACTION:";
pub const ACTION_INPUT: &str = "ACTION_INPUT:";
pub const FINAL_ANSWER: &str = "FINAL_ANSWER:";
pub const OBSERVATION: &str = "OBSERVATION:";

/// Markers that end a multi-line `ACTION_INPUT` block.
const INPUT_TERMINATORS: [&str; 3] = [THOUGHT, ACTION, FINAL_ANSWER];

/// One parsed model turn.
///
/// Both `action` and `final_answer` may be set when the model emits both
/// markers; callers check `final_answer` first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    pub thought: Option<String>,
    pub action: Option<ToolInvocation>,
    pub final_answer: Option<String>,
}

impl Step {
    /// No recognized marker produced anything.
    pub fn is_empty(&self) -> bool {
        self.thought.is_none() && self.action.is_none() && self.final_answer.is_none()
    }
}

/// Parse a single model turn.
pub fn parse_step(text: &str) -> Step {
    let lines: Vec<&str> = text.trim().lines().collect();

    let mut thought = None;
    let mut tool_name: Option<String> = None;
    let mut arguments: Option<Map<String, Value>> = None;
    let mut final_answer = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();

        if let Some(rest) = line.strip_prefix(THOUGHT) {
            thought = Some(rest.trim().to_string()).filter(|t| !t.is_empty());
        } else if let Some(rest) = line.strip_prefix(ACTION_INPUT) {
            let mut raw = vec![rest.trim()];
            while let Some(next) = lines.get(i + 1).map(|l| l.trim()) {
                if INPUT_TERMINATORS.iter().any(|m| next.starts_with(m)) {
                    break;
                }
                raw.push(next);
                i += 1;
            }
            arguments = Some(parse_arguments(raw.join("\n").trim()));
        } else if let Some(rest) = line.strip_prefix(ACTION) {
            tool_name = Some(rest.trim().to_string()).filter(|n| !n.is_empty());
        } else if let Some(rest) = line.strip_prefix(FINAL_ANSWER) {
            // Everything after the marker belongs to the answer, markers included.
            let mut answer = vec![rest.trim()];
            answer.extend(lines[i + 1..].iter().copied());
            let answer = answer.join("\n").trim().to_string();
            final_answer = Some(answer).filter(|a| !a.is_empty());
            break;
        }

        i += 1;
    }

    Step {
        thought,
        action: tool_name.map(|name| ToolInvocation::new(name, arguments.unwrap_or_default())),
        final_answer,
    }
}

/// Best-effort argument decoding: whole text, then the outermost braces,
/// then `{"raw": text}`.
pub fn parse_arguments(raw: &str) -> Map<String, Value> {
    if let Some(map) = as_object(raw) {
        return map;
    }

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Some(map) = as_object(&raw[start..=end]) {
                return map;
            }
        }
    }

    let mut fallback = Map::new();
    fallback.insert("raw".into(), Value::String(raw.to_string()));
    fallback
}

fn as_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn thought_only() {
        let step = parse_step("THOUGHT: they want a Valorant tier list");
        assert_eq!(step.thought.as_deref(), Some("they want a Valorant tier list"));
        assert!(step.action.is_none());
        assert!(step.final_answer.is_none());
    }

    #[test]
    fn tool_call_with_single_line_input() {
        let step = parse_step(
            "THOUGHT: need meta data\nACTION: search_game_info\nACTION_INPUT: {\"game\": \"Valorant\", \"query_type\": \"meta\"}",
        );
        let action = step.action.unwrap();
        assert_eq!(action.name, "search_game_info");
        assert_eq!(action.arguments["game"], "Valorant");
        assert_eq!(action.arguments["query_type"], "meta");
        assert!(step.final_answer.is_none());
    }

    #[test]
    fn tool_input_spans_lines() {
        let text = "ACTION: compare_games\nACTION_INPUT: {\n  \"game1\": \"Dota 2\",\n  \"game2\": \"League of Legends\"\n}\nTHOUGHT: compare them";
        let step = parse_step(text);
        let action = step.action.unwrap();
        assert_eq!(action.arguments["game1"], "Dota 2");
        assert_eq!(action.arguments["game2"], "League of Legends");
        assert_eq!(step.thought.as_deref(), Some("compare them"));
    }

    #[test]
    fn input_with_trailing_prose_extracts_braces() {
        let args = parse_arguments(r#"here you go {"game": "Hades"} thanks"#);
        assert_eq!(args["game"], "Hades");
    }

    #[test]
    fn unparseable_input_kept_as_raw() {
        let args = parse_arguments("{game: Hades");
        assert_eq!(json!(args), json!({"raw": "{game: Hades"}));
    }

    #[test]
    fn non_object_json_kept_as_raw() {
        let args = parse_arguments("[1, 2]");
        assert_eq!(args["raw"], "[1, 2]");
    }

    #[test]
    fn action_without_input_has_empty_arguments() {
        let step = parse_step("ACTION: get_player_profile");
        let action = step.action.unwrap();
        assert_eq!(action.name, "get_player_profile");
        assert!(action.arguments.is_empty());
    }

    #[test]
    fn final_answer_runs_to_end_of_turn() {
        let step = parse_step("THOUGHT: done\nFINAL_ANSWER:\n[MOOD:happy]\nFirst line.\nACTION: not a tool\nLast line.");
        assert_eq!(
            step.final_answer.as_deref(),
            Some("[MOOD:happy]\nFirst line.\nACTION: not a tool\nLast line.")
        );
        assert!(step.action.is_none());
    }

    #[test]
    fn final_answer_on_marker_line() {
        let step = parse_step("FINAL_ANSWER: [MOOD:playful] I stick to games!");
        assert_eq!(step.final_answer.as_deref(), Some("[MOOD:playful] I stick to games!"));
    }

    #[test]
    fn empty_final_answer_is_absent() {
        let step = parse_step("FINAL_ANSWER:\n   \n");
        assert!(step.final_answer.is_none());
    }

    #[test]
    fn both_markers_populate_both_fields() {
        let step = parse_step(
            "ACTION: search_game_info\nACTION_INPUT: {\"game\": \"Apex Legends\"}\nFINAL_ANSWER:\nWraith is great.",
        );
        assert!(step.action.is_some());
        assert_eq!(step.final_answer.as_deref(), Some("Wraith is great."));
    }

    #[test]
    fn markers_are_case_sensitive() {
        let step = parse_step("thought: lowercase\naction: search_game_info");
        assert!(step.is_empty());
    }

    #[test]
    fn plain_prose_has_no_fields() {
        assert!(parse_step("Honestly, just play what you enjoy.").is_empty());
    }

    #[test]
    fn never_panics_on_odd_input() {
        for input in [
            "",
            "\n\n",
            "ACTION_INPUT:",
            "ACTION_INPUT: }{",
            "ACTION: \nACTION_INPUT: {{{",
            "FINAL_ANSWER:",
            "THOUGHT:",
            "}{ ACTION",
            "ACTION_INPUT: {\"a\": \"ü\"",
        ] {
            let _ = parse_step(input);
        }
    }
}
