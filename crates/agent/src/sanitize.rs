//! Cleans user-facing text and extracts the avatar mood.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::protocol::{ACTION, ACTION_INPUT, FINAL_ANSWER, OBSERVATION, THOUGHT};

/// Leaked lines shorter than this that look like `{...}` are tool arguments.
const LEAKED_OBJECT_MAX_LEN: usize = 100;

static LEADING_MOOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[MOOD:(\w+)\]\s*").expect("leading mood pattern"));

static ANY_MOOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[MOOD:\w+\]\s*").expect("mood tag pattern"));

/// The avatar expression that accompanies a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Empathy,
    Excited,
    Thinking,
    Curious,
    Proud,
    Frustrated,
    #[default]
    Idle,
    Playful,
    Intense,
    Supportive,
    Impressed,
}

impl Mood {
    pub const ALL: [Mood; 12] = [
        Mood::Happy,
        Mood::Empathy,
        Mood::Excited,
        Mood::Thinking,
        Mood::Curious,
        Mood::Proud,
        Mood::Frustrated,
        Mood::Idle,
        Mood::Playful,
        Mood::Intense,
        Mood::Supportive,
        Mood::Impressed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Empathy => "empathy",
            Mood::Excited => "excited",
            Mood::Thinking => "thinking",
            Mood::Curious => "curious",
            Mood::Proud => "proud",
            Mood::Frustrated => "frustrated",
            Mood::Idle => "idle",
            Mood::Playful => "playful",
            Mood::Intense => "intense",
            Mood::Supportive => "supportive",
            Mood::Impressed => "impressed",
        }
    }

    /// Case-insensitive lookup; names outside the vocabulary are `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Comma-separated vocabulary for prompts.
    pub fn vocabulary() -> String {
        Self::ALL.map(Mood::as_str).join(", ")
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a leading `[MOOD:x]` tag off `text`.
///
/// Returns the mood (if the tag names a known one) and the remainder.
/// An unknown tag is still removed.
pub fn split_mood(text: &str) -> (Option<Mood>, &str) {
    match LEADING_MOOD.captures(text) {
        Some(caps) => {
            let mood = caps.get(1).and_then(|m| Mood::from_name(m.as_str()));
            let end = caps.get(0).map_or(0, |m| m.end());
            (mood, text[end..].trim())
        }
        None => (None, text),
    }
}

/// Mood from a leading tag, ignoring leading whitespace.
pub fn extract_mood(text: &str) -> Option<Mood> {
    split_mood(text.trim_start()).0
}

/// Remove protocol lines, leaked argument objects and mood tags.
pub fn sanitize(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            let marker = [THOUGHT, ACTION, ACTION_INPUT, FINAL_ANSWER, OBSERVATION]
                .iter()
                .any(|m| trimmed.starts_with(m));
            let leaked_object = trimmed.starts_with('{')
                && trimmed.ends_with('}')
                && trimmed.chars().count() < LEAKED_OBJECT_MAX_LEN;
            !marker && !leaked_object
        })
        .collect();

    let joined = kept.join("\n");
    ANY_MOOD.replace_all(joined.trim(), "").trim().to_string()
}
