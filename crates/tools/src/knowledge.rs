//! Static knowledge tables, the last-resort data layer.
//!
//! Two files in the knowledge directory:
//! - `games.json`: normalized game key → arbitrary game object
//! - `recommendations.json`: `{"if_you_like": {"<Game>": ["<Game>", ...]}}`
//!
//! Missing or malformed files leave the corresponding table empty.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Normalize a subject into a key segment: lowercase, spaces → `_`.
pub fn normalize_key(subject: &str) -> String {
    subject.trim().to_lowercase().replace(' ', "_")
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationsFile {
    #[serde(default)]
    if_you_like: HashMap<String, Vec<String>>,
}

/// In-memory copy of the static knowledge files.
#[derive(Debug, Default)]
pub struct StaticKnowledge {
    games: serde_json::Map<String, serde_json::Value>,
    if_you_like: HashMap<String, Vec<String>>,
}

impl StaticKnowledge {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load both tables from `dir`.
    pub fn load(dir: &Path) -> Self {
        let games = read_json::<serde_json::Map<String, serde_json::Value>>(&dir.join("games.json"))
            .unwrap_or_default();
        let recs = read_json::<RecommendationsFile>(&dir.join("recommendations.json"))
            .unwrap_or_default();

        debug!(
            games = games.len(),
            recommendations = recs.if_you_like.len(),
            "Static knowledge loaded"
        );

        Self {
            games,
            if_you_like: recs
                .if_you_like
                .into_iter()
                .map(|(name, similar)| (name.to_lowercase(), similar))
                .collect(),
        }
    }

    pub fn with_game(mut self, key: impl Into<String>, data: serde_json::Value) -> Self {
        self.games.insert(key.into(), data);
        self
    }

    pub fn with_similar(mut self, game: &str, similar: Vec<String>) -> Self {
        self.if_you_like.insert(game.to_lowercase(), similar);
        self
    }

    /// Static entry for a game, looked up by its normalized key.
    pub fn game(&self, subject: &str) -> Option<&serde_json::Value> {
        self.games.get(&normalize_key(subject))
    }

    /// Static "if you like X" list (case-insensitive on X).
    pub fn similar_to(&self, game: &str) -> Option<&[String]> {
        self.if_you_like
            .get(&game.trim().to_lowercase())
            .map(Vec::as_slice)
            .filter(|list| !list.is_empty())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Knowledge file not readable");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed knowledge file ignored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_underscores() {
        assert_eq!(normalize_key("League of Legends"), "league_of_legends");
        assert_eq!(normalize_key("  Elden Ring "), "elden_ring");
    }

    #[test]
    fn load_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("games.json"),
            r#"{"hollow_knight": {"developer": "Team Cherry"}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("recommendations.json"),
            r#"{"if_you_like": {"Hollow Knight": ["Celeste", "Ori"]}}"#,
        )
        .unwrap();

        let kb = StaticKnowledge::load(dir.path());
        assert_eq!(kb.game("Hollow Knight").unwrap()["developer"], "Team Cherry");
        assert_eq!(kb.similar_to("hollow knight").unwrap(), ["Celeste", "Ori"]);
    }

    #[test]
    fn missing_dir_is_empty() {
        let kb = StaticKnowledge::load(Path::new("/nonexistent/knowledge"));
        assert!(kb.game("anything").is_none());
        assert!(kb.similar_to("anything").is_none());
    }

    #[test]
    fn malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("games.json"), "{not json").unwrap();
        let kb = StaticKnowledge::load(dir.path());
        assert!(kb.game("hollow_knight").is_none());
    }

    #[test]
    fn empty_similar_list_is_absent() {
        let kb = StaticKnowledge::empty().with_similar("Tetris", vec![]);
        assert!(kb.similar_to("Tetris").is_none());
    }
}
