//! Tool invocation types shared by the protocol parser and the dispatcher.

use serde::{Deserialize, Serialize};

/// A parsed request to run a tool.
///
/// `name` is whatever the model wrote; it is only validated at the
/// dispatch boundary, where unknown names become an error observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON object
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// String argument lookup; missing or non-string values read as "".
    pub fn arg_str(&self, key: &str) -> &str {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// Compact label recorded in the trace and in `tools_used`.
    pub fn label(&self) -> String {
        let args = serde_json::Value::Object(self.arguments.clone());
        format!("{}({})", self.name, args)
    }
}

/// A tool description exposed to the model inside its system instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// Declared parameters: (name, description)
    pub parameters: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_str_defaults_to_empty() {
        let mut args = serde_json::Map::new();
        args.insert("game".into(), serde_json::json!("Valorant"));
        args.insert("count".into(), serde_json::json!(3));
        let inv = ToolInvocation::new("search_game_info", args);
        assert_eq!(inv.arg_str("game"), "Valorant");
        assert_eq!(inv.arg_str("count"), "");
        assert_eq!(inv.arg_str("missing"), "");
    }

    #[test]
    fn label_includes_arguments() {
        let mut args = serde_json::Map::new();
        args.insert("game".into(), serde_json::json!("Elden Ring"));
        let inv = ToolInvocation::new("search_game_info", args);
        assert_eq!(inv.label(), r#"search_game_info({"game":"Elden Ring"})"#);
    }
}
