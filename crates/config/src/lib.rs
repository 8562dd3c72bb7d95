//! Configuration loading, validation, and management for Nexus.
//!
//! Loads configuration from `~/.nexus/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.nexus/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model service API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible model endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for the agent loop and the generative fallback
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for agent steps
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per agent step
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// TTL cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// External data source settings
    #[serde(default)]
    pub data: DataConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Background profile insight settings
    #[serde(default)]
    pub insights: InsightsConfig,
}

fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    600
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("cache", &self.cache)
            .field("data", &self.data)
            .field("gateway", &self.gateway)
            .field("insights", &self.insights)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name the agent introduces itself with
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Maximum reasoning/tool steps per request
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Character ceiling for an observation fed back to the model
    #[serde(default = "default_observation_limit")]
    pub observation_limit: usize,

    /// Character ceiling for an observation recorded in the trace
    #[serde(default = "default_trace_observation_limit")]
    pub trace_observation_limit: usize,

    /// Timeout applied to every model call made by the loop
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    /// Max tokens for the last-resort direct answer
    #[serde(default = "default_fallback_max_tokens")]
    pub fallback_max_tokens: u32,
}

fn default_agent_name() -> String {
    "Nexus".into()
}
fn default_max_steps() -> u32 {
    4
}
fn default_observation_limit() -> usize {
    3000
}
fn default_trace_observation_limit() -> usize {
    300
}
fn default_model_timeout_secs() -> u64 {
    30
}
fn default_fallback_max_tokens() -> u32 {
    300
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_steps: default_max_steps(),
            observation_limit: default_observation_limit(),
            trace_observation_limit: default_trace_observation_limit(),
            model_timeout_secs: default_model_timeout_secs(),
            fallback_max_tokens: default_fallback_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// "memory" or "sqlite"
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// SQLite database path (sqlite backend only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
}

fn default_cache_backend() -> String {
    "sqlite".into()
}
fn default_ttl_hours() -> i64 {
    24
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            path: None,
            ttl_hours: default_ttl_hours(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Riot Games API key; the League source is skipped without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub riot_api_key: Option<String>,

    /// Directory holding `games.json` and `recommendations.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_dir: Option<String>,

    /// JSON map of user id → player profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_path: Option<String>,

    /// Timeout for authoritative API lookups
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_generative_temperature")]
    pub generative_temperature: f32,

    #[serde(default = "default_generative_max_tokens")]
    pub generative_max_tokens: u32,
}

fn default_request_timeout_secs() -> u64 {
    5
}
fn default_generative_temperature() -> f32 {
    0.3
}
fn default_generative_max_tokens() -> u32 {
    800
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            riot_api_key: None,
            knowledge_dir: None,
            profiles_path: None,
            request_timeout_secs: default_request_timeout_secs(),
            generative_temperature: default_generative_temperature(),
            generative_max_tokens: default_generative_max_tokens(),
        }
    }
}

impl std::fmt::Debug for DataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataConfig")
            .field("riot_api_key", &redact(&self.riot_api_key))
            .field("knowledge_dir", &self.knowledge_dir)
            .field("profiles_path", &self.profiles_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("generative_temperature", &self.generative_temperature)
            .field("generative_max_tokens", &self.generative_max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Minimum seconds between two chat requests from the same caller
    #[serde(default = "default_min_request_interval_secs")]
    pub min_request_interval_secs: u64,

    /// Prior turns loaded from history per request
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_min_request_interval_secs() -> u64 {
    2
}
fn default_history_limit() -> usize {
    20
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            min_request_interval_secs: default_min_request_interval_secs(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Conversation turns required before insights are derived
    #[serde(default = "default_min_messages")]
    pub min_messages: usize,
}

fn default_min_messages() -> usize {
    4
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_messages: default_min_messages(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.nexus/config.toml).
    ///
    /// Environment overrides:
    /// - `NEXUS_API_KEY`, then `GEMINI_API_KEY`
    /// - `NEXUS_API_URL`, `NEXUS_MODEL`
    /// - `RIOT_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("NEXUS_API_KEY")
                .ok()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok());
        }
        if let Ok(url) = std::env::var("NEXUS_API_URL") {
            self.api_url = url;
        }
        if let Ok(model) = std::env::var("NEXUS_MODEL") {
            self.model = model;
        }
        if self.data.riot_api_key.is_none() {
            self.data.riot_api_key = std::env::var("RIOT_API_KEY").ok();
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".nexus")
    }

    /// SQLite cache path, defaulting to `~/.nexus/cache.db`.
    pub fn cache_path(&self) -> PathBuf {
        self.cache
            .path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("cache.db"))
    }

    /// Knowledge directory, defaulting to `~/.nexus/knowledge`.
    pub fn knowledge_dir(&self) -> PathBuf {
        self.data
            .knowledge_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("knowledge"))
    }

    /// Player profiles file, defaulting to `~/.nexus/profiles.json`.
    pub fn profiles_path(&self) -> PathBuf {
        self.data
            .profiles_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("profiles.json"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.cache.ttl_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_hours must be > 0".into(),
            ));
        }

        if !matches!(self.cache.backend.as_str(), "memory" | "sqlite") {
            return Err(ConfigError::ValidationError(format!(
                "unknown cache backend '{}'",
                self.cache.backend
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            cache: CacheConfig::default(),
            data: DataConfig::default(),
            gateway: GatewayConfig::default(),
            insights: InsightsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
