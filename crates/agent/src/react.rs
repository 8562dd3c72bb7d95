//! ReAct pattern: Thought → Action → Observation loop.
//!
//! Each step sends the running message list to the model, parses the
//! reply with [`parse_step`], and either finishes (final answer or plain
//! text) or dispatches one tool and feeds the result back as an
//! observation turn. The loop is capped at `max_steps`; when the cap is
//! reached, or the model produces nothing usable, a direct unstructured
//! call supplies the answer instead.
//!
//! # Terminal states
//!
//! - [`Outcome::Final`]: the model emitted `FINAL_ANSWER:`
//! - [`Outcome::RawText`]: the model ignored the protocol
//! - [`Outcome::MaxStepsFallback`]: the step budget ran out
//! - `Err(AgentError)`: a model call failed; nothing is retried

use nexus_config::AppConfig;
use nexus_core::error::ProviderError;
use nexus_core::message::Message;
use nexus_core::profile::PlayerProfile;
use nexus_core::provider::{GenerateRequest, Provider};
use nexus_tools::{ToolContext, ToolRegistry};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::prompt;
use crate::protocol::parse_step;
use crate::sanitize::{Mood, extract_mood, sanitize, split_mood};
use crate::trace::{ReasoningTrace, TraceKind, clip_observation, preview};

/// Sanitized plain-text replies shorter than this are not real answers.
const MIN_RAW_ANSWER_CHARS: usize = 5;

/// Answers are previewed in the trace at this length.
const ANSWER_PREVIEW_CHARS: usize = 100;

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Final,
    RawText,
    MaxStepsFallback,
}

/// The result of one agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    /// Sanitized reply shown to the user.
    pub response: String,
    pub mood: Mood,
    /// Complete reasoning trace.
    #[serde(rename = "reasoning_trace")]
    pub trace: ReasoningTrace,
    /// `name(args)` label for every tool call made.
    pub tools_used: Vec<String>,
    #[serde(skip)]
    pub outcome: Outcome,
}

/// A model call failed mid-loop.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Model call failed at step {step}: {source}")]
    Model {
        step: u32,
        #[source]
        source: ProviderError,
    },
}

impl AgentError {
    pub fn provider_error(&self) -> &ProviderError {
        match self {
            Self::Model { source, .. } => source,
        }
    }

    /// The model service is throttling us; the caller should retry shortly.
    pub fn is_busy(&self) -> bool {
        self.provider_error().is_rate_limited()
    }
}

impl From<AgentError> for nexus_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Model { source, .. } => nexus_core::Error::Provider(source),
        }
    }
}

/// Configuration for the ReAct agent.
pub struct ReactAgent {
    /// LLM provider.
    provider: Arc<dyn Provider>,
    /// Model name.
    model: String,
    /// Tool dispatcher.
    tools: Arc<ToolRegistry>,
    /// Name the agent introduces itself with.
    name: String,
    temperature: f32,
    max_tokens: u32,
    /// Maximum reasoning steps before the direct fallback.
    max_steps: u32,
    /// Observation size fed back to the model, in characters.
    observation_limit: usize,
    /// Observation size kept in the trace, in characters.
    trace_observation_limit: usize,
    fallback_max_tokens: u32,
    /// Upper bound on any single model call.
    model_timeout: Duration,
}

impl ReactAgent {
    /// Create a new ReAct agent with default limits.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            tools,
            name: "Nexus".into(),
            temperature: 0.7,
            max_tokens: 600,
            max_steps: 4,
            observation_limit: 3000,
            trace_observation_limit: 300,
            fallback_max_tokens: 300,
            model_timeout: Duration::from_secs(30),
        }
    }

    /// Create an agent using the `[agent]` section and sampling settings of `config`.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, &config.model, tools)
            .with_name(&config.agent.name)
            .with_sampling(config.temperature, config.max_tokens)
            .with_max_steps(config.agent.max_steps)
            .with_observation_limits(
                config.agent.observation_limit,
                config.agent.trace_observation_limit,
            )
            .with_fallback_max_tokens(config.agent.fallback_max_tokens)
            .with_model_timeout(Duration::from_secs(config.agent.model_timeout_secs))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Set max steps.
    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_observation_limits(mut self, observation: usize, trace: usize) -> Self {
        self.observation_limit = observation;
        self.trace_observation_limit = trace;
        self
    }

    pub fn with_fallback_max_tokens(mut self, max: u32) -> Self {
        self.fallback_max_tokens = max;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Execute the ReAct loop.
    ///
    /// `history` is the prior conversation, oldest first. `username` is the
    /// account name the agent addresses the player by.
    pub async fn run(
        &self,
        user_message: &str,
        history: &[Message],
        profile: Option<&PlayerProfile>,
        username: &str,
    ) -> Result<AgentResult, AgentError> {
        let system = prompt::system_instruction(
            &self.name,
            &self.tools.definitions(),
            &prompt::profile_block(profile, username),
        );
        let ctx = ToolContext::with_profile(profile.cloned());

        let mut messages: Vec<Message> = history.to_vec();
        messages.push(Message::user(user_message));
        let mut trace = ReasoningTrace::new();

        info!(model = %self.model, max_steps = self.max_steps, "ReAct loop starting");

        for step in 1..=self.max_steps {
            debug!(step, "ReAct step");

            let request = GenerateRequest::new(&self.model, messages.clone())
                .with_system(&system)
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens);
            let reply = self
                .generate(request)
                .await
                .map_err(|source| AgentError::Model { step, source })?;

            let parsed = parse_step(&reply);

            if let Some(thought) = &parsed.thought {
                trace.record(TraceKind::Thought, thought.as_str());
            }

            // A final answer wins over a tool call in the same turn.
            if let Some(answer) = &parsed.final_answer {
                let (mood, body) = split_mood(answer);
                let mut response = sanitize(body);
                if response.is_empty() {
                    debug!(step, "Final answer was empty after cleanup, asking directly");
                    response = self.direct_answer(messages, username).await;
                }
                trace.record(TraceKind::Answer, preview(&response, ANSWER_PREVIEW_CHARS));
                info!(step, tools = trace.count(TraceKind::ToolCall), "ReAct loop finished");
                return Ok(finish(response, mood.unwrap_or_default(), trace, Outcome::Final));
            }

            if let Some(invocation) = &parsed.action {
                trace.record(TraceKind::ToolCall, invocation.label());
                debug!(tool = %invocation.name, "ReAct tool call");

                let result = self.tools.dispatch(invocation, &ctx).await;
                let rendered = serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
                let observation = clip_observation(rendered, self.observation_limit);
                trace.record(
                    TraceKind::Observation,
                    preview(&observation, self.trace_observation_limit),
                );

                messages.push(Message::model(reply.as_str()));
                messages.push(Message::user(prompt::observation_turn(&observation)));
                continue;
            }

            // No protocol at all: treat the whole turn as the answer.
            let mood = extract_mood(&reply).unwrap_or_default();
            let mut response = sanitize(&reply);
            if response.chars().count() < MIN_RAW_ANSWER_CHARS {
                debug!(step, "Plain reply too short, asking directly");
                response = self.direct_answer(messages, username).await;
            }
            info!(step, "ReAct loop finished with plain text");
            return Ok(finish(response, mood, trace, Outcome::RawText));
        }

        warn!("ReAct: max steps reached ({})", self.max_steps);
        let mut original = history.to_vec();
        original.push(Message::user(user_message));
        let response = self.direct_answer(original, username).await;
        Ok(finish(response, Mood::Happy, trace, Outcome::MaxStepsFallback))
    }

    /// Unstructured last-resort call, cleaned like any other answer. Never fails.
    async fn direct_answer(&self, messages: Vec<Message>, username: &str) -> String {
        let request = GenerateRequest::new(&self.model, messages)
            .with_system(prompt::fallback_instruction(&self.name, username))
            .with_temperature(self.temperature)
            .with_max_tokens(self.fallback_max_tokens);

        match self.generate(request).await {
            Ok(text) => {
                let (_, body) = split_mood(text.trim_start());
                let cleaned = sanitize(body);
                if cleaned.is_empty() {
                    prompt::rephrase_reply(username)
                } else {
                    cleaned
                }
            }
            Err(e) => {
                warn!(error = %e, "Direct fallback call failed");
                prompt::rephrase_reply(username)
            }
        }
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError> {
        match tokio::time::timeout(self.model_timeout, self.provider.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "no model reply within {}s",
                self.model_timeout.as_secs()
            ))),
        }
    }
}

fn finish(response: String, mood: Mood, trace: ReasoningTrace, outcome: Outcome) -> AgentResult {
    AgentResult {
        response,
        mood,
        tools_used: trace.tool_calls(),
        trace,
        outcome,
    }
}
