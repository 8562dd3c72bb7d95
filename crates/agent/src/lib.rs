//! # Nexus Agent
//!
//! The ReAct loop that turns a player's message into a coached reply.
//!
//! - [`protocol`]: tolerant parser for the THOUGHT / ACTION / FINAL_ANSWER format
//! - [`sanitize`]: strips leaked protocol text and extracts the [`Mood`]
//! - [`trace`]: the per-run reasoning trace
//! - [`prompt`]: system instructions and the profile block
//! - [`react`]: the loop controller, [`ReactAgent`]
//! - [`insight`]: background profile evolution

pub mod insight;
pub mod prompt;
pub mod protocol;
pub mod react;
pub mod sanitize;
pub mod trace;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use insight::{Insights, ProfileInsights};
pub use protocol::{Step, parse_step};
pub use react::{AgentError, AgentResult, Outcome, ReactAgent};
pub use sanitize::{Mood, extract_mood, sanitize};
pub use trace::{ReasoningTrace, TraceEntry, TraceKind};
