//! # Nexus Core
//!
//! Domain types, collaborator traits, and error definitions for the Nexus
//! gaming coach agent. This crate carries **no backend implementations**:
//! model services, cache stores, history and profile stores are all traits
//! here, implemented in their respective crates.
//!
//! ## Design Philosophy
//!
//! The agent loop and the data resolution chain only ever see the traits
//! defined here. This enables:
//! - Swapping the model service or storage engine via configuration
//! - Scripted mock collaborators in tests
//! - Clean dependency graph (all crates depend inward on core)

pub mod cache;
pub mod error;
pub mod history;
pub mod message;
pub mod profile;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use cache::{CacheEntry, CacheStore};
pub use error::{Error, ProviderError, Result, StoreError, ToolError};
pub use history::{HistoryStore, HistoryTurn};
pub use message::{Message, Role};
pub use profile::{PlayerProfile, ProfileStore};
pub use provider::{GenerateRequest, Provider};
pub use tool::{ToolDefinition, ToolInvocation};
