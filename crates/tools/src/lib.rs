//! Game data tools for Nexus.
//!
//! The agent reaches external data only through these tools. Every
//! externally grounded claim flows through the `DataResolver` chain:
//! cache, authoritative APIs, the generative fallback, then static
//! knowledge files.

pub mod generative;
pub mod knowledge;
pub mod registry;
pub mod resolver;
pub mod sources;

pub use generative::{Generated, GenerativeFetcher};
pub use knowledge::StaticKnowledge;
pub use registry::{GameTool, ToolContext, ToolRegistry};
pub use resolver::{CacheStatus, DataResolver, QueryKind, Resolved, SourceLayer};
pub use sources::AuthoritativeSource;

use nexus_core::provider::Provider;
use nexus_memory::TtlCache;
use std::sync::Arc;
use std::time::Duration;

/// Build the resolver with the built-in sources and the configured knowledge directory.
pub fn build_resolver(
    config: &nexus_config::AppConfig,
    provider: Arc<dyn Provider>,
    cache: TtlCache,
) -> DataResolver {
    let generative = GenerativeFetcher::new(provider, &config.model).with_sampling(
        config.data.generative_temperature,
        config.data.generative_max_tokens,
    );

    DataResolver::new(cache, generative)
        .with_sources(sources::default_sources(
            config.data.riot_api_key.clone(),
            Duration::from_secs(config.data.request_timeout_secs),
        ))
        .with_knowledge(StaticKnowledge::load(&config.knowledge_dir()))
}
