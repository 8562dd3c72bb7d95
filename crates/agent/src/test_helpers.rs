//! Shared test helpers for agent tests.

use nexus_core::error::ProviderError;
use nexus_core::provider::{GenerateRequest, Provider};
use nexus_memory::{InMemoryCacheStore, TtlCache};
use nexus_tools::{DataResolver, GenerativeFetcher, StaticKnowledge, ToolRegistry};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A provider that replays scripted replies in order.
///
/// Every request is recorded. Once the script runs out, calls fail with
/// a network error.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<&str>) -> Self {
        Self::with_results(replies.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_results(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that never answers.
    pub fn failing() -> Self {
        Self::with_results(vec![])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Network("script exhausted".into())))
    }
}

/// Tool registry whose only data is the given static knowledge.
pub fn static_registry(knowledge: StaticKnowledge) -> Arc<ToolRegistry> {
    let cache = TtlCache::new(Arc::new(InMemoryCacheStore::new()));
    let generative = GenerativeFetcher::new(Arc::new(ScriptedProvider::failing()), "test-model");
    let resolver = DataResolver::new(cache, generative).with_knowledge(knowledge);
    Arc::new(ToolRegistry::new(Arc::new(resolver)))
}
