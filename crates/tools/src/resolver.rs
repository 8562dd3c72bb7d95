//! Data resolution chain.
//!
//! For a (subject, query kind) pair the first layer that produces data wins:
//!
//! 1. Fresh cache entry under `game:<normalized>:<kind>`
//! 2. Authoritative source claiming the subject, enriched with generative
//!    fields (authoritative keys win on collision), cached
//! 3. Generative fallback alone, cached when it returned a JSON object
//! 4. Static knowledge table, never cached
//!
//! If every layer misses the result is a not-found payload. Nothing here
//! returns an error: store and source failures are logged and skipped.

use nexus_memory::TtlCache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::generative::{Generated, GenerativeFetcher};
use crate::knowledge::{StaticKnowledge, normalize_key};
use crate::sources::AuthoritativeSource;

/// What kind of information is being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Current patch, tier list, ranked tips
    Meta,
    /// Overview and beginner tips
    General,
    /// Similar games
    Recommendations,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::General => "general",
            Self::Recommendations => "recommendations",
        }
    }

    /// Interpret a tool argument. Empty means `Meta`; unknown text means `General`.
    pub fn from_arg(arg: &str) -> Self {
        match arg.trim().to_lowercase().as_str() {
            "" | "meta" => Self::Meta,
            "recommendations" | "similar" => Self::Recommendations,
            _ => Self::General,
        }
    }
}

/// Which layer produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLayer {
    ApiPlusGenerative,
    Generative,
    GenerativeRaw,
    Static,
    None,
}

impl SourceLayer {
    /// Tag stored alongside cache rows.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::ApiPlusGenerative => "api+generative",
            Self::Generative => "generative",
            Self::GenerativeRaw => "generative_raw",
            Self::Static => "static",
            Self::None => "none",
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "api+generative" => Self::ApiPlusGenerative,
            "generative" => Self::Generative,
            "generative_raw" => Self::GenerativeRaw,
            "static" => Self::Static,
            _ => Self::None,
        }
    }
}

/// Whether the payload came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
    Fallback,
}

/// A payload plus its provenance.
///
/// Provenance lives outside the payload, so `into_payload` is the only
/// form that reaches the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub data: serde_json::Map<String, serde_json::Value>,
    pub layer: SourceLayer,
    pub cache: CacheStatus,
}

impl Resolved {
    fn new(
        data: serde_json::Map<String, serde_json::Value>,
        layer: SourceLayer,
        cache: CacheStatus,
    ) -> Self {
        Self { data, layer, cache }
    }

    fn not_found(subject: &str) -> Self {
        let mut data = serde_json::Map::new();
        data.insert(
            "error".into(),
            format!("No data found for '{subject}'").into(),
        );
        Self::new(data, SourceLayer::None, CacheStatus::Miss)
    }

    /// True unless every layer missed.
    pub fn found(&self) -> bool {
        self.layer != SourceLayer::None
    }

    /// The bare payload, without provenance.
    pub fn into_payload(self) -> serde_json::Value {
        serde_json::Value::Object(self.data)
    }

    /// Payload with `_source` / `_cache` fields, for administrative views.
    pub fn with_provenance(&self) -> serde_json::Value {
        let mut data = self.data.clone();
        data.insert("_source".into(), self.layer.as_tag().into());
        data.insert(
            "_cache".into(),
            serde_json::to_value(self.cache).unwrap_or_default(),
        );
        serde_json::Value::Object(data)
    }
}

/// Cache key for game data.
pub fn game_key(subject: &str, kind: QueryKind) -> String {
    format!("game:{}:{}", normalize_key(subject), kind.as_str())
}

/// Cache key for recommendations.
pub fn recs_key(subject: &str) -> String {
    format!("recs:{}", normalize_key(subject))
}

/// Owns cache population for externally grounded game data.
pub struct DataResolver {
    cache: TtlCache,
    sources: Vec<Arc<dyn AuthoritativeSource>>,
    generative: GenerativeFetcher,
    knowledge: Arc<StaticKnowledge>,
}

impl DataResolver {
    pub fn new(cache: TtlCache, generative: GenerativeFetcher) -> Self {
        Self {
            cache,
            sources: Vec::new(),
            generative,
            knowledge: Arc::new(StaticKnowledge::empty()),
        }
    }

    pub fn with_sources(mut self, sources: Vec<Arc<dyn AuthoritativeSource>>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_knowledge(mut self, knowledge: StaticKnowledge) -> Self {
        self.knowledge = Arc::new(knowledge);
        self
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub fn generative(&self) -> &GenerativeFetcher {
        &self.generative
    }

    pub async fn resolve(&self, subject: &str, kind: QueryKind) -> Resolved {
        self.resolve_with(subject, kind, false).await
    }

    /// Resolve, optionally skipping the cache read.
    pub async fn resolve_with(&self, subject: &str, kind: QueryKind, force_refresh: bool) -> Resolved {
        let key = game_key(subject, kind);

        // 1. Cache
        if !force_refresh {
            if let Some(hit) = self.cached(&key).await {
                return hit;
            }
        }

        // 2. Authoritative source
        let subject_lower = subject.to_lowercase();
        let source = self.sources.iter().find(|s| s.matches(&subject_lower));
        if let Some(source) = source {
            if let Some(mut data) = source.fetch().await {
                debug!(subject, source = source.name(), "Authoritative source answered");
                if let Some(generated) = self.generative.fetch(subject, kind).await {
                    for (k, v) in generated.into_map() {
                        data.entry(k).or_insert(v);
                    }
                }
                self.store(&key, &data, SourceLayer::ApiPlusGenerative).await;
                return Resolved::new(data, SourceLayer::ApiPlusGenerative, CacheStatus::Miss);
            }
        }

        // 3. Generative fallback
        match self.generative.fetch(subject, kind).await {
            Some(Generated::Structured(data)) => {
                self.store(&key, &data, SourceLayer::Generative).await;
                return Resolved::new(data, SourceLayer::Generative, CacheStatus::Miss);
            }
            Some(raw @ Generated::Raw(_)) => {
                return Resolved::new(raw.into_map(), SourceLayer::GenerativeRaw, CacheStatus::Miss);
            }
            None => {}
        }

        // 4. Static table
        if let Some(serde_json::Value::Object(data)) = self.knowledge.game(subject) {
            debug!(subject, "Serving static knowledge");
            return Resolved::new(data.clone(), SourceLayer::Static, CacheStatus::Fallback);
        }

        debug!(subject, kind = kind.as_str(), "No layer had data");
        Resolved::not_found(subject)
    }

    /// Similar-game recommendations for a named game.
    ///
    /// The payload always carries a `similar_games` list, empty on a miss.
    pub async fn resolve_recommendations(&self, subject: &str) -> Resolved {
        let key = recs_key(subject);

        if let Some(hit) = self.cached(&key).await {
            return hit;
        }

        if let Some(Generated::Structured(data)) =
            self.generative.fetch(subject, QueryKind::Recommendations).await
        {
            self.store(&key, &data, SourceLayer::Generative).await;
            return Resolved::new(data, SourceLayer::Generative, CacheStatus::Miss);
        }

        if let Some(similar) = self.knowledge.similar_to(subject) {
            let games: Vec<serde_json::Value> = similar
                .iter()
                .map(|name| serde_json::json!({"name": name, "reason": ""}))
                .collect();
            let mut data = serde_json::Map::new();
            data.insert("similar_games".into(), games.into());
            return Resolved::new(data, SourceLayer::Static, CacheStatus::Fallback);
        }

        let mut data = serde_json::Map::new();
        data.insert("similar_games".into(), serde_json::json!([]));
        data.insert("error".into(), "No recommendations found".into());
        Resolved::new(data, SourceLayer::None, CacheStatus::Miss)
    }

    async fn cached(&self, key: &str) -> Option<Resolved> {
        match self.cache.lookup(key).await {
            Ok(Some(entry)) => match entry.data {
                serde_json::Value::Object(data) => Some(Resolved::new(
                    data,
                    SourceLayer::from_tag(&entry.source),
                    CacheStatus::Hit,
                )),
                _ => None,
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn store(
        &self,
        key: &str,
        data: &serde_json::Map<String, serde_json::Value>,
        layer: SourceLayer,
    ) {
        let value = serde_json::Value::Object(data.clone());
        if let Err(e) = self.cache.set(key, value, layer.as_tag()).await {
            warn!(key, error = %e, "Cache write failed");
        }
    }
}
