//! HTTP API gateway for Nexus.
//!
//! Exposes the chat endpoint, a health check, session history, and the
//! administrative cache inspection routes.
//!
//! Authentication happens upstream: the caller's user id arrives in the
//! `x-nexus-user` header.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    routing::{get, post},
};
use nexus_agent::{ProfileInsights, ReactAgent};
use nexus_config::AppConfig;
use nexus_core::cache::CacheStore;
use nexus_core::error::StoreError;
use nexus_core::history::HistoryStore;
use nexus_core::profile::ProfileStore;
use nexus_memory::{InMemoryCacheStore, InMemoryHistory, InMemoryProfiles, TtlCache};
use nexus_tools::ToolRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub agent: Arc<ReactAgent>,
    /// Background profile evolution; `None` when disabled.
    pub insights: Option<Arc<ProfileInsights>>,
    pub history: Arc<dyn HistoryStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub cache: TtlCache,
    pub limiter: RateLimiter,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(
        config: AppConfig,
        agent: Arc<ReactAgent>,
        history: Arc<dyn HistoryStore>,
        profiles: Arc<dyn ProfileStore>,
        cache: TtlCache,
    ) -> Self {
        let limiter = RateLimiter::new(Duration::from_secs(config.gateway.min_request_interval_secs));
        Self {
            config,
            agent,
            insights: None,
            history,
            profiles,
            cache,
            limiter,
        }
    }

    pub fn with_insights(mut self, insights: Arc<ProfileInsights>) -> Self {
        self.insights = Some(insights);
        self
    }
}

/// Open the configured cache backend.
pub async fn open_cache(config: &AppConfig) -> Result<TtlCache, StoreError> {
    let store: Arc<dyn CacheStore> = match config.cache.backend.as_str() {
        "sqlite" => {
            let path = config.cache_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Storage(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
            Arc::new(nexus_memory::SqliteCacheStore::new(&path.to_string_lossy()).await?)
        }
        _ => Arc::new(InMemoryCacheStore::new()),
    };

    Ok(TtlCache::new(store).with_ttl_hours(config.cache.ttl_hours))
}

/// Build every subsystem once from configuration.
///
/// Profiles are seeded from the configured profiles file when it exists.
pub async fn build_state(config: AppConfig) -> Result<GatewayState, nexus_core::Error> {
    let provider = nexus_providers::build_from_config(&config)?;
    let cache = open_cache(&config).await?;

    let resolver = nexus_tools::build_resolver(&config, provider.clone(), cache.clone());
    let tools = Arc::new(ToolRegistry::new(Arc::new(resolver)));
    let agent = Arc::new(ReactAgent::from_config(&config, provider.clone(), tools));

    let profiles = Arc::new(InMemoryProfiles::new());
    let profiles_path = config.profiles_path();
    if profiles_path.exists() {
        match profiles.load_json(&profiles_path).await {
            Ok(count) => info!(count, path = %profiles_path.display(), "Player profiles loaded"),
            Err(e) => warn!(error = %e, "Failed to load player profiles"),
        }
    }

    let insights = config.insights.enabled.then(|| {
        Arc::new(
            ProfileInsights::new(provider, &config.model)
                .with_min_messages(config.insights.min_messages),
        )
    });

    let mut state = GatewayState::new(
        config,
        agent,
        Arc::new(InMemoryHistory::new()),
        profiles,
        cache,
    );
    if let Some(insights) = insights {
        state = state.with_insights(insights);
    }
    Ok(state)
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(api::health_handler))
        .route("/api/chat", post(api::chat_handler))
        .route("/api/chat/history/{session_id}", get(api::history_handler))
        .route(
            "/api/admin/cache",
            get(api::list_cache_handler).delete(api::clear_cache_handler),
        )
        .route(
            "/api/admin/cache/{key}",
            get(api::cache_info_handler).delete(api::remove_cache_handler),
        )
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(build_state(config).await?);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Rate Limiter ---

/// Minimum spacing between requests from one caller.
///
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
pub struct RateLimiter {
    min_interval: Duration,
    last_seen: std::sync::Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_seen: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Record a request from `caller`. Returns `true` if allowed.
    ///
    /// Rejected requests do not reset the caller's window.
    pub fn check(&self, caller: &str) -> bool {
        let now = Instant::now();
        let mut last_seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());

        // Periodic cleanup: if map grows too large, evict idle callers
        if last_seen.len() > 10_000 {
            last_seen.retain(|_, t| now.duration_since(*t) < self.min_interval);
        }

        match last_seen.get(caller) {
            Some(t) if now.duration_since(*t) < self.min_interval => false,
            _ => {
                last_seen.insert(caller.to_string(), now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use nexus_core::error::ProviderError;
    use nexus_core::profile::PlayerProfile;
    use nexus_core::provider::{GenerateRequest, Provider};
    use nexus_tools::{DataResolver, GenerativeFetcher};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Replays scripted replies; fails once the script runs out.
    struct Scripted(Mutex<Vec<Result<String, ProviderError>>>);

    impl Scripted {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            let mut replies = replies;
            replies.reverse();
            Arc::new(Self(Mutex::new(replies)))
        }
    }

    #[async_trait::async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _request: GenerateRequest) -> Result<String, ProviderError> {
            self.0
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ProviderError::Network("script exhausted".into())))
        }
    }

    struct Harness {
        state: SharedState,
        profiles: Arc<InMemoryProfiles>,
    }

    fn harness(replies: Vec<Result<String, ProviderError>>, min_interval_secs: u64) -> Harness {
        let mut config = AppConfig::default();
        config.gateway.min_request_interval_secs = min_interval_secs;

        let cache = TtlCache::new(Arc::new(InMemoryCacheStore::new()));
        let provider = Scripted::new(replies);
        let generative = GenerativeFetcher::new(Scripted::new(vec![]), "m");
        let resolver = DataResolver::new(cache.clone(), generative);
        let tools = Arc::new(ToolRegistry::new(Arc::new(resolver)));
        let agent = Arc::new(ReactAgent::new(provider, "m", tools));
        let profiles = Arc::new(InMemoryProfiles::new());

        let state = GatewayState::new(
            config,
            agent,
            Arc::new(InMemoryHistory::new()),
            profiles.clone(),
            cache,
        );
        Harness {
            state: Arc::new(state),
            profiles,
        }
    }

    fn chat_request(user: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header(api::USER_HEADER, user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(harness(vec![], 0).state);

        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn chat_returns_answer_and_persists_exchange() {
        let h = harness(vec![Ok("FINAL_ANSWER:\n[MOOD:happy]\nWelcome back, tenz!".into())], 0);
        h.profiles.insert("u1", PlayerProfile::new("tenz")).await;
        let app = build_router(h.state.clone());

        let response = app
            .oneshot(chat_request(Some("u1"), serde_json::json!({"message": "hey"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["response"], "Welcome back, tenz!");
        assert_eq!(body["mood"], "happy");
        assert_eq!(body["session_id"], "default");
        assert_eq!(body["tools_used"], serde_json::json!([]));

        let turns = h.state.history.recent("u1", "default", 10).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "hey");
        assert_eq!(turns[1].content, "Welcome back, tenz!");
    }

    #[tokio::test]
    async fn missing_caller_is_unauthorized() {
        let app = build_router(harness(vec![], 0).state);
        let response = app
            .oneshot(chat_request(None, serde_json::json!({"message": "hey"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_message_is_bad_request() {
        let app = build_router(harness(vec![], 0).state);
        let response = app
            .oneshot(chat_request(Some("u1"), serde_json::json!({"session_id": "s"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No message provided");
    }

    #[tokio::test]
    async fn second_request_within_interval_is_rejected() {
        let h = harness(vec![Ok("FINAL_ANSWER: one".into()), Ok("FINAL_ANSWER: two".into())], 60);
        let app = build_router(h.state);

        let first = app
            .clone()
            .oneshot(chat_request(Some("u1"), serde_json::json!({"message": "a"})))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .clone()
            .oneshot(chat_request(Some("u1"), serde_json::json!({"message": "b"})))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        // Other callers are unaffected.
        let other = app
            .oneshot(chat_request(Some("u2"), serde_json::json!({"message": "c"})))
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limited_model_is_busy() {
        let h = harness(vec![Err(ProviderError::RateLimited { retry_after_secs: 5 })], 0);
        let response = build_router(h.state)
            .oneshot(chat_request(Some("u1"), serde_json::json!({"message": "hey"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(json_body(response).await["error"].as_str().unwrap().contains("busy"));
    }

    #[tokio::test]
    async fn other_model_failure_is_generic_error() {
        let h = harness(vec![Err(ProviderError::Network("reset".into()))], 0);
        let response = build_router(h.state.clone())
            .oneshot(chat_request(Some("u1"), serde_json::json!({"message": "hey"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["error"],
            "Something went wrong. Please try again."
        );
        assert!(h.state.history.recent("u1", "default", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn session_history_lists_turns() {
        let h = harness(vec![Ok("FINAL_ANSWER: gg".into())], 0);
        let app = build_router(h.state);
        app.clone()
            .oneshot(chat_request(
                Some("u1"),
                serde_json::json!({"message": "hi", "session_id": "s1"}),
            ))
            .await
            .unwrap();

        let req = Request::builder()
            .uri("/api/chat/history/s1")
            .header(api::USER_HEADER, "u1")
            .body(Body::empty())
            .unwrap();
        let body = json_body(app.oneshot(req).await.unwrap()).await;
        assert_eq!(body["session_id"], "s1");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "gg");
    }

    #[tokio::test]
    async fn admin_cache_list_and_invalidate() {
        let h = harness(vec![], 0);
        h.state
            .cache
            .set("game:valorant:meta", serde_json::json!({"patch": "9.04"}), "generative")
            .await
            .unwrap();
        let app = build_router(h.state.clone());

        let list = Request::builder()
            .uri("/api/admin/cache")
            .body(Body::empty())
            .unwrap();
        let body = json_body(app.clone().oneshot(list).await.unwrap()).await;
        assert_eq!(body["entries"][0]["key"], "game:valorant:meta");
        assert_eq!(body["entries"][0]["source"], "generative");
        assert_eq!(body["entries"][0]["fresh"], true);

        let info = Request::builder()
            .uri("/api/admin/cache/game:valorant:meta")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(info).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let delete = Request::builder()
            .method("DELETE")
            .uri("/api/admin/cache/game:valorant:meta")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.clone().oneshot(delete).await.unwrap().status(), StatusCode::OK);
        assert!(h.state.cache.list().await.unwrap().is_empty());

        let missing = Request::builder()
            .method("DELETE")
            .uri("/api/admin/cache/game:valorant:meta")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.oneshot(missing).await.unwrap().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_cache_flush() {
        let h = harness(vec![], 0);
        for key in ["recs:hades", "game:dota_2:general"] {
            h.state.cache.set(key, serde_json::json!({}), "generative").await.unwrap();
        }
        let req = Request::builder()
            .method("DELETE")
            .uri("/api/admin/cache")
            .body(Body::empty())
            .unwrap();
        let response = build_router(h.state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(h.state.cache.list().await.unwrap().is_empty());
    }

    #[test]
    fn rate_limiter_spacing() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));

        let open = RateLimiter::new(Duration::ZERO);
        assert!(open.check("a"));
        assert!(open.check("a"));
    }
}
