//! Route handlers.
//!
//! Every error leaves as `{"error": "..."}` with a matching status code.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use nexus_agent::{Mood, ReasoningTrace};
use nexus_core::history::HistoryTurn;
use nexus_core::message::{Message, Role};
use nexus_memory::{CacheInfo, CacheListing};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::SharedState;

/// Header carrying the authenticated caller's user id.
pub const USER_HEADER: &str = "x-nexus-user";

const DEFAULT_SESSION: &str = "default";

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn internal_error() -> ApiError {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong. Please try again.",
    )
}

fn caller(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Authentication required"))
}

// --- Health ---

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    message: &'static str,
    version: &'static str,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Nexus API is running!",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// --- Chat ---

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    response: String,
    mood: Mood,
    session_id: String,
    reasoning_trace: ReasoningTrace,
    tools_used: Vec<String>,
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = caller(&headers)?;

    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No message provided"))?
        .to_string();
    let session_id = payload
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION.to_string());

    if !state.limiter.check(&user_id) {
        warn!(user = %user_id, "Chat rate limit exceeded");
        return Err(api_error(
            StatusCode::TOO_MANY_REQUESTS,
            "Please wait a moment before sending another message",
        ));
    }

    info!(user = %user_id, session = %session_id, message_len = message.len(), "Chat request");

    let history: Vec<Message> = state
        .history
        .recent(&user_id, &session_id, state.config.gateway.history_limit)
        .await
        .map_err(|e| {
            error!(error = %e, "History lookup failed");
            internal_error()
        })?
        .iter()
        .map(HistoryTurn::to_message)
        .collect();

    let profile = state.profiles.get(&user_id).await.unwrap_or_else(|e| {
        warn!(error = %e, "Profile lookup failed, continuing without one");
        None
    });
    let username = profile
        .as_ref()
        .map(|p| p.username.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| user_id.clone());

    let result = state
        .agent
        .run(&message, &history, profile.as_ref(), &username)
        .await
        .map_err(|e| {
            if e.is_busy() {
                warn!(error = %e, "Model service is rate limiting");
                api_error(
                    StatusCode::TOO_MANY_REQUESTS,
                    "AI is busy, please try again in a few seconds",
                )
            } else {
                error!(error = %e, "Agent run failed");
                internal_error()
            }
        })?;

    for turn in [
        HistoryTurn::new(Role::User, message),
        HistoryTurn::new(Role::Model, result.response.clone()),
    ] {
        if let Err(e) = state.history.append(&user_id, &session_id, turn).await {
            warn!(error = %e, "Failed to persist chat turn");
        }
    }

    if let Some(insights) = &state.insights {
        insights.clone().spawn(
            user_id,
            session_id.clone(),
            state.history.clone(),
            state.profiles.clone(),
            state.config.gateway.history_limit,
        );
    }

    Ok(Json(ChatResponse {
        response: result.response,
        mood: result.mood,
        session_id,
        reasoning_trace: result.trace,
        tools_used: result.tools_used,
    }))
}

#[derive(Serialize)]
pub struct HistoryResponse {
    messages: Vec<HistoryTurn>,
    session_id: String,
}

pub async fn history_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let user_id = caller(&headers)?;
    let messages = state
        .history
        .recent(&user_id, &session_id, usize::MAX)
        .await
        .map_err(|e| {
            error!(error = %e, "History lookup failed");
            internal_error()
        })?;

    Ok(Json(HistoryResponse {
        messages,
        session_id,
    }))
}

// --- Admin: cache ---

#[derive(Serialize)]
pub struct CacheListResponse {
    backend: String,
    entries: Vec<CacheListing>,
}

#[derive(Serialize)]
pub struct CacheActionResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
}

pub async fn list_cache_handler(
    State(state): State<SharedState>,
) -> Result<Json<CacheListResponse>, ApiError> {
    let entries = state.cache.list().await.map_err(|e| {
        error!(error = %e, "Cache listing failed");
        internal_error()
    })?;

    Ok(Json(CacheListResponse {
        backend: state.cache.backend().to_string(),
        entries,
    }))
}

pub async fn cache_info_handler(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Json<CacheInfo>, ApiError> {
    match state.cache.info(&key).await {
        Ok(Some(info)) => Ok(Json(info)),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, format!("No cache entry '{key}'"))),
        Err(e) => {
            error!(error = %e, "Cache lookup failed");
            Err(internal_error())
        }
    }
}

pub async fn remove_cache_handler(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Json<CacheActionResponse>, ApiError> {
    let exists = state.cache.info(&key).await.map_err(|e| {
        error!(error = %e, "Cache lookup failed");
        internal_error()
    })?;
    if exists.is_none() {
        return Err(api_error(StatusCode::NOT_FOUND, format!("No cache entry '{key}'")));
    }

    state.cache.invalidate(Some(&key)).await.map_err(|e| {
        error!(error = %e, "Cache invalidation failed");
        internal_error()
    })?;

    Ok(Json(CacheActionResponse {
        status: "removed",
        key: Some(key),
    }))
}

pub async fn clear_cache_handler(
    State(state): State<SharedState>,
) -> Result<Json<CacheActionResponse>, ApiError> {
    state.cache.invalidate(None).await.map_err(|e| {
        error!(error = %e, "Cache flush failed");
        internal_error()
    })?;

    Ok(Json(CacheActionResponse {
        status: "cleared",
        key: None,
    }))
}
