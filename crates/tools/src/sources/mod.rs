//! Authoritative per-game data sources.
//!
//! Each source claims subjects by a coarse case-insensitive substring
//! test and returns structured data, or `None` on any failure (timeout,
//! non-200, malformed body) so the resolution chain falls through.

pub mod league;
pub mod valorant;

pub use league::LeagueSource;
pub use valorant::ValorantSource;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A dedicated external API for one game.
#[async_trait]
pub trait AuthoritativeSource: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Whether this source claims the subject (already lowercased).
    fn matches(&self, subject_lower: &str) -> bool;

    /// Fetch live data; `None` means "no data".
    async fn fetch(&self) -> Option<serde_json::Map<String, serde_json::Value>>;
}

/// The built-in sources, in match order.
pub fn default_sources(
    riot_api_key: Option<String>,
    timeout: Duration,
) -> Vec<Arc<dyn AuthoritativeSource>> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    vec![
        Arc::new(LeagueSource::new(client.clone(), riot_api_key)),
        Arc::new(ValorantSource::new(client)),
    ]
}

/// GET a URL and decode a JSON body, treating every failure as `None`.
pub(crate) async fn get_json(
    request: reqwest::RequestBuilder,
    source: &str,
) -> Option<serde_json::Value> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(source, error = %e, "Authoritative source request failed");
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::warn!(source, status = response.status().as_u16(), "Authoritative source returned error");
        return None;
    }

    match response.json().await {
        Ok(body) => Some(body),
        Err(e) => {
            tracing::warn!(source, error = %e, "Authoritative source body malformed");
            None
        }
    }
}
