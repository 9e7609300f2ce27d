//! Discord REST API client.
//!
//! [`ApiClient`] covers the three endpoints this bot needs: interaction
//! response callbacks, channel message creation, and application command
//! registration. The [`DiscordApi`] trait is the seam the confirmation
//! flow depends on, so tests can substitute a recording mock.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PlatformError;

/// Base URL for the Discord REST API v10.
const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// The REST operations the confirmation flow performs.
#[async_trait]
pub trait DiscordApi: Send + Sync {
    /// Answer an interaction through its callback endpoint.
    async fn interaction_response(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        response: Value,
    ) -> Result<(), PlatformError>;

    /// Post a message to a channel. Returns the new message's ID.
    async fn create_message(
        &self,
        channel_id: &str,
        payload: Value,
    ) -> Result<String, PlatformError>;

    /// Overwrite the application's command set (global, or guild-scoped
    /// when `guild_id` is given).
    async fn register_commands(
        &self,
        application_id: &str,
        guild_id: Option<&str>,
        commands: Value,
    ) -> Result<(), PlatformError>;
}

/// A created message, as far as this bot cares.
#[derive(Debug, Clone, serde::Deserialize)]
struct CreatedMessage {
    id: String,
}

/// Rate limit state parsed from REST response headers.
///
/// A depleted bucket is waited out once; there is no retry logic on top.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Requests left in the current window.
    pub remaining: Option<u32>,

    /// Seconds until the window resets.
    pub reset_after: Option<f64>,
}

impl RateLimitInfo {
    /// Parse the `x-ratelimit-*` headers.
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        Self {
            remaining: headers
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok()),
            reset_after: headers
                .get("x-ratelimit-reset-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Whether the bucket is exhausted.
    pub fn is_limited(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Milliseconds until the bucket refills.
    pub fn retry_after_ms(&self) -> Option<u64> {
        self.reset_after.map(|s| (s * 1000.0) as u64)
    }
}

/// HTTP client for the Discord REST API, with Bot token auth.
pub struct ApiClient {
    http: Client,
    token: String,
    base_url: String,
}

impl ApiClient {
    /// Create a client with the given bot token.
    pub fn new(token: String) -> Self {
        Self {
            http: Client::new(),
            token,
            base_url: DISCORD_API_BASE.to_owned(),
        }
    }

    /// Create a client pointing at a custom base URL (for testing).
    #[cfg(test)]
    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            http: Client::new(),
            token,
            base_url,
        }
    }

    /// The base URL used for requests.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST/PUT `body` to `url`, map non-success statuses to errors, and
    /// pause when the rate-limit bucket just ran dry.
    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        body: &Value,
    ) -> Result<reqwest::Response, PlatformError> {
        let resp = request
            .header("Authorization", format!("Bot {}", self.token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| PlatformError::RequestFailed(e.to_string()))?;

        let rate_limit = RateLimitInfo::from_headers(resp.headers());
        if rate_limit.is_limited() {
            let wait_ms = rate_limit.retry_after_ms().unwrap_or(1000);
            warn!(wait_ms, "Discord rate limit reached, waiting out the bucket");
            tokio::time::sleep(std::time::Duration::from_millis(wait_ms)).await;
        }

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PlatformError::AuthFailed("token rejected".into()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "unknown error".into());
            return Err(PlatformError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp)
    }
}

#[async_trait]
impl DiscordApi for ApiClient {
    async fn interaction_response(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        response: Value,
    ) -> Result<(), PlatformError> {
        let url = format!(
            "{}/interactions/{interaction_id}/{interaction_token}/callback",
            self.base_url
        );
        debug!(interaction_id, "sending interaction response");
        self.send_json(self.http.post(&url), &response).await?;
        Ok(())
    }

    async fn create_message(
        &self,
        channel_id: &str,
        payload: Value,
    ) -> Result<String, PlatformError> {
        let url = format!("{}/channels/{channel_id}/messages", self.base_url);
        debug!(channel_id, "creating channel message");
        let resp = self.send_json(self.http.post(&url), &payload).await?;
        let msg: CreatedMessage = resp
            .json()
            .await
            .map_err(|e| PlatformError::RequestFailed(e.to_string()))?;
        Ok(msg.id)
    }

    async fn register_commands(
        &self,
        application_id: &str,
        guild_id: Option<&str>,
        commands: Value,
    ) -> Result<(), PlatformError> {
        let url = match guild_id {
            Some(guild) => format!(
                "{}/applications/{application_id}/guilds/{guild}/commands",
                self.base_url
            ),
            None => format!("{}/applications/{application_id}/commands", self.base_url),
        };
        debug!(application_id, guild_id, "registering application commands");
        self.send_json(self.http.put(&url), &commands).await?;
        Ok(())
    }
}
