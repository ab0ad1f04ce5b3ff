//! Bearer credentials for the provider API.
//!
//! The provider client asks a [`TokenSource`] for a token before every
//! request. [`RefreshingToken`] renews the token with the refresh-token
//! grant once it is about to expire.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Seconds before expiry at which a cached token is renewed.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Errors from obtaining or refreshing credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth configuration incomplete: {0}")]
    Incomplete(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint returned {status}: {body}")]
    TokenRejected { status: u16, body: String },
}

/// Client credentials for the provider's accounts service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default)]
    pub redirect_uri: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_token_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            token_url: default_token_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl AuthConfig {
    /// Fill in any blank client setting from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        let overlay = |field: &mut String, name: &str| {
            if field.is_empty() {
                if let Ok(value) = std::env::var(name) {
                    *field = value;
                }
            }
        };
        overlay(&mut self.client_id, "SPOTIFY_CLIENT_ID");
        overlay(&mut self.client_secret, "SPOTIFY_CLIENT_SECRET");
        overlay(&mut self.redirect_uri, "SPOTIFY_REDIRECT_URI");
        self
    }

    /// Whether client credentials are present for token requests.
    pub fn has_client_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Supplies a valid bearer token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Drop a cached token the provider has rejected, so the next call
    /// fetches a new one. Sources without a cache ignore this.
    async fn invalidate(&self) {}
}

/// A fixed token, for short sessions and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug)]
struct TokenState {
    access_token: Option<String>,
    expires_at: DateTime<Utc>,
    refresh_token: String,
}

impl TokenState {
    fn current(&self, now: DateTime<Utc>) -> Option<&str> {
        let remaining = self.expires_at.signed_duration_since(now).num_seconds();
        match &self.access_token {
            Some(token) if remaining > EXPIRY_MARGIN_SECS => Some(token),
            _ => None,
        }
    }

    fn apply(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.access_token = Some(response.access_token);
        self.expires_at = now + chrono::Duration::seconds(response.expires_in);
        if let Some(rotated) = response.refresh_token {
            self.refresh_token = rotated;
        }
    }
}

/// Access token renewed through the refresh-token grant.
pub struct RefreshingToken {
    client: reqwest::Client,
    config: AuthConfig,
    state: Mutex<TokenState>,
}

impl RefreshingToken {
    /// Start from a refresh token; the first request fetches an access token.
    pub fn new(config: AuthConfig, refresh_token: impl Into<String>) -> Result<Self, AuthError> {
        if !config.has_client_credentials() {
            return Err(AuthError::Incomplete(
                "client_id and client_secret are required to refresh tokens".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            state: Mutex::new(TokenState {
                access_token: None,
                expires_at: DateTime::<Utc>::MIN_UTC,
                refresh_token: refresh_token.into(),
            }),
        })
    }

    /// Seed with an access token that is still valid until `expires_at`.
    pub fn with_access_token(mut self, token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        let state = self.state.get_mut();
        state.access_token = Some(token.into());
        state.expires_at = expires_at;
        self
    }

    /// Trade an authorization code for tokens.
    pub async fn exchange_code(config: AuthConfig, code: &str) -> Result<Self, AuthError> {
        if config.redirect_uri.is_empty() {
            return Err(AuthError::Incomplete(
                "redirect_uri is required to exchange an authorization code".to_string(),
            ));
        }

        let source = Self::new(config, String::new())?;
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", source.config.redirect_uri.as_str()),
        ];
        let response = source.request_token(&params).await?;

        {
            let mut state = source.state.lock().await;
            state.apply(response, Utc::now());
        }
        info!("Exchanged authorization code for access token");
        Ok(source)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenRejected { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TokenSource for RefreshingToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if let Some(token) = state.current(now) {
            return Ok(token.to_string());
        }

        if state.refresh_token.is_empty() {
            return Err(AuthError::Incomplete(
                "access token expired and no refresh token is available".to_string(),
            ));
        }

        debug!("Access token missing or expiring, refreshing");
        let refresh_token = state.refresh_token.clone();
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        let response = self.request_token(&params).await?;
        state.apply(response, now);
        info!("Refreshed access token");

        state
            .access_token
            .clone()
            .ok_or_else(|| AuthError::Incomplete("token endpoint returned no token".to_string()))
    }
    async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if state.access_token.take().is_some() {
            debug!("Discarded rejected access token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(token_url: String) -> AuthConfig {
        AuthConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            token_url,
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert_eq!(config.token_url, "https://accounts.spotify.com/api/token");
        assert!(!config.has_client_credentials());
    }

    #[test]
    fn test_refreshing_token_requires_credentials() {
        let result = RefreshingToken::new(AuthConfig::default(), "refresh");
        assert!(matches!(result, Err(AuthError::Incomplete(_))));
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = StaticToken::new("abc");
        assert_eq!(source.access_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_valid_token_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let source = RefreshingToken::new(config(format!("{}/api/token", server.uri())), "r1")
            .unwrap()
            .with_access_token("cached", Utc::now() + chrono::Duration::hours(1));

        assert_eq!(source.access_token().await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "streaming"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = RefreshingToken::new(config(format!("{}/api/token", server.uri())), "r1")
            .unwrap()
            .with_access_token("stale", Utc::now() + chrono::Duration::seconds(30));

        assert_eq!(source.access_token().await.unwrap(), "fresh");
        // cached for the next caller
        assert_eq!(source.access_token().await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_invalidated_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = RefreshingToken::new(config(format!("{}/api/token", server.uri())), "r1")
            .unwrap()
            .with_access_token("revoked", Utc::now() + chrono::Duration::hours(1));

        assert_eq!(source.access_token().await.unwrap(), "revoked");
        source.invalidate().await;
        assert_eq!(source.access_token().await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_static_token_ignores_invalidate() {
        let source = StaticToken::new("abc");
        source.invalidate().await;
        assert_eq!(source.access_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "token_type": "Bearer",
                "expires_in": 0,
                "refresh_token": "r2"
            })))
            .mount(&server)
            .await;

        let source =
            RefreshingToken::new(config(format!("{}/api/token", server.uri())), "r1").unwrap();
        source.access_token().await.unwrap();

        assert_eq!(source.state.lock().await.refresh_token, "r2");
    }

    #[tokio::test]
    async fn test_rejected_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let source =
            RefreshingToken::new(config(format!("{}/api/token", server.uri())), "r1").unwrap();

        match source.access_token().await {
            Err(AuthError::TokenRejected { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid_grant");
            }
            other => panic!("expected rejection, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "first",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "r9"
            })))
            .mount(&server)
            .await;

        let source =
            RefreshingToken::exchange_code(config(format!("{}/api/token", server.uri())), "abc123")
                .await
                .unwrap();

        assert_eq!(source.access_token().await.unwrap(), "first");
        assert_eq!(source.state.lock().await.refresh_token, "r9");
    }

    #[tokio::test]
    async fn test_exchange_code_requires_redirect_uri() {
        let mut config = config("http://127.0.0.1:9/api/token".to_string());
        config.redirect_uri.clear();

        let result = RefreshingToken::exchange_code(config, "abc").await;
        assert!(matches!(result, Err(AuthError::Incomplete(_))));
    }
}
