//! Access token management for the WeChat API.

use crate::config::Credentials;
use crate::error::Result;
use crate::http::{AccessTokenResponse, WeChatHttpClient};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Access token with expiration information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// The access token string
    pub token: String,
    /// When the token expires
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Creates a new access token with expiration time.
    pub fn new(token: String, expires_in_seconds: u64) -> Self {
        let expires_at = Utc::now() + Duration::seconds(expires_in_seconds as i64);
        Self { token, expires_at }
    }

    /// Checks if the token is expired or will expire within the buffer time.
    pub fn is_expired(&self, buffer_seconds: i64) -> bool {
        let buffer_time = Duration::seconds(buffer_seconds);
        Utc::now() + buffer_time >= self.expires_at
    }
}

/// Token manager responsible for obtaining and caching access tokens.
#[derive(Debug)]
pub struct TokenManager {
    app_id: String,
    app_secret: String,
    http_client: Arc<WeChatHttpClient>,
    token_cache: Arc<RwLock<Option<AccessToken>>>,
    refresh_lock: Arc<tokio::sync::Mutex<()>>,
}

impl TokenManager {
    pub fn new(credentials: &Credentials, http_client: Arc<WeChatHttpClient>) -> Self {
        Self {
            app_id: credentials.app_id.clone(),
            app_secret: credentials.app_secret.clone(),
            http_client,
            token_cache: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Gets a valid access token, refreshing if necessary.
    pub async fn get_access_token(&self) -> Result<String> {
        if let Some(token) = self.get_cached_token().await {
            return Ok(token);
        }

        self.refresh_token().await
    }

    /// Gets a cached token if it's still valid.
    async fn get_cached_token(&self) -> Option<String> {
        let cache = self.token_cache.read().await;
        if let Some(ref token) = *cache {
            // 60-second buffer to avoid expiry races
            if !token.is_expired(60) {
                return Some(token.token.clone());
            }
        }
        None
    }

    /// Refreshes the access token from the API.
    async fn refresh_token(&self) -> Result<String> {
        // Prevent concurrent refreshes
        let _guard = self.refresh_lock.lock().await;

        // Double-check after acquiring lock
        if let Some(token) = self.get_cached_token().await {
            return Ok(token);
        }

        info!("refreshing WeChat access token");

        let response = self
            .http_client
            .get_with_query(
                "/cgi-bin/token",
                &[
                    ("grant_type", "client_credential"),
                    ("appid", &self.app_id),
                    ("secret", &self.app_secret),
                ],
            )
            .await?;
        let token_response: AccessTokenResponse = self.http_client.decode(response).await?;

        let new_token = AccessToken::new(token_response.access_token, token_response.expires_in);
        let token_string = new_token.token.clone();

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(new_token);
        }

        info!("refreshed WeChat access token");
        Ok(token_string)
    }

    /// Drops the cached token so the next call fetches a fresh one. Used
    /// when the API reports an auth-class error code.
    pub async fn invalidate(&self) {
        let mut cache = self.token_cache.write().await;
        *cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_manager() -> TokenManager {
        let config = Config {
            credentials: Credentials {
                app_id: "test_app_id".to_string(),
                app_secret: "test_app_secret".to_string(),
            },
            ..Default::default()
        };
        let http_client = Arc::new(WeChatHttpClient::new(&config).unwrap());
        TokenManager::new(&config.credentials, http_client)
    }

    #[test]
    fn test_access_token_expiry() {
        let token = AccessToken::new("test_token".to_string(), 3600);

        assert!(!token.is_expired(0));
        assert!(!token.is_expired(1800));
        assert!(token.is_expired(7200));
    }

    #[tokio::test]
    async fn test_cached_token_retrieval() {
        let manager = test_manager();

        assert!(manager.get_cached_token().await.is_none());

        {
            let mut cache = manager.token_cache.write().await;
            *cache = Some(AccessToken::new("cached_token".to_string(), 3600));
        }

        assert_eq!(
            manager.get_cached_token().await,
            Some("cached_token".to_string())
        );

        manager.invalidate().await;
        assert!(manager.get_cached_token().await.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_not_returned() {
        let manager = test_manager();

        {
            let mut cache = manager.token_cache.write().await;
            // Expires within the 60-second buffer.
            *cache = Some(AccessToken::new("stale".to_string(), 30));
        }

        assert!(manager.get_cached_token().await.is_none());
    }
}
