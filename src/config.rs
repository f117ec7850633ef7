//! Configuration for the publisher.
//!
//! A single [`Config`] struct is constructed once at process start (from
//! environment variables plus defaults), validated, and passed by reference
//! into each component constructor. There is no ambient global state.
//!
//! Environment variables:
//!
//! - `WECHAT_APP_ID` / `WECHAT_APP_SECRET`: required credentials
//! - `WECHAT_DEFAULT_AUTHOR`: author used when frontmatter has none
//! - `WECHAT_INPUT_DIR`, `WECHAT_COVER_DIR`, `WECHAT_CONTENT_DIR`,
//!   `WECHAT_OUTPUT_DIR`: media/preview directories
//! - `WECHAT_CSS_TEMPLATE`: optional stylesheet for the assembled HTML
//! - `WECHAT_BASE_URL`, `WECHAT_REQUEST_TIMEOUT`, `WECHAT_MAX_RETRIES`
//! - `DEEPSEEK_API_KEY`, `DEEPSEEK_API_BASE_URL`, `DEEPSEEK_MODEL`:
//!   summary generation is enabled only when the key is present

use crate::error::{PublishError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure, assembled once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// WeChat Official Account credentials
    pub credentials: Credentials,
    /// Optional DeepSeek summarization settings (None disables summaries)
    pub deepseek: Option<DeepSeekConfig>,
    /// Input/output directory layout
    pub paths: PathsConfig,
    /// Article payload defaults
    pub article: ArticleConfig,
    /// HTTP client configuration
    pub http: HttpConfig,
    /// Retry configuration
    pub retry: RetryConfig,
}

/// WeChat application credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

/// DeepSeek chat-completions settings for summary generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepSeekConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Directory layout for media resolution and HTML previews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base directory for resolving relative media paths from Markdown
    pub input_dir: PathBuf,
    /// Directory searched when a cover is referenced by identifier
    pub cover_dir: PathBuf,
    /// Directory searched when a content placeholder has no declared path
    pub content_dir: PathBuf,
    /// Where to write the HTML preview; None skips the preview
    pub output_dir: Option<PathBuf>,
    /// Optional CSS file embedded in the assembled document
    pub css_template: Option<PathBuf>,
}

/// Defaults applied when building the draft payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleConfig {
    /// Author used when frontmatter carries none
    pub default_author: String,
    /// Open the comment section on the published article
    pub enable_comments: bool,
    /// Restrict comments to followers
    pub fans_only_comments: bool,
    /// Mark the article as original content
    pub mark_as_original: bool,
    /// Character ceiling for the draft digest (WeChat caps digests)
    pub digest_max_chars: usize,
    /// Character ceiling on the plain text handed to the summarizer
    pub summary_source_max_chars: usize,
}

/// HTTP client configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 30)
    pub request_timeout_secs: u64,
    /// Connection timeout in seconds (default: 10)
    pub connect_timeout_secs: u64,
    /// Base URL for WeChat API (default: "https://api.weixin.qq.com")
    pub base_url: String,
    /// User agent string for requests
    pub user_agent: String,
}

/// Retry configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    pub max_attempts: u32,
    /// Base delay between retries in milliseconds (default: 500)
    pub base_delay_ms: u64,
    /// Maximum delay between retries in seconds (default: 30)
    pub max_delay_secs: u64,
    /// Exponential backoff factor (default: 2.0)
    pub backoff_factor: f64,
    /// Whether to add jitter to retry delays (default: true)
    pub enable_jitter: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            deepseek: None,
            paths: PathsConfig::default(),
            article: ArticleConfig::default(),
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/input"),
            cover_dir: PathBuf::from("data/input/cover_images"),
            content_dir: PathBuf::from("data/input/content_images"),
            output_dir: Some(PathBuf::from("data/output")),
            css_template: None,
        }
    }
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            default_author: String::new(),
            enable_comments: true,
            fans_only_comments: false,
            mark_as_original: false,
            digest_max_chars: 120,
            summary_source_max_chars: 4000,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            base_url: "https://api.weixin.qq.com".to_string(),
            user_agent: format!("wechat-draft-pub/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_secs: 30,
            backoff_factor: 2.0,
            enable_jitter: true,
        }
    }
}

impl DeepSeekConfig {
    /// Builds a DeepSeek config from an API key plus defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// `WECHAT_APP_ID` and `WECHAT_APP_SECRET` are required; everything
    /// else falls back to defaults. The result is validated.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        config.credentials.app_id = std::env::var("WECHAT_APP_ID")
            .map_err(|_| PublishError::config_error("WECHAT_APP_ID is not set"))?;
        config.credentials.app_secret = std::env::var("WECHAT_APP_SECRET")
            .map_err(|_| PublishError::config_error("WECHAT_APP_SECRET is not set"))?;

        if let Ok(val) = std::env::var("WECHAT_DEFAULT_AUTHOR") {
            config.article.default_author = val;
        }

        if let Ok(val) = std::env::var("WECHAT_INPUT_DIR") {
            config.paths.input_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("WECHAT_COVER_DIR") {
            config.paths.cover_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("WECHAT_CONTENT_DIR") {
            config.paths.content_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("WECHAT_OUTPUT_DIR") {
            config.paths.output_dir = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
        if let Ok(val) = std::env::var("WECHAT_CSS_TEMPLATE") {
            config.paths.css_template = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("WECHAT_BASE_URL") {
            config.http.base_url = val;
        }
        if let Ok(val) = std::env::var("WECHAT_REQUEST_TIMEOUT") {
            config.http.request_timeout_secs = val
                .parse()
                .map_err(|_| PublishError::config_error("Invalid WECHAT_REQUEST_TIMEOUT value"))?;
        }
        if let Ok(val) = std::env::var("WECHAT_MAX_RETRIES") {
            config.retry.max_attempts = val
                .parse()
                .map_err(|_| PublishError::config_error("Invalid WECHAT_MAX_RETRIES value"))?;
        }

        if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
            if !key.is_empty() {
                let mut deepseek = DeepSeekConfig::new(key);
                if let Ok(url) = std::env::var("DEEPSEEK_API_BASE_URL") {
                    deepseek.base_url = url;
                }
                if let Ok(model) = std::env::var("DEEPSEEK_MODEL") {
                    deepseek.model = model;
                }
                config.deepseek = Some(deepseek);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for consistency and constraints.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.app_id.is_empty() {
            return Err(PublishError::config_error("app_id cannot be empty"));
        }
        if self.credentials.app_secret.is_empty() {
            return Err(PublishError::config_error("app_secret cannot be empty"));
        }

        if self.http.request_timeout_secs == 0 {
            return Err(PublishError::config_error(
                "request_timeout_secs must be greater than 0",
            ));
        }
        if self.http.connect_timeout_secs == 0 {
            return Err(PublishError::config_error(
                "connect_timeout_secs must be greater than 0",
            ));
        }
        if self.http.base_url.is_empty() {
            return Err(PublishError::config_error("base_url cannot be empty"));
        }

        if self.retry.max_attempts == 0 {
            return Err(PublishError::config_error(
                "max_attempts must be greater than 0",
            ));
        }
        if self.retry.backoff_factor < 1.0 {
            return Err(PublishError::config_error("backoff_factor must be >= 1.0"));
        }

        if self.article.digest_max_chars == 0 {
            return Err(PublishError::config_error(
                "digest_max_chars must be greater than 0",
            ));
        }

        if let Some(deepseek) = &self.deepseek {
            if deepseek.api_key.is_empty() {
                return Err(PublishError::config_error(
                    "deepseek api_key cannot be empty",
                ));
            }
            if deepseek.base_url.is_empty() {
                return Err(PublishError::config_error(
                    "deepseek base_url cannot be empty",
                ));
            }
        }

        Ok(())
    }

    /// Converts retry config to Duration types for easier use.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry.base_delay_ms)
    }

    /// Converts retry config to Duration types for easier use.
    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_secs(self.retry.max_delay_secs)
    }

    /// Converts HTTP timeout to Duration types for easier use.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Converts HTTP timeout to Duration types for easier use.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            credentials: Credentials {
                app_id: "wx1234567890123456".to_string(),
                app_secret: "secret".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_values() {
        let config = test_config();
        assert!(config.validate().is_ok());

        assert_eq!(config.http.request_timeout_secs, 30);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.article.digest_max_chars, 120);
        assert!(config.deepseek.is_none());
        assert!(config.article.enable_comments);
        assert!(!config.article.mark_as_original);
    }

    #[test]
    fn test_config_validation() {
        let mut config = test_config();
        config.credentials.app_id.clear();
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.retry.backoff_factor = 0.5;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.deepseek = Some(DeepSeekConfig {
            api_key: String::new(),
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_conversions() {
        let config = test_config();

        assert_eq!(config.retry_base_delay(), Duration::from_millis(500));
        assert_eq!(config.retry_max_delay(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_deepseek_defaults() {
        let deepseek = DeepSeekConfig::new("sk-test");
        assert_eq!(deepseek.base_url, "https://api.deepseek.com");
        assert_eq!(deepseek.model, "deepseek-chat");
    }
}
