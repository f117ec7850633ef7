//! HTTP plumbing for the WeChat API: a reqwest wrapper with retry and
//! backoff, plus the response envelope and payload types.

use crate::config::Config;
use crate::error::{PublishError, Result};
use anyhow::anyhow;
use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// HTTP client for WeChat API calls with automatic retry.
#[derive(Debug, Clone)]
pub struct WeChatHttpClient {
    client: Client,
    base_url: String,
    retry: crate::config::RetryConfig,
    base_delay: Duration,
    max_delay: Duration,
}

impl WeChatHttpClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(&config.http.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: config.http.base_url.clone(),
            retry: config.retry.clone(),
            base_delay: config.retry_base_delay(),
            max_delay: config.retry_max_delay(),
        })
    }

    /// GET against a bare endpoint with query parameters.
    pub async fn get_with_query(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.execute_with_retry(|| self.client.get(&url).query(query).send())
            .await
    }

    /// POST with a JSON body, authenticated by access token.
    pub async fn post_json_with_token<T: Serialize>(
        &self,
        endpoint: &str,
        access_token: &str,
        body: &T,
    ) -> Result<Response> {
        let url = format!("{}{}?access_token={}", self.base_url, endpoint, access_token);
        self.execute_with_retry(|| self.client.post(&url).json(body).send())
            .await
    }

    /// Uploads a file as multipart form data under the `media` field.
    pub async fn upload_file(
        &self,
        endpoint_with_query: &str,
        access_token: &str,
        file_data: Vec<u8>,
        filename: &str,
    ) -> Result<Response> {
        let safe_filename = crate::utils::sanitize_filename(filename);
        let url = format!(
            "{}{}&access_token={}",
            self.base_url, endpoint_with_query, access_token
        );

        let mime_type = mime_guess::from_path(&safe_filename)
            .first_or_octet_stream()
            .to_string();

        let client = self.client.clone();
        self.execute_with_retry(move || {
            let part = multipart::Part::bytes(file_data.clone())
                .file_name(safe_filename.clone())
                .mime_str(&mime_type)
                .unwrap();
            let form = multipart::Form::new().part("media", part);
            client.post(&url).multipart(form).send()
        })
        .await
    }

    /// Executes a request, retrying retryable failures with exponential
    /// backoff and jitter.
    async fn execute_with_retry<F, Fut>(&self, mut operation: F) -> Result<Response>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<Response, reqwest::Error>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry.max_attempts {
            let error = match operation().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unreadable body".to_string());
                    if !status.is_server_error() {
                        return Err(PublishError::Internal(anyhow!("HTTP {status}: {body}")));
                    }
                    PublishError::Internal(anyhow!("HTTP {status}: {body}"))
                }
                Err(e) if e.is_timeout() => PublishError::Timeout,
                Err(e) => PublishError::Network(e),
            };

            if attempt >= self.retry.max_attempts {
                return Err(error);
            }

            let delay = self.backoff_delay(attempt);
            warn!(
                attempt,
                max_attempts = self.retry.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "request failed, retrying"
            );
            last_error = Some(error);
            sleep(delay).await;
        }

        Err(last_error
            .unwrap_or_else(|| PublishError::Internal(anyhow!("retry loop ended without error"))))
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.retry.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let delay = Duration::from_millis((self.base_delay.as_millis() as f64 * factor) as u64);
        let delay = delay.min(self.max_delay);

        if self.retry.enable_jitter {
            let jitter = fastrand::u64(0..=delay.as_millis() as u64 / 4);
            (delay + Duration::from_millis(jitter)).min(self.max_delay)
        } else {
            delay
        }
    }

    /// Decodes a WeChat envelope response into its payload.
    pub async fn decode<T>(&self, response: Response) -> Result<T>
    where
        T: serde::de::DeserializeOwned + std::fmt::Debug,
    {
        let envelope: WeChatResponse<T> = response.json().await?;
        debug!(errcode = envelope.errcode, "decoded API response");
        envelope.into_result()
    }
}

/// Standard WeChat API response envelope.
#[derive(Debug, Deserialize, Serialize)]
pub struct WeChatResponse<T> {
    /// Error code (0 for success)
    #[serde(default)]
    pub errcode: i32,
    /// Error message
    #[serde(default)]
    pub errmsg: String,
    /// Response data (flattened)
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T: std::fmt::Debug> WeChatResponse<T> {
    /// Converts the envelope to a Result, surfacing API errors verbatim.
    pub fn into_result(self) -> Result<T> {
        if self.errcode == 0 {
            self.data.ok_or_else(|| {
                PublishError::Internal(anyhow!(
                    "missing response data. errcode: {}, errmsg: {}",
                    self.errcode,
                    self.errmsg
                ))
            })
        } else {
            Err(PublishError::from_api_response(self.errcode, self.errmsg))
        }
    }
}

/// Access token response.
#[derive(Debug, Deserialize, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// Temporary media upload response. Thumb uploads report the id under
/// `thumb_media_id` instead of `media_id`.
#[derive(Debug, Deserialize, Serialize)]
pub struct TempMediaResponse {
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub thumb_media_id: Option<String>,
}

impl TempMediaResponse {
    pub fn into_media_id(self) -> Result<String> {
        self.media_id
            .or(self.thumb_media_id)
            .ok_or_else(|| PublishError::Internal(anyhow!("upload response carried no media id")))
    }
}

/// Permanent material upload response.
#[derive(Debug, Deserialize, Serialize)]
pub struct MaterialUploadResponse {
    pub media_id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Draft creation response.
#[derive(Debug, Deserialize, Serialize)]
pub struct DraftResponse {
    pub media_id: String,
}
