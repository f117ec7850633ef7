//! WeChat Official Account API client.
//!
//! Implements the media upload and draft capabilities against the real
//! endpoints. Auth-class error codes from any call invalidate the cached
//! access token so the next request fetches a fresh one.

use crate::article::MediaKind;
use crate::auth::TokenManager;
use crate::config::Config;
use crate::error::{PublishError, Result};
use crate::http::{DraftResponse, MaterialUploadResponse, TempMediaResponse, WeChatHttpClient};
use crate::publish::DraftArticle;
use crate::traits::{DraftApi, MediaUpload, UploadedMedia};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error codes that mean the cached access token is no longer usable.
const AUTH_ERROR_CODES: &[i32] = &[40001, 40014, 42001];

/// Page size and scan bound for draft lookups by title.
const DRAFT_PAGE_SIZE: u32 = 20;
const DRAFT_SCAN_LIMIT: u32 = 100;

/// Client for the WeChat Official Account API.
pub struct WeChatClient {
    http: Arc<WeChatHttpClient>,
    tokens: TokenManager,
}

impl WeChatClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Arc::new(WeChatHttpClient::new(config)?);
        let tokens = TokenManager::new(&config.credentials, http.clone());
        Ok(Self { http, tokens })
    }

    /// Decodes a response, invalidating the token cache on auth errors.
    async fn decode_checked<T>(&self, response: reqwest::Response) -> Result<T>
    where
        T: serde::de::DeserializeOwned + std::fmt::Debug,
    {
        let result = self.http.decode(response).await;
        if let Err(PublishError::WeChatApi { code, .. }) = &result {
            if AUTH_ERROR_CODES.contains(code) {
                warn!(code, "auth error from API, invalidating cached token");
                self.tokens.invalidate().await;
            }
        }
        result
    }

    async fn read_media_file(&self, path: &Path) -> Result<(Vec<u8>, String)> {
        if !path.is_file() {
            return Err(PublishError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| PublishError::file_error(path.display().to_string(), e.to_string()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("media")
            .to_string();
        Ok((data, filename))
    }
}

#[async_trait]
impl MediaUpload for WeChatClient {
    async fn upload_media(
        &self,
        path: &Path,
        kind: MediaKind,
        permanent: bool,
    ) -> Result<UploadedMedia> {
        let (data, filename) = self.read_media_file(path).await?;
        let token = self.tokens.get_access_token().await?;

        let endpoint = if permanent {
            format!("/cgi-bin/material/add_material?type={}", kind.api_type())
        } else {
            format!("/cgi-bin/media/upload?type={}", kind.api_type())
        };
        debug!(path = %path.display(), kind = %kind, permanent, "uploading media");

        let response = self.http.upload_file(&endpoint, &token, data, &filename).await?;

        if permanent {
            let material: MaterialUploadResponse = self.decode_checked(response).await?;
            Ok(UploadedMedia {
                media_id: material.media_id,
                url: material.url,
            })
        } else {
            let temp: TempMediaResponse = self.decode_checked(response).await?;
            Ok(UploadedMedia {
                media_id: temp.into_media_id()?,
                url: None,
            })
        }
    }
}

#[async_trait]
impl DraftApi for WeChatClient {
    async fn create_draft(&self, article: &DraftArticle) -> Result<String> {
        let token = self.tokens.get_access_token().await?;
        let body = json!({ "articles": [article] });

        let response = self
            .http
            .post_json_with_token("/cgi-bin/draft/add", &token, &body)
            .await?;
        let draft: DraftResponse = self.decode_checked(response).await?;
        Ok(draft.media_id)
    }

    async fn update_draft(
        &self,
        draft_media_id: &str,
        index: u32,
        article: &DraftArticle,
    ) -> Result<()> {
        let token = self.tokens.get_access_token().await?;
        let body = json!({
            "media_id": draft_media_id,
            "index": index,
            "articles": article,
        });

        let response = self
            .http
            .post_json_with_token("/cgi-bin/draft/update", &token, &body)
            .await?;

        // Update responses carry only the envelope.
        let envelope: crate::http::WeChatResponse<serde_json::Value> = response.json().await?;
        if envelope.errcode != 0 {
            let err = PublishError::from_api_response(envelope.errcode, envelope.errmsg);
            if let PublishError::WeChatApi { code, .. } = &err {
                if AUTH_ERROR_CODES.contains(code) {
                    self.tokens.invalidate().await;
                }
            }
            return Err(err);
        }
        Ok(())
    }

    /// Pages through the draft list comparing the first article's title.
    /// The scan is bounded so a huge draft box cannot stall a run.
    async fn find_draft_by_title(&self, title: &str) -> Result<Option<String>> {
        let token = self.tokens.get_access_token().await?;
        let mut offset = 0u32;

        while offset < DRAFT_SCAN_LIMIT {
            let body = json!({
                "offset": offset,
                "count": DRAFT_PAGE_SIZE,
                "no_content": 1,
            });
            let response = self
                .http
                .post_json_with_token("/cgi-bin/draft/batchget", &token, &body)
                .await?;
            let page: DraftListResponse = self.decode_checked(response).await?;

            for item in &page.item {
                let first_title = item
                    .content
                    .news_item
                    .first()
                    .map(|news| news.title.as_str());
                if first_title == Some(title) {
                    debug!(media_id = %item.media_id, "found existing draft by title");
                    return Ok(Some(item.media_id.clone()));
                }
            }

            offset += page.item.len() as u32;
            if page.item.is_empty() || offset >= page.total_count {
                break;
            }
        }

        Ok(None)
    }
}

/// One page of the draft list.
#[derive(Debug, Deserialize, Serialize)]
pub struct DraftListResponse {
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub item_count: u32,
    #[serde(default)]
    pub item: Vec<DraftItem>,
}

/// A draft entry in the list.
#[derive(Debug, Deserialize, Serialize)]
pub struct DraftItem {
    pub media_id: String,
    pub content: DraftContent,
}

/// Content of a draft entry.
#[derive(Debug, Deserialize, Serialize)]
pub struct DraftContent {
    #[serde(default)]
    pub news_item: Vec<NewsItem>,
}

/// A single article inside a draft entry.
#[derive(Debug, Deserialize, Serialize)]
pub struct NewsItem {
    #[serde(default)]
    pub title: String,
}
