//! Service abstractions at the component seams.
//!
//! The uploader and publisher depend on these traits rather than on the
//! concrete WeChat/DeepSeek clients, which keeps them testable with
//! in-memory stubs.

use crate::article::MediaKind;
use crate::error::Result;
use crate::publish::DraftArticle;
use async_trait::async_trait;
use std::path::Path;

/// Result of a single media upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    /// Identifier WeChat assigns to the uploaded file
    pub media_id: String,
    /// CDN URL, present for permanent material only
    pub url: Option<String>,
}

/// Uploads media files to the platform.
#[async_trait]
pub trait MediaUpload: Send + Sync {
    /// Uploads the file at `path` as the given media kind.
    ///
    /// Permanent uploads return a CDN URL alongside the media id;
    /// temporary uploads return the id alone.
    async fn upload_media(
        &self,
        path: &Path,
        kind: MediaKind,
        permanent: bool,
    ) -> Result<UploadedMedia>;
}

#[async_trait]
impl<T: MediaUpload + ?Sized> MediaUpload for std::sync::Arc<T> {
    async fn upload_media(
        &self,
        path: &Path,
        kind: MediaKind,
        permanent: bool,
    ) -> Result<UploadedMedia> {
        (**self).upload_media(path, kind, permanent).await
    }
}

/// Draft lifecycle operations on the platform.
#[async_trait]
pub trait DraftApi: Send + Sync {
    /// Creates a new draft and returns its media id.
    async fn create_draft(&self, article: &DraftArticle) -> Result<String>;

    /// Replaces the article at `index` inside an existing draft.
    async fn update_draft(
        &self,
        draft_media_id: &str,
        index: u32,
        article: &DraftArticle,
    ) -> Result<()>;

    /// Looks up an existing draft whose first article matches `title`.
    async fn find_draft_by_title(&self, title: &str) -> Result<Option<String>>;
}

/// Generates a short summary of article text.
#[async_trait]
pub trait Summarize: Send + Sync {
    /// Summarizes `text` into at most `max_chars` characters.
    async fn summarize(&self, text: &str, max_chars: usize) -> Result<String>;
}
