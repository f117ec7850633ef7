//! Media upload orchestration.
//!
//! Applies the upload policy over a [`MediaUpload`] capability: the cover
//! goes first as permanent thumb material and any failure there aborts
//! the run; content placeholders follow sequentially and individual
//! failures only cost the affected media its slot in the final HTML.

use crate::article::{Article, MediaKind};
use crate::config::PathsConfig;
use crate::error::{PublishError, Result};
use crate::traits::MediaUpload;
use crate::utils::{find_by_stem, resolve_path, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Uploads an article's media through a platform capability.
pub struct MediaUploader<U: MediaUpload> {
    client: U,
    paths: PathsConfig,
}

impl<U: MediaUpload> MediaUploader<U> {
    pub fn new(client: U, paths: PathsConfig) -> Self {
        Self { client, paths }
    }

    /// Uploads the cover and all content media, recording results on the
    /// article's placeholders.
    ///
    /// Cover failure is fatal and leaves content placeholders untouched.
    /// Content failures are logged and skipped; the call succeeds as long
    /// as the cover uploaded.
    pub async fn upload_article_media(&self, article: &mut Article) -> Result<()> {
        self.upload_cover(article).await?;

        let total = article.placeholders.len();
        for index in 0..total {
            let (id, kind, declared_path, already_uploaded) = {
                let p = &article.placeholders[index];
                (p.id.clone(), p.kind, p.file_path.clone(), p.is_uploaded())
            };

            if already_uploaded {
                debug!(id = %id, "placeholder already uploaded, skipping");
                continue;
            }

            let Some(path) = self.resolve_content_path(&id, declared_path.as_deref()) else {
                warn!(id = %id, "no file found for placeholder, skipping");
                continue;
            };

            match self.client.upload_media(&path, kind, true).await {
                Ok(media) => {
                    debug!(id = %id, media_id = %media.media_id, "uploaded content media");
                    let p = &mut article.placeholders[index];
                    p.uploaded_media_id = Some(media.media_id);
                    p.uploaded_url = media.url;
                }
                Err(e) => {
                    warn!(id = %id, path = %path.display(), error = %e, "content upload failed, skipping");
                }
            }
        }

        info!(
            uploaded = article.uploaded_count(),
            total, "content media upload finished"
        );
        Ok(())
    }

    async fn upload_cover(&self, article: &mut Article) -> Result<()> {
        let Some(cover) = article.cover.as_ref() else {
            return Err(PublishError::MissingCover {
                title: article.title.clone(),
            });
        };

        if cover.is_uploaded() {
            debug!("cover already uploaded, skipping");
            return Ok(());
        }

        let path = cover
            .file_path
            .clone()
            .filter(|p| p.is_file())
            .ok_or_else(|| PublishError::MissingCover {
                title: article.title.clone(),
            })?;

        let media = self.client.upload_media(&path, MediaKind::Thumb, true).await?;

        info!(media_id = %media.media_id, path = %path.display(), "cover uploaded");
        if let Some(cover) = article.cover.as_mut() {
            cover.uploaded_media_id = Some(media.media_id);
            cover.uploaded_url = media.url;
        }
        article.cover_file_path = Some(path);
        Ok(())
    }

    /// Content file resolution: the declared path against the input dir,
    /// then a file named after the id in the content media dir.
    fn resolve_content_path(
        &self,
        id: &str,
        declared: Option<&std::path::Path>,
    ) -> Option<PathBuf> {
        if let Some(declared) = declared {
            let resolved = resolve_path(&self.paths.input_dir, declared);
            if resolved.is_file() {
                return Some(resolved);
            }
        }

        let exact = self.paths.content_dir.join(id);
        if exact.is_file() {
            return Some(exact);
        }

        find_by_stem(&self.paths.content_dir, id, IMAGE_EXTENSIONS)
            .or_else(|| find_by_stem(&self.paths.content_dir, id, VIDEO_EXTENSIONS))
    }
}
