//! Draft publishing state machine.
//!
//! The publisher walks an article through a fixed sequence of stages and
//! either creates a new draft or updates the one already carrying the
//! same title. Each transition is logged; a failed precondition or API
//! call ends the run at that stage.

use crate::article::Article;
use crate::assemble::HtmlAssembler;
use crate::config::{ArticleConfig, PathsConfig};
use crate::error::{PublishError, Result};
use crate::traits::{DraftApi, Summarize};
use crate::utils::{sanitize_filename, truncate_text};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stages of a publish run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    Init,
    CoverReady,
    ContentAssembled,
    SummaryReady,
    Submitting,
}

impl std::fmt::Display for PublishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PublishStage::Init => "init",
            PublishStage::CoverReady => "cover_ready",
            PublishStage::ContentAssembled => "content_assembled",
            PublishStage::SummaryReady => "summary_ready",
            PublishStage::Submitting => "submitting",
        };
        f.write_str(name)
    }
}

/// Final result of a publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A new draft was created with this media id
    Created(String),
    /// An existing same-title draft was updated in place
    Updated(String),
}

impl PublishOutcome {
    /// The draft media id regardless of how it was reached.
    pub fn media_id(&self) -> &str {
        match self {
            PublishOutcome::Created(id) | PublishOutcome::Updated(id) => id,
        }
    }
}

/// One article of a draft submission, serialized as the API expects.
/// The comment and originality flags are integers on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftArticle {
    pub title: String,
    pub author: String,
    pub digest: String,
    pub content: String,
    pub thumb_media_id: String,
    pub need_open_comment: u8,
    pub only_fans_can_comment: u8,
    pub is_original: u8,
}

/// Publishes assembled articles as drafts.
pub struct Publisher {
    draft_api: Arc<dyn DraftApi>,
    summarizer: Option<Arc<dyn Summarize>>,
    assembler: HtmlAssembler,
    article_cfg: ArticleConfig,
    paths: PathsConfig,
}

impl Publisher {
    pub fn new(
        draft_api: Arc<dyn DraftApi>,
        summarizer: Option<Arc<dyn Summarize>>,
        assembler: HtmlAssembler,
        article_cfg: ArticleConfig,
        paths: PathsConfig,
    ) -> Self {
        Self {
            draft_api,
            summarizer,
            assembler,
            article_cfg,
            paths,
        }
    }

    /// Runs the publish sequence for an article whose media has already
    /// been uploaded. With `check_existing`, a draft carrying the same
    /// title is updated in place instead of creating a duplicate.
    pub async fn publish_draft(
        &self,
        article: &mut Article,
        check_existing: bool,
    ) -> Result<PublishOutcome> {
        let mut stage = PublishStage::Init;
        info!(stage = %stage, title = %article.title, "starting publish run");

        let thumb_media_id = article
            .cover
            .as_ref()
            .and_then(|c| c.uploaded_media_id.clone())
            .ok_or_else(|| PublishError::MissingCover {
                title: article.title.clone(),
            })?;
        stage = PublishStage::CoverReady;
        info!(stage = %stage, thumb_media_id = %thumb_media_id, "cover verified");

        let final_html = self.assembler.assemble(article)?;
        article.final_html = Some(final_html.clone());
        stage = PublishStage::ContentAssembled;
        info!(stage = %stage, html_len = final_html.len(), "content assembled");

        let summary = self.resolve_summary(article).await;
        article.summary = Some(summary.clone());
        stage = PublishStage::SummaryReady;
        info!(stage = %stage, summary_len = summary.chars().count(), "summary ready");

        self.write_preview(article, &final_html).await;

        let payload = self.build_payload(article, &thumb_media_id, &summary, &final_html);
        stage = PublishStage::Submitting;
        info!(stage = %stage, check_existing, "submitting draft");

        if check_existing {
            if let Some(existing_id) = self.draft_api.find_draft_by_title(&article.title).await? {
                self.draft_api
                    .update_draft(&existing_id, 0, &payload)
                    .await?;
                info!(media_id = %existing_id, "updated existing draft");
                return Ok(PublishOutcome::Updated(existing_id));
            }
            debug!(title = %article.title, "no existing draft with this title");
        }

        let media_id = self.draft_api.create_draft(&payload).await?;
        info!(media_id = %media_id, "created draft");
        Ok(PublishOutcome::Created(media_id))
    }

    /// Existing summary wins; otherwise the summarizer runs over the
    /// article's plain text. Summarizer failure costs only the digest.
    async fn resolve_summary(&self, article: &Article) -> String {
        if let Some(summary) = article.summary.as_ref() {
            debug!("reusing existing summary");
            return summary.clone();
        }

        let Some(summarizer) = self.summarizer.as_ref() else {
            return String::new();
        };

        let source = truncate_text(
            &article.plain_text(),
            self.article_cfg.summary_source_max_chars,
        );
        if source.is_empty() {
            return String::new();
        }

        match summarizer
            .summarize(&source, self.article_cfg.digest_max_chars)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "summary generation failed, continuing without digest");
                String::new()
            }
        }
    }

    /// Writes the assembled HTML to the output directory. Never fatal.
    async fn write_preview(&self, article: &Article, html: &str) {
        let Some(output_dir) = self.paths.output_dir.as_ref() else {
            return;
        };

        let file_name = format!("{}.html", sanitize_filename(&article.title));
        let path = output_dir.join(file_name);
        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            warn!(error = %e, "could not create preview directory");
            return;
        }
        match tokio::fs::write(&path, html).await {
            Ok(()) => debug!(path = %path.display(), "wrote HTML preview"),
            Err(e) => warn!(error = %e, path = %path.display(), "could not write HTML preview"),
        }
    }

    fn build_payload(
        &self,
        article: &Article,
        thumb_media_id: &str,
        summary: &str,
        final_html: &str,
    ) -> DraftArticle {
        let author = article
            .author()
            .map(str::to_string)
            .unwrap_or_else(|| self.article_cfg.default_author.clone());

        DraftArticle {
            title: article.title.clone(),
            author,
            digest: truncate_text(summary, self.article_cfg.digest_max_chars),
            content: final_html.to_string(),
            thumb_media_id: thumb_media_id.to_string(),
            need_open_comment: self.article_cfg.enable_comments as u8,
            only_fans_can_comment: self.article_cfg.fans_only_comments as u8,
            is_original: self.article_cfg.mark_as_original as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{ContentElement, MediaKind, MediaPlaceholder};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubDraftApi {
        existing: Option<(String, String)>,
        creates: Mutex<Vec<DraftArticle>>,
        updates: Mutex<Vec<(String, u32, DraftArticle)>>,
        finds: Mutex<Vec<String>>,
    }

    impl StubDraftApi {
        fn with_existing(title: &str, media_id: &str) -> Self {
            Self {
                existing: Some((title.to_string(), media_id.to_string())),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl DraftApi for StubDraftApi {
        async fn create_draft(&self, article: &DraftArticle) -> crate::error::Result<String> {
            self.creates.lock().unwrap().push(article.clone());
            Ok("NEW_DRAFT".to_string())
        }

        async fn update_draft(
            &self,
            draft_media_id: &str,
            index: u32,
            article: &DraftArticle,
        ) -> crate::error::Result<()> {
            self.updates.lock().unwrap().push((
                draft_media_id.to_string(),
                index,
                article.clone(),
            ));
            Ok(())
        }

        async fn find_draft_by_title(&self, title: &str) -> crate::error::Result<Option<String>> {
            self.finds.lock().unwrap().push(title.to_string());
            Ok(self
                .existing
                .as_ref()
                .filter(|(t, _)| t == title)
                .map(|(_, id)| id.clone()))
        }
    }

    struct StubSummarizer {
        result: crate::error::Result<String>,
    }

    #[async_trait]
    impl Summarize for StubSummarizer {
        async fn summarize(&self, _text: &str, _max_chars: usize) -> crate::error::Result<String> {
            match &self.result {
                Ok(s) => Ok(s.clone()),
                Err(_) => Err(PublishError::Timeout),
            }
        }
    }

    fn uploaded_article(title: &str) -> Article {
        let mut cover = MediaPlaceholder::new("cover", MediaKind::Thumb);
        cover.uploaded_media_id = Some("THUMB_ID".to_string());
        Article {
            title: title.to_string(),
            cover: Some(cover),
            body_html: Some("<p>Body text.</p>".to_string()),
            elements: vec![ContentElement::Paragraph {
                text: "Body text.".to_string(),
            }],
            ..Default::default()
        }
    }

    fn publisher(api: Arc<StubDraftApi>, summarizer: Option<Arc<dyn Summarize>>) -> Publisher {
        Publisher::new(
            api,
            summarizer,
            HtmlAssembler::default(),
            ArticleConfig::default(),
            PathsConfig {
                output_dir: None,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_creates_when_no_existing_draft() {
        let api = Arc::new(StubDraftApi::default());
        let publisher = publisher(api.clone(), None);
        let mut article = uploaded_article("Fresh");

        let outcome = publisher.publish_draft(&mut article, true).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Created("NEW_DRAFT".to_string()));
        assert_eq!(api.creates.lock().unwrap().len(), 1);
        assert!(api.updates.lock().unwrap().is_empty());
        assert_eq!(api.finds.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_updates_when_existing_draft_matches_title() {
        let api = Arc::new(StubDraftApi::with_existing("Known", "OLD_DRAFT"));
        let publisher = publisher(api.clone(), None);
        let mut article = uploaded_article("Known");

        let outcome = publisher.publish_draft(&mut article, true).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Updated("OLD_DRAFT".to_string()));

        let updates = api.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "OLD_DRAFT");
        assert_eq!(updates[0].1, 0);
        assert!(api.creates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skipping_existing_check_always_creates() {
        let api = Arc::new(StubDraftApi::with_existing("Known", "OLD_DRAFT"));
        let publisher = publisher(api.clone(), None);
        let mut article = uploaded_article("Known");

        let outcome = publisher.publish_draft(&mut article, false).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Created(_)));
        assert!(api.finds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_cover_media_id_is_terminal() {
        let api = Arc::new(StubDraftApi::default());
        let publisher = publisher(api.clone(), None);
        let mut article = uploaded_article("Test");
        article.cover.as_mut().unwrap().uploaded_media_id = None;

        let err = publisher.publish_draft(&mut article, true).await.unwrap_err();
        assert!(matches!(err, PublishError::MissingCover { .. }));
        assert!(api.creates.lock().unwrap().is_empty());
        assert!(api.finds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarizer_failure_is_not_fatal() {
        let api = Arc::new(StubDraftApi::default());
        let summarizer: Arc<dyn Summarize> = Arc::new(StubSummarizer {
            result: Err(PublishError::Timeout),
        });
        let publisher = publisher(api.clone(), Some(summarizer));
        let mut article = uploaded_article("Test");

        let outcome = publisher.publish_draft(&mut article, false).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Created(_)));
        assert_eq!(api.creates.lock().unwrap()[0].digest, "");
    }

    #[tokio::test]
    async fn test_existing_summary_is_reused() {
        let api = Arc::new(StubDraftApi::default());
        let summarizer: Arc<dyn Summarize> = Arc::new(StubSummarizer {
            result: Ok("generated".to_string()),
        });
        let publisher = publisher(api.clone(), Some(summarizer));
        let mut article = uploaded_article("Test");
        article.summary = Some("handwritten digest".to_string());

        publisher.publish_draft(&mut article, false).await.unwrap();
        assert_eq!(
            api.creates.lock().unwrap()[0].digest,
            "handwritten digest"
        );
    }

    #[tokio::test]
    async fn test_payload_flags_and_author() {
        let api = Arc::new(StubDraftApi::default());
        let mut cfg = ArticleConfig::default();
        cfg.default_author = "Fallback".to_string();
        cfg.mark_as_original = true;
        let publisher = Publisher::new(
            api.clone(),
            None,
            HtmlAssembler::default(),
            cfg,
            PathsConfig {
                output_dir: None,
                ..Default::default()
            },
        );
        let mut article = uploaded_article("Test");

        publisher.publish_draft(&mut article, false).await.unwrap();
        let payload = &api.creates.lock().unwrap()[0];
        assert_eq!(payload.author, "Fallback");
        assert_eq!(payload.need_open_comment, 1);
        assert_eq!(payload.only_fans_can_comment, 0);
        assert_eq!(payload.is_original, 1);
        assert_eq!(payload.thumb_media_id, "THUMB_ID");
    }

    #[tokio::test]
    async fn test_preview_is_written_when_output_dir_set() {
        let dir = tempfile::TempDir::new().unwrap();
        let api = Arc::new(StubDraftApi::default());
        let publisher = Publisher::new(
            api,
            None,
            HtmlAssembler::default(),
            ArticleConfig::default(),
            PathsConfig {
                output_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
        );
        let mut article = uploaded_article("Preview Me");

        publisher.publish_draft(&mut article, false).await.unwrap();
        let preview = std::fs::read_to_string(dir.path().join("Preview Me.html")).unwrap();
        assert!(preview.contains("Body text."));
    }
}
