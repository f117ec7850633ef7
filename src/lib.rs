//! # wechat-draft-pub
//!
//! Publishes a Markdown article to a WeChat Official Account as a draft:
//! parse Markdown with frontmatter, upload the referenced media, optionally
//! generate a digest through a DeepSeek-style LLM API, and create or update
//! the draft through the WeChat REST API.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wechat_draft_pub::{publish_file, Config, Result};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let outcome = publish_file(&config, Path::new("./article.md"), true).await?;
//!     println!("Draft media id: {}", outcome.media_id());
//!     Ok(())
//! }
//! ```

pub mod article;
pub mod assemble;
pub mod auth;
pub mod config;
pub mod deepseek;
pub mod error;
pub mod http;
pub mod markdown;
pub mod publish;
pub mod traits;
pub mod upload;
pub mod utils;
pub mod wechat;

pub use article::{Article, ContentElement, MediaKind, MediaPlaceholder};
pub use config::Config;
pub use error::{PublishError, Result};
pub use publish::{PublishOutcome, Publisher};

use crate::assemble::HtmlAssembler;
use crate::deepseek::DeepSeekClient;
use crate::markdown::MarkdownParser;
use crate::traits::Summarize;
use crate::upload::MediaUploader;
use crate::wechat::WeChatClient;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// End-to-end workflow: parse, upload media, assemble, and submit the
/// article at `path` as a draft.
pub async fn publish_file(
    config: &Config,
    path: &Path,
    check_existing: bool,
) -> Result<PublishOutcome> {
    let parser = MarkdownParser::new(config);
    let mut article = parser.parse_file(path).await?;

    let client = Arc::new(WeChatClient::new(config)?);
    let uploader = MediaUploader::new(client.clone(), config.paths.clone());
    uploader.upload_article_media(&mut article).await?;

    let css = match config.paths.css_template.as_ref() {
        Some(template) => match tokio::fs::read_to_string(template).await {
            Ok(css) => Some(css),
            Err(e) => {
                warn!(path = %template.display(), error = %e, "could not read CSS template, using default");
                None
            }
        },
        None => None,
    };

    let summarizer: Option<Arc<dyn Summarize>> = match config.deepseek.clone() {
        Some(deepseek) => Some(Arc::new(DeepSeekClient::new(
            deepseek,
            config.request_timeout(),
        )?)),
        None => None,
    };

    let publisher = Publisher::new(
        client,
        summarizer,
        HtmlAssembler::new(css),
        config.article.clone(),
        config.paths.clone(),
    );
    publisher.publish_draft(&mut article, check_existing).await
}
