//! Markdown parsing: frontmatter, title resolution, media placeholder
//! extraction, and body rendering.
//!
//! ## Frontmatter format
//!
//! ```yaml
//! ---
//! title: "Article Title"              # optional, overrides the first H1
//! author: "Author Name"               # optional
//! cover_image: "my-cover"             # file name or stem in the cover dir
//! cover_image_path: "img/cover.jpg"   # or an explicit path
//! ---
//! ```
//!
//! ## Media references
//!
//! Two forms of image link produce placeholders:
//!
//! ```markdown
//! ![Alt](placeholder:diagram.png)   # explicit placeholder id "diagram"
//! ![Alt](images/photo.jpg)          # standard link, id "photo.jpg"
//! ```
//!
//! Remote `http(s)` links are left untouched. Standard destinations are
//! rewritten to `placeholder:<id>` before rendering, so the body HTML
//! carries literal `src="placeholder:<id>"` tokens for the assembler.

use crate::article::{Article, ContentElement, MediaKind, MediaPlaceholder};
use crate::config::{Config, PathsConfig};
use crate::error::{PublishError, Result};
use crate::utils::{find_by_stem, is_remote_url, IMAGE_EXTENSIONS};
use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, ComrakOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Markdown parser producing [`Article`] values.
#[derive(Debug)]
pub struct MarkdownParser {
    options: ComrakOptions<'static>,
    paths: PathsConfig,
    default_author: String,
}

impl MarkdownParser {
    pub fn new(config: &Config) -> Self {
        let mut options = ComrakOptions::<'static>::default();
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.footnotes = true;
        options.extension.tasklist = true;
        options.render.unsafe_ = true;

        Self {
            options,
            paths: config.paths.clone(),
            default_author: config.article.default_author.clone(),
        }
    }

    /// Parses a Markdown file into an [`Article`].
    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Article> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PublishError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PublishError::file_error(path.display().to_string(), e.to_string()))?;

        self.parse(&content, Some(path))
    }

    /// Parses Markdown text. `source_path` feeds the file-stem title
    /// fallback when neither frontmatter nor a level-1 heading names one.
    pub fn parse(&self, markdown: &str, source_path: Option<&Path>) -> Result<Article> {
        let (metadata, body) = self.extract_frontmatter(markdown)?;

        let arena = Arena::new();
        let root = comrak::parse_document(&arena, &body, &self.options);

        let placeholders = self.extract_placeholders(root);
        let title = self.resolve_title(root, &metadata, source_path)?;
        let cover = self.resolve_cover(&metadata, &title)?;
        let elements = self.extract_elements(root, &placeholders)?;

        let mut buf = Vec::new();
        comrak::format_html(root, &self.options, &mut buf)?;
        let body_html = String::from_utf8(buf)
            .map_err(|e| PublishError::parse_error(format!("rendered HTML is not UTF-8: {e}")))?;

        let mut metadata = metadata;
        let author = metadata
            .get("author")
            .cloned()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.default_author.clone());
        if !author.is_empty() {
            metadata.insert("author".to_string(), author);
        }

        debug!(
            title = %title,
            placeholders = placeholders.len(),
            elements = elements.len(),
            "parsed markdown article"
        );

        Ok(Article {
            title,
            elements,
            placeholders,
            cover: Some(cover),
            cover_file_path: None,
            metadata,
            raw_markdown: markdown.to_string(),
            body_html: Some(body_html),
            final_html: None,
            summary: None,
        })
    }

    /// Extracts front matter (simple `key: value` lines) from the source.
    /// An opened but unterminated block is a parse error.
    fn extract_frontmatter(&self, markdown: &str) -> Result<(HashMap<String, String>, String)> {
        let mut metadata = HashMap::new();
        let content = if let Some(stripped) = markdown.strip_prefix("---\n") {
            if let Some(end_pos) = stripped.find("\n---\n") {
                let frontmatter = &stripped[..end_pos];
                let content = &stripped[end_pos + 5..];

                for line in frontmatter.lines() {
                    if let Some((key, value)) = line.split_once(':') {
                        let key = key.trim().to_string();
                        let value = value.trim().trim_matches('"').to_string();
                        metadata.insert(key, value);
                    }
                }

                content.to_string()
            } else if stripped.trim_end() == "" || stripped.trim_end().ends_with("\n---") {
                // Frontmatter block closing at end of input without a
                // trailing newline.
                let end = stripped.trim_end();
                let frontmatter = end.strip_suffix("\n---").unwrap_or("");
                for line in frontmatter.lines() {
                    if let Some((key, value)) = line.split_once(':') {
                        metadata.insert(
                            key.trim().to_string(),
                            value.trim().trim_matches('"').to_string(),
                        );
                    }
                }
                String::new()
            } else {
                return Err(PublishError::parse_error("unterminated frontmatter block"));
            }
        } else {
            markdown.to_string()
        };

        Ok((metadata, content))
    }

    /// Title priority: frontmatter, first level-1 heading, file stem.
    fn resolve_title<'a>(
        &self,
        root: &'a AstNode<'a>,
        metadata: &HashMap<String, String>,
        source_path: Option<&Path>,
    ) -> Result<String> {
        if let Some(title) = metadata.get("title") {
            if !title.is_empty() {
                return Ok(title.clone());
            }
        }

        if let Some(title) = find_h1_title(root) {
            return Ok(title);
        }

        if let Some(stem) = source_path
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
        {
            warn!(title = %stem, "no title in frontmatter or headings, using file stem");
            return Ok(stem.to_string());
        }

        Err(PublishError::parse_error(
            "article has no title and no source file name to fall back to",
        ))
    }

    /// Collects media placeholders from image links and rewrites each
    /// handled destination to its `placeholder:<id>` token.
    fn extract_placeholders<'a>(&self, root: &'a AstNode<'a>) -> Vec<MediaPlaceholder> {
        let mut placeholders: Vec<MediaPlaceholder> = Vec::new();

        for node in root.descendants() {
            let url = match &node.data.borrow().value {
                NodeValue::Image(link) => link.url.clone(),
                _ => continue,
            };
            if is_remote_url(&url) {
                continue;
            }

            let mut alt_text = String::new();
            collect_text(node, &mut alt_text);

            let (id, kind, file_path) = if let Some(rest) = url.strip_prefix("placeholder:") {
                let id = Path::new(rest)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(rest)
                    .to_string();
                let kind = Path::new(rest)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(MediaKind::from_extension)
                    .unwrap_or(MediaKind::Image);
                (id, kind, None)
            } else {
                let path = PathBuf::from(&url);
                let id = path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or(&url)
                    .to_string();
                let kind = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(MediaKind::from_extension)
                    .unwrap_or(MediaKind::Image);
                (id, kind, Some(path))
            };

            if let NodeValue::Image(ref mut link) = node.data.borrow_mut().value {
                link.url = format!("placeholder:{id}");
            }

            if placeholders.iter().any(|p| p.id == id) {
                warn!(id = %id, tag = %url, "duplicate placeholder id, keeping first");
                continue;
            }

            placeholders.push(MediaPlaceholder {
                original_tag: format!("![{alt_text}]({url})"),
                id,
                kind,
                alt_text,
                file_path,
                uploaded_media_id: None,
                uploaded_url: None,
            });
        }

        placeholders
    }

    /// Resolves the cover placeholder from frontmatter or the cover
    /// directory convention (a file whose stem is `cover`).
    fn resolve_cover(
        &self,
        metadata: &HashMap<String, String>,
        title: &str,
    ) -> Result<MediaPlaceholder> {
        if let Some(path) = metadata.get("cover_image_path").filter(|p| !p.is_empty()) {
            let resolved = crate::utils::resolve_path(&self.paths.input_dir, Path::new(path));
            let mut cover = MediaPlaceholder::new("cover", MediaKind::Thumb);
            cover.file_path = Some(resolved);
            return Ok(cover);
        }

        if let Some(id) = metadata.get("cover_image").filter(|i| !i.is_empty()) {
            let mut cover = MediaPlaceholder::new(id.clone(), MediaKind::Thumb);
            let exact = self.paths.cover_dir.join(id);
            cover.file_path = if exact.is_file() {
                Some(exact)
            } else {
                find_by_stem(&self.paths.cover_dir, id, IMAGE_EXTENSIONS)
            };
            return Ok(cover);
        }

        if let Some(path) = find_by_stem(&self.paths.cover_dir, "cover", IMAGE_EXTENSIONS) {
            debug!(path = %path.display(), "using conventional cover file");
            let mut cover = MediaPlaceholder::new("cover", MediaKind::Thumb);
            cover.file_path = Some(path);
            return Ok(cover);
        }

        Err(PublishError::MissingCover {
            title: title.to_string(),
        })
    }

    /// Builds structured body elements from the top-level blocks.
    fn extract_elements<'a>(
        &self,
        root: &'a AstNode<'a>,
        placeholders: &[MediaPlaceholder],
    ) -> Result<Vec<ContentElement>> {
        let mut elements = Vec::new();

        for node in root.children() {
            match &node.data.borrow().value {
                NodeValue::Heading(heading) => {
                    let mut text = String::new();
                    collect_text(node, &mut text);
                    elements.push(ContentElement::Heading {
                        level: heading.level,
                        text: text.trim().to_string(),
                    });
                }
                NodeValue::Paragraph => {
                    self.extract_paragraph(node, placeholders, &mut elements);
                }
                NodeValue::CodeBlock(block) => {
                    let language = if block.info.is_empty() {
                        None
                    } else {
                        Some(block.info.clone())
                    };
                    elements.push(ContentElement::Code {
                        language,
                        code: block.literal.clone(),
                    });
                }
                _ => {
                    let mut buf = Vec::new();
                    comrak::format_html(node, &self.options, &mut buf)?;
                    if let Ok(html) = String::from_utf8(buf) {
                        let html = html.trim().to_string();
                        if !html.is_empty() {
                            elements.push(ContentElement::RawHtml { html });
                        }
                    }
                }
            }
        }

        Ok(elements)
    }

    /// Splits a paragraph into text and media elements in source order.
    fn extract_paragraph<'a>(
        &self,
        node: &'a AstNode<'a>,
        placeholders: &[MediaPlaceholder],
        elements: &mut Vec<ContentElement>,
    ) {
        let mut text = String::new();

        for child in node.children() {
            let placeholder_id = {
                let data = child.data.borrow();
                match &data.value {
                    NodeValue::Image(link) => link
                        .url
                        .strip_prefix("placeholder:")
                        .map(|id| id.to_string()),
                    _ => None,
                }
            };

            if let Some(id) = placeholder_id {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    elements.push(ContentElement::Paragraph {
                        text: trimmed.to_string(),
                    });
                }
                text.clear();
                let kind = placeholders
                    .iter()
                    .find(|p| p.id == id)
                    .map(|p| p.kind)
                    .unwrap_or(MediaKind::Image);
                elements.push(match kind {
                    MediaKind::Video => ContentElement::Video { placeholder_id: id },
                    _ => ContentElement::Image { placeholder_id: id },
                });
            } else {
                collect_text(child, &mut text);
            }
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            elements.push(ContentElement::Paragraph {
                text: trimmed.to_string(),
            });
        }
    }
}

/// Finds the first level-1 heading and returns its text.
fn find_h1_title<'a>(node: &'a AstNode<'a>) -> Option<String> {
    match &node.data.borrow().value {
        NodeValue::Heading(heading) if heading.level == 1 => {
            let mut title = String::new();
            collect_text(node, &mut title);
            let title = title.trim();
            (!title.is_empty()).then(|| title.to_string())
        }
        _ => node.children().find_map(find_h1_title),
    }
}

/// Collects the plain text beneath a node.
fn collect_text<'a>(node: &'a AstNode<'a>, out: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(text) => out.push_str(text),
        NodeValue::Code(code) => out.push_str(&code.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}
