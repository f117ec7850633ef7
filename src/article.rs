//! In-memory article model produced by the Markdown parser and threaded
//! through upload, assembly, and publishing.

use std::collections::HashMap;
use std::path::PathBuf;

/// Kind of media behind a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    /// Cover thumbnail, uploaded as permanent material
    Thumb,
}

impl MediaKind {
    /// WeChat upload `type` parameter for this kind.
    pub fn api_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Thumb => "thumb",
        }
    }

    /// Classifies a file extension. Unknown extensions default to Image.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "mov" | "avi" => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_type())
    }
}

/// A media reference extracted from the Markdown source, tracked from
/// discovery through upload to final substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlaceholder {
    /// The Markdown image link this placeholder was extracted from
    pub original_tag: String,
    /// Identifier substituted into the rendered HTML as `placeholder:<id>`
    pub id: String,
    /// Media classification derived from the file extension
    pub kind: MediaKind,
    /// Alt text from the Markdown image link
    pub alt_text: String,
    /// Local file path declared in the Markdown, if any
    pub file_path: Option<PathBuf>,
    /// WeChat media_id once uploaded
    pub uploaded_media_id: Option<String>,
    /// CDN URL returned for permanent material
    pub uploaded_url: Option<String>,
}

impl MediaPlaceholder {
    pub fn new(id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            original_tag: String::new(),
            id: id.into(),
            kind,
            alt_text: String::new(),
            file_path: None,
            uploaded_media_id: None,
            uploaded_url: None,
        }
    }

    /// Whether this placeholder has completed its upload.
    pub fn is_uploaded(&self) -> bool {
        self.uploaded_media_id.is_some()
    }
}

/// One structural element of the parsed article body.
///
/// The set is closed: downstream consumers match exhaustively and the
/// compiler flags any element kind they fail to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentElement {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    Image { placeholder_id: String },
    Video { placeholder_id: String },
    Code { language: Option<String>, code: String },
    /// Rendered HTML for constructs without a dedicated variant
    /// (lists, tables, blockquotes)
    RawHtml { html: String },
}

/// A parsed article with its content, media references, and metadata.
#[derive(Debug, Clone, Default)]
pub struct Article {
    /// Title from frontmatter, the first H1, or the file stem
    pub title: String,
    /// Structured body elements in document order
    pub elements: Vec<ContentElement>,
    /// Content media placeholders in order of first appearance
    pub placeholders: Vec<MediaPlaceholder>,
    /// Cover placeholder, always `MediaKind::Thumb`
    pub cover: Option<MediaPlaceholder>,
    /// Cover file path resolved during upload
    pub cover_file_path: Option<PathBuf>,
    /// Frontmatter key/value pairs not consumed by dedicated fields
    pub metadata: HashMap<String, String>,
    /// Original Markdown source
    pub raw_markdown: String,
    /// Rendered body HTML with placeholder tokens still embedded
    pub body_html: Option<String>,
    /// Fully assembled HTML after media substitution
    pub final_html: Option<String>,
    /// Generated or fallback summary used as the draft digest
    pub summary: Option<String>,
}

impl Article {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Author from frontmatter, if declared.
    pub fn author(&self) -> Option<&str> {
        self.metadata.get("author").map(String::as_str)
    }

    pub fn placeholder_by_id(&self, id: &str) -> Option<&MediaPlaceholder> {
        self.placeholders.iter().find(|p| p.id == id)
    }

    pub fn placeholder_by_id_mut(&mut self, id: &str) -> Option<&mut MediaPlaceholder> {
        self.placeholders.iter_mut().find(|p| p.id == id)
    }

    /// Plain text of the article body, used as summarizer input and as
    /// the source of the fallback digest.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for element in &self.elements {
            match element {
                ContentElement::Heading { text, .. } => {
                    out.push_str(text);
                    out.push('\n');
                }
                ContentElement::Paragraph { text } => {
                    out.push_str(text);
                    out.push('\n');
                }
                ContentElement::Code { code, .. } => {
                    out.push_str(code);
                    out.push('\n');
                }
                ContentElement::Image { .. } | ContentElement::Video { .. } => {}
                ContentElement::RawHtml { html } => {
                    // Strip tags so raw blocks still contribute their text.
                    let mut in_tag = false;
                    for ch in html.chars() {
                        match ch {
                            '<' => in_tag = true,
                            '>' => in_tag = false,
                            c if !in_tag => out.push(c),
                            _ => {}
                        }
                    }
                    out.push('\n');
                }
            }
        }
        out.trim().to_string()
    }

    /// Count of content placeholders that have uploaded successfully.
    pub fn uploaded_count(&self) -> usize {
        self.placeholders.iter().filter(|p| p.is_uploaded()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("png"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("JPG"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("MOV"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("bin"), MediaKind::Image);
    }

    #[test]
    fn test_placeholder_lookup() {
        let mut article = Article::new("Test");
        article
            .placeholders
            .push(MediaPlaceholder::new("img1", MediaKind::Image));
        article
            .placeholders
            .push(MediaPlaceholder::new("img2", MediaKind::Image));

        assert!(article.placeholder_by_id("img1").is_some());
        assert!(article.placeholder_by_id("missing").is_none());

        let p = article.placeholder_by_id_mut("img2").unwrap();
        p.uploaded_media_id = Some("MEDIA_ID".to_string());
        assert_eq!(article.uploaded_count(), 1);
    }

    #[test]
    fn test_plain_text_skips_media() {
        let article = Article {
            title: "Test".to_string(),
            elements: vec![
                ContentElement::Heading {
                    level: 1,
                    text: "Intro".to_string(),
                },
                ContentElement::Paragraph {
                    text: "Hello world".to_string(),
                },
                ContentElement::Image {
                    placeholder_id: "img1".to_string(),
                },
                ContentElement::RawHtml {
                    html: "<ul><li>item</li></ul>".to_string(),
                },
            ],
            ..Default::default()
        };

        let text = article.plain_text();
        assert!(text.contains("Intro"));
        assert!(text.contains("Hello world"));
        assert!(text.contains("item"));
        assert!(!text.contains("img1"));
    }

    #[test]
    fn test_author_from_metadata() {
        let mut article = Article::new("Test");
        assert!(article.author().is_none());
        article
            .metadata
            .insert("author".to_string(), "Alice".to_string());
        assert_eq!(article.author(), Some("Alice"));
    }
}
