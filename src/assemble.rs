//! HTML assembly: placeholder substitution and document wrapping.
//!
//! The assembler is a pure function of the article state. Every `<img>`
//! whose `src` is a `placeholder:<id>` token is either rewritten to the
//! placeholder's uploaded URL or, when the upload never happened, removed
//! outright so the draft carries no dead references.

use crate::article::Article;
use crate::error::{PublishError, Result};
use regex::{NoExpand, Regex};
use tracing::{debug, warn};

/// Default stylesheet embedded when no CSS template is configured.
const DEFAULT_CSS: &str = r#"
body { font-family: -apple-system, "Helvetica Neue", sans-serif; font-size: 16px; line-height: 1.75; color: #333; max-width: 677px; margin: 0 auto; padding: 16px; }
h1, h2, h3 { color: #222; line-height: 1.35; }
img { max-width: 100%; height: auto; }
pre { background: #f6f8fa; padding: 12px; overflow-x: auto; border-radius: 4px; }
code { font-family: "SF Mono", Consolas, monospace; font-size: 14px; }
blockquote { border-left: 4px solid #ddd; margin-left: 0; padding-left: 16px; color: #666; }
"#;

/// Assembles the final article HTML from the rendered body.
#[derive(Debug)]
pub struct HtmlAssembler {
    css: String,
    img_regex: Regex,
    src_regex: Regex,
}

impl HtmlAssembler {
    /// Creates an assembler with the given stylesheet, or the bundled
    /// default when none is supplied.
    pub fn new(css: Option<String>) -> Self {
        Self {
            css: css.unwrap_or_else(|| DEFAULT_CSS.to_string()),
            img_regex: Regex::new(r"<img\b[^>]*>").unwrap(),
            src_regex: Regex::new(r#"src="([^"]*)""#).unwrap(),
        }
    }

    /// Substitutes placeholder tokens and wraps the body in a document
    /// shell with the embedded stylesheet.
    pub fn assemble(&self, article: &Article) -> Result<String> {
        let body = article.body_html.as_deref().unwrap_or("");
        if body.trim().is_empty() && article.elements.is_empty() {
            return Err(PublishError::parse_error("article body is empty"));
        }

        let mut substituted = 0usize;
        let mut removed = 0usize;

        let body = self.img_regex.replace_all(body, |caps: &regex::Captures| {
            let tag = &caps[0];
            let src = match self.src_regex.captures(tag) {
                Some(src_caps) => src_caps[1].to_string(),
                None => return tag.to_string(),
            };
            let Some(id) = src.strip_prefix("placeholder:") else {
                return tag.to_string();
            };

            match article
                .placeholder_by_id(id)
                .and_then(|p| p.uploaded_url.as_deref())
            {
                Some(url) => {
                    substituted += 1;
                    self.src_regex
                        .replace(tag, NoExpand(&format!("src=\"{url}\"")))
                        .into_owned()
                }
                None => {
                    warn!(id = %id, "placeholder has no uploaded URL, removing tag");
                    removed += 1;
                    String::new()
                }
            }
        });

        debug!(substituted, removed, "assembled article HTML");

        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n{}\n</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            self.css.trim(),
            body.trim()
        ))
    }
}

impl Default for HtmlAssembler {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{MediaKind, MediaPlaceholder};

    fn article_with_body(html: &str) -> Article {
        Article {
            title: "Test".to_string(),
            body_html: Some(html.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_uploaded_placeholder_is_substituted() {
        let mut article = article_with_body(
            r#"<p><img src="placeholder:pic" alt="Pic" /></p>"#,
        );
        let mut p = MediaPlaceholder::new("pic", MediaKind::Image);
        p.uploaded_media_id = Some("MEDIA".to_string());
        p.uploaded_url = Some("https://mmbiz.example/pic".to_string());
        article.placeholders.push(p);

        let html = HtmlAssembler::default().assemble(&article).unwrap();
        assert!(html.contains(r#"src="https://mmbiz.example/pic""#));
        assert!(html.contains(r#"alt="Pic""#));
        assert!(!html.contains("placeholder:"));
    }

    #[test]
    fn test_unresolved_placeholder_tag_is_removed() {
        let mut article = article_with_body(
            r#"<p>before</p><p><img src="placeholder:gone" alt="x" /></p><p>after</p>"#,
        );
        article
            .placeholders
            .push(MediaPlaceholder::new("gone", MediaKind::Image));

        let html = HtmlAssembler::default().assemble(&article).unwrap();
        assert!(!html.contains("<img"));
        assert!(html.contains("before"));
        assert!(html.contains("after"));
    }

    #[test]
    fn test_unknown_placeholder_id_is_removed() {
        let article = article_with_body(r#"<img src="placeholder:never-parsed" />"#);
        let html = HtmlAssembler::default().assemble(&article).unwrap();
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_remote_image_left_untouched() {
        let article =
            article_with_body(r#"<p><img src="https://example.com/x.png" alt="r" /></p>"#);
        let html = HtmlAssembler::default().assemble(&article).unwrap();
        assert!(html.contains(r#"src="https://example.com/x.png""#));
    }

    #[test]
    fn test_empty_body_is_error() {
        let article = article_with_body("  ");
        assert!(HtmlAssembler::default().assemble(&article).is_err());

        let article = Article::new("No body at all");
        assert!(HtmlAssembler::default().assemble(&article).is_err());
    }

    #[test]
    fn test_custom_css_is_embedded() {
        let article = article_with_body("<p>text</p>");
        let assembler = HtmlAssembler::new(Some("body { color: red; }".to_string()));
        let html = assembler.assemble(&article).unwrap();
        assert!(html.contains("body { color: red; }"));
        assert!(html.contains("<style>"));
    }
}
