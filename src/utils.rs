//! Small shared helpers.

use std::path::{Path, PathBuf};

/// Image extensions recognized for media classification and lookup.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Video extensions recognized for media classification and lookup.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

/// Replaces characters that are unsafe in file names.
pub fn sanitize_filename(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Truncates text to at most `max_chars` characters, appending an
/// ellipsis when anything was cut. Splits on character boundaries.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", truncated)
}

/// Resolves `path` against `base` when it is relative.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Whether a Markdown destination is a remote URL rather than a local
/// file or placeholder reference.
pub fn is_remote_url(dest: &str) -> bool {
    dest.starts_with("http://") || dest.starts_with("https://")
}

/// Looks for `<stem>.<ext>` in `dir` across the given extensions.
pub fn find_by_stem(dir: &Path, stem: &str, extensions: &[&str]) -> Option<PathBuf> {
    for ext in extensions {
        let candidate = dir.join(format!("{stem}.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b:c"), "a_b_c");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
        assert_eq!(sanitize_filename("中文标题"), "中文标题");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exact", 5), "exact");
        let long = "a".repeat(20);
        let result = truncate_text(&long, 10);
        assert_eq!(result.chars().count(), 10);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "中文内容测试字符串超过限制";
        let result = truncate_text(text, 8);
        assert_eq!(result.chars().count(), 8);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_resolve_path() {
        let base = Path::new("/data/input");
        assert_eq!(
            resolve_path(base, Path::new("img/a.png")),
            PathBuf::from("/data/input/img/a.png")
        );
        assert_eq!(
            resolve_path(base, Path::new("/abs/a.png")),
            PathBuf::from("/abs/a.png")
        );
    }

    #[test]
    fn test_find_by_stem() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("cover.png"), b"png").unwrap();

        let found = find_by_stem(dir.path(), "cover", IMAGE_EXTENSIONS);
        assert_eq!(found, Some(dir.path().join("cover.png")));
        assert!(find_by_stem(dir.path(), "missing", IMAGE_EXTENSIONS).is_none());
    }

    #[test]
    fn test_is_remote_url() {
        assert!(is_remote_url("https://example.com/a.png"));
        assert!(is_remote_url("http://example.com/a.png"));
        assert!(!is_remote_url("images/a.png"));
        assert!(!is_remote_url("placeholder:img1.png"));
    }
}
