//! Error types for the Markdown-to-WeChat draft publisher.
//!
//! One enum covers the four failure families the workflow distinguishes:
//!
//! - **Parse errors**: missing/unreadable input, malformed frontmatter
//!   (abort the run)
//! - **Upload errors**: media resolution or remote upload failures
//!   (fatal for the cover, recovered per-placeholder for content media)
//! - **WeChat API errors**: remote rejections carrying the provider's
//!   error code and message verbatim
//! - **Configuration errors**: missing credentials or invalid settings
//!
//! Retryability is a property of the error, consulted by the HTTP layer;
//! the publisher itself never retries.

use std::fmt;

/// Result type alias for publisher operations.
pub type Result<T> = std::result::Result<T, PublishError>;

/// Comprehensive error type for the publishing workflow.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Network-related errors (retryable)
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Request timeout (retryable)
    #[error("Request timeout")]
    Timeout,

    /// Input file errors (not retryable)
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}, reason: {reason}")]
    FileRead { path: String, reason: String },

    /// Markdown/frontmatter errors (not retryable)
    #[error("Markdown parsing failed: {reason}")]
    MarkdownParse { reason: String },

    /// Media upload errors (may be retryable at the HTTP layer)
    #[error("Media upload failed: {path}, reason: {reason}")]
    MediaUpload { path: String, reason: String },

    /// The article's cover placeholder has no uploaded media id,
    /// so a draft cannot be created (not retryable)
    #[error("Article '{title}' has no uploaded cover image")]
    MissingCover { title: String },

    /// WeChat API errors (retryability depends on the error code)
    #[error("WeChat API error [{code}]: {message}")]
    WeChatApi { code: i32, message: String },

    /// Configuration errors (not retryable)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON processing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors for wrapping other error types
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PublishError {
    /// Determines if an error is retryable.
    ///
    /// Network errors, timeouts, and certain WeChat API errors are retryable.
    /// File, parse, and configuration errors are not retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            PublishError::Network(_) | PublishError::Timeout => true,

            // Upload failures may stem from transient network issues
            PublishError::MediaUpload { .. } => true,

            PublishError::WeChatApi { code, .. } => match code {
                // Access token related errors
                40001 | 40014 | 42001 | 42007 => true,
                // Rate limiting
                45009 | 45011 => true,
                // Server errors
                -1 | 50001 | 50002 => true,
                _ => false,
            },

            _ => false,
        }
    }

    /// Gets the severity level of the error for logging purposes.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PublishError::Network(_) | PublishError::Timeout | PublishError::MediaUpload { .. } => {
                ErrorSeverity::Warning
            }

            PublishError::WeChatApi { code, .. } => match code {
                // Invalid appid / api unauthorized
                40013 | 48001 => ErrorSeverity::Critical,
                _ => ErrorSeverity::Error,
            },

            PublishError::FileNotFound { .. }
            | PublishError::FileRead { .. }
            | PublishError::MarkdownParse { .. }
            | PublishError::MissingCover { .. }
            | PublishError::Config { .. }
            | PublishError::Json(_)
            | PublishError::Io(_)
            | PublishError::Internal(_) => ErrorSeverity::Error,
        }
    }

    /// Creates a WeChat API error from response data.
    pub fn from_api_response(code: i32, message: impl Into<String>) -> Self {
        PublishError::WeChatApi {
            code,
            message: message.into(),
        }
    }

    /// Creates a file-read error.
    pub fn file_error(path: impl Into<String>, reason: impl Into<String>) -> Self {
        PublishError::FileRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a media upload error.
    pub fn upload_error(path: impl Into<String>, reason: impl Into<String>) -> Self {
        PublishError::MediaUpload {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse_error(reason: impl Into<String>) -> Self {
        PublishError::MarkdownParse {
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        PublishError::Config {
            message: message.into(),
        }
    }
}

/// Error severity levels for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Low impact errors that don't affect core functionality
    Warning,
    /// Standard errors that affect specific operations
    Error,
    /// High impact errors that affect core functionality
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
