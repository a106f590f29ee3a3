//! Error types for compete.
//!
//! Library crates use [`CompeteError`] via `thiserror`.
//! App crates (cli/server) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Maximum number of characters of model output kept on a [`CompeteError::Parse`].
pub const PARSE_SNIPPET_CHARS: usize = 500;

/// Top-level error type for all compete operations.
#[derive(Debug, thiserror::Error)]
pub enum CompeteError {
    /// Network/HTTP failure while scraping a page.
    #[error("fetch error: {url}: {message}")]
    Fetch { url: String, message: String },

    /// Model output could not be coerced into the expected structure.
    #[error("parse error: {message} (response began: {snippet:?})")]
    Parse { message: String, snippet: String },

    /// Malformed or unsafe input at an API boundary.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A phase produced zero usable items.
    #[error("{message}")]
    EmptyResult { message: String },

    /// A required credential or upstream setting is missing.
    #[error("upstream config error: {message}")]
    UpstreamConfig { message: String },

    /// LLM or search API call failed (transport or non-2xx status).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Configuration loading error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CompeteError>;

impl CompeteError {
    /// Create a fetch error for `url`.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error, keeping a bounded snippet of the offending text.
    pub fn parse(msg: impl Into<String>, text: &str) -> Self {
        Self::Parse {
            message: msg.into(),
            snippet: text.chars().take(PARSE_SNIPPET_CHARS).collect(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an empty-result error from any displayable message.
    pub fn empty(msg: impl Into<String>) -> Self {
        Self::EmptyResult {
            message: msg.into(),
        }
    }

    /// Create an upstream config error from any displayable message.
    pub fn upstream_config(msg: impl Into<String>) -> Self {
        Self::UpstreamConfig {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Message suitable for showing to an end user (no debug detail for
    /// validation and empty-result cases).
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } | Self::EmptyResult { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
