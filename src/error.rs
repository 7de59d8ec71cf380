//! Error types shared by every stage of the research pipeline.
//!
//! Collaborators (search, extraction, the language model, the renderer)
//! report failures through [`Error`]. The pipeline turns most of them into
//! data on the stage result; only [`Error::Render`] reaches the caller.

use thiserror::Error;

/// Errors raised by the crate's collaborators.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure (connect, timeout, bad status).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The YAML settings file could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    /// The language model endpoint answered with a non-success status.
    #[error("language model returned status {status}: {body}")]
    LlmStatus { status: u16, body: String },

    /// The language model answered without any completion text.
    #[error("language model returned no completion")]
    EmptyCompletion,

    /// The search backend could not produce results.
    #[error("search failed: {0}")]
    Search(String),

    /// The document could not be rendered or written.
    #[error("document rendering failed: {0}")]
    Render(String),
}

/// Result type for news_analyst operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_status_message() {
        let e = Error::LlmStatus {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(e.to_string(), "language model returned status 429: rate limited");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().starts_with("I/O error"));
    }
}
