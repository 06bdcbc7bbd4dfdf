// SPDX-License-Identifier: MIT

//! Typed error handling for the paste watcher

use crate::query::ParseError;
use thiserror::Error;

/// Top-level error type for pastego-rs
#[derive(Debug, Error)]
pub enum PastegoError {
    /// A configured search alternative failed to compile
    #[error("Invalid search expression '{expression}': {source}")]
    Query {
        expression: String,
        #[source]
        source: ParseError,
    },

    /// The scraping API asked us to back off
    #[error("Rate limited by the paste feed")]
    RateLimited,

    /// The feed answered with something we could not decode
    #[error("Feed error: {0}")]
    Feed(String),

    /// Configuration errors (missing file, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A saved match name that would escape the result directory
    #[error("Invalid match name: {0}")]
    InvalidName(String),

    /// A saved match that does not exist
    #[error("Match '{0}' not found")]
    NotFound(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Malformed feed URL
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// HTML rendering errors
    #[error("HTML extraction failed: {0}")]
    Extract(String),
}

impl PastegoError {
    /// Create a query error for one search alternative
    pub fn query(expression: impl Into<String>, source: ParseError) -> Self {
        Self::Query {
            expression: expression.into(),
            source,
        }
    }

    /// Create a feed error
    pub fn feed(message: impl Into<String>) -> Self {
        Self::Feed(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, PastegoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::compile;

    #[test]
    fn test_query_error_names_expression() {
        let source = compile("a &&").unwrap_err();
        let err = PastegoError::query("a &&", source);
        assert_eq!(
            err.to_string(),
            "Invalid search expression 'a &&': missing operand at offset 4, expected a literal or '('"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PastegoError = io.into();
        assert!(matches!(err, PastegoError::Io(_)));
    }
}
