//! Error taxonomy for the search pipeline
//!
//! Only recoverable anomalies live here. Programming errors (entering a
//! non-start state, starting work on a state that is not current) are
//! assertions in the state controller, not variants of this enum.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum SearchError {
    /// The device had no connectivity when the resolve was attempted.
    #[error("Network unavailable")]
    NetworkUnavailable,

    /// The resolve server answered with a non-success status.
    #[error("Resolve request failed with HTTP status {0}")]
    Http(u16),

    /// Transport failure other than "offline" (timeouts, TLS, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// A payload could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Settings are missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// A language code that is not a valid ISO 639-1 code.
    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),
}

impl SearchError {
    /// Whether this error should be surfaced to the user as "offline".
    pub fn is_network_unavailable(&self) -> bool {
        matches!(self, SearchError::NetworkUnavailable)
    }
}

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            return SearchError::NetworkUnavailable;
        }
        match err.status() {
            Some(status) => SearchError::Http(status.as_u16()),
            None => SearchError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Parse(format!("JSON error: {}", err))
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
