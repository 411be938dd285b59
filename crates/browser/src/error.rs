//! Browser error types.

use thiserror::Error;

/// Errors that can occur while driving the remote browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The session could not be established. Fatal for the whole request.
    #[error("browser session unavailable: {0}")]
    Session(String),

    #[error("DevTools endpoint error: {0}")]
    Endpoint(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript evaluation failed: {0}")]
    JsEvalFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("session already released")]
    Released,

    #[error("CDP error: {0}")]
    Cdp(String),
}

impl BrowserError {
    /// Whether this error ends the whole request rather than one query.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Session(_) | Self::Released)
    }
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Cdp(err.to_string())
    }
}

impl From<reqwest::Error> for BrowserError {
    fn from(err: reqwest::Error) -> Self {
        BrowserError::Endpoint(err.to_string())
    }
}

/// A rendered result node could not be read.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("lookup `{selector}` captured a malformed value: {reason}")]
    Malformed { selector: String, reason: String },
}
