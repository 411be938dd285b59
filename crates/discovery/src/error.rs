//! Discovery error types.

use thiserror::Error;

/// Errors raised before a discovery run starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Please provide a location")]
    MissingLocation,

    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

/// The consumer of a stream went away.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("stream consumer disconnected")]
    Disconnected,
}
