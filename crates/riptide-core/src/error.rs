//! Error types for configuration and state parsing.
//!
//! Configuration errors are never retried: retrying cannot conjure a missing
//! endpoint or key, so they surface immediately at `build()`/`init` time.

use thiserror::Error;

/// Errors produced while validating [`crate::ConnectionOptions`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The application key is empty.
    #[error("missing API key")]
    MissingApiKey,

    /// The cluster identifier is empty.
    #[error("missing cluster")]
    MissingCluster,

    /// The auth endpoint is not an absolute http(s) URL.
    #[error("invalid auth URL: {url}")]
    InvalidAuthUrl {
        /// The rejected URL.
        url: String,
    },
}

/// A connection-state string from the transport did not match any known
/// state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown connection state: {value}")]
pub struct StateParseError {
    /// The unrecognized string.
    pub value: String,
}
