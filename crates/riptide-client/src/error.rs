//! Error types for the client layer.
//!
//! The taxonomy separates configuration errors (never retried: retrying
//! cannot fix a missing endpoint or token) from transient authorization
//! failures (retried with backoff up to the configured budget) and
//! connection failures (passed through from the transport, never handled
//! here).

use riptide_core::{ChannelName, ConfigError};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors from [`crate::Client`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// An operation was called before `init`.
    #[error("client not initialized")]
    NotInitialized,

    /// `init` was called on an already-initialized client.
    #[error("client already initialized")]
    AlreadyInitialized,

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Underlying transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors from the private-channel authorization handshake.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthorizeError {
    /// No auth endpoint or token source is configured. A configuration
    /// error, not transient: surfaced immediately, never retried.
    #[error("no auth endpoint or token source configured for private channels")]
    NotConfigured,

    /// The token source failed to produce a token.
    #[error("token source failed: {message}")]
    Token {
        /// Failure description.
        message: String,
    },

    /// The HTTP request itself failed (connection refused, DNS, ...). Not
    /// retried: only non-2xx responses enter the retry path.
    #[error("authorization request failed: {message}")]
    Request {
        /// Failure description.
        message: String,
    },

    /// A 2xx response carried a body that was not valid JSON.
    #[error("authorization response was not valid JSON: {message}")]
    InvalidPayload {
        /// Failure description.
        message: String,
    },

    /// Every retry within the backoff budget failed.
    #[error("authorization for {channel} gave up after retry budget (last status {status})")]
    Terminal {
        /// Channel that failed to authorize.
        channel: ChannelName,
        /// HTTP status of the last attempt.
        status: u16,
    },
}

impl AuthorizeError {
    /// True for errors caused by missing configuration, which no amount of
    /// retrying can fix.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }
}
