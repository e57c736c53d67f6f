//! Transport contract for the vendor socket client.
//!
//! The wire protocol lives outside this workspace. A transport implements
//! the five primitives below and reports everything else (state changes,
//! inbound events, subscription failures, authorization requests) by
//! pushing [`TransportEvent`]s into the sender handed to
//! [`Transport::init`]. The [`crate::Client`] owns the receiving end and is
//! the only component allowed to call the primitives.

use std::time::Duration;

use async_trait::async_trait;
use riptide_core::{ChannelEvent, ChannelName, ConnectionOptions, ConnectionState};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::{authorizer::AuthorizationPayload, error::AuthorizeError};

/// Configuration handed to the transport at init time.
///
/// Derived from [`ConnectionOptions`]; timeout unit conversion for the
/// vendor client happens at this boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Application key issued by the messaging backend.
    pub api_key: String,
    /// Cluster/region identifier.
    pub cluster: String,
    /// Whether to use secure transport.
    pub use_tls: bool,
    /// Time without outbound traffic before the transport pings.
    pub activity_timeout: Duration,
    /// Time the transport waits for a pong.
    pub pong_timeout: Duration,
}

impl From<&ConnectionOptions> for TransportConfig {
    fn from(options: &ConnectionOptions) -> Self {
        Self {
            api_key: options.api_key().to_string(),
            cluster: options.cluster().to_string(),
            use_tls: options.use_tls(),
            activity_timeout: options.activity_timeout(),
            pong_timeout: options.pong_timeout(),
        }
    }
}

/// Transport errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// A primitive was called before `init`.
    #[error("transport not initialized")]
    NotInitialized,

    /// Connection-level failure.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Subscribing to a channel failed.
    #[error("subscription failed for {channel}: {message}")]
    Subscription {
        /// Channel the subscription was for.
        channel: ChannelName,
        /// Failure description from the transport.
        message: String,
    },
}

/// Events a transport pushes to the client.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection moved between lifecycle states.
    StateChanged {
        /// State before the transition.
        previous: ConnectionState,
        /// State after the transition.
        current: ConnectionState,
    },

    /// An event arrived on a subscribed channel.
    Message(ChannelEvent),

    /// A channel subscription failed at the transport level. The client
    /// re-attaches the subscription if local listeners remain.
    SubscriptionError {
        /// Channel whose subscription failed.
        channel: ChannelName,
        /// Failure description from the transport.
        message: String,
    },

    /// The transport needs a signed payload to subscribe to a private
    /// channel. Answered out-of-band through `respond`.
    AuthorizationRequest {
        /// Channel requiring authorization.
        channel: ChannelName,
        /// Connection identifier issued by the transport.
        socket_id: String,
        /// Reply channel for the authorization outcome.
        respond: oneshot::Sender<Result<AuthorizationPayload, AuthorizeError>>,
    },
}

/// Vendor socket client contract.
///
/// One trait, many implementations (native socket, web socket, test mock),
/// composed into the [`crate::Client`] at construction. Selection happens
/// at build or runtime, never by inheritance.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Configure the transport and install the event channel. Must not open
    /// the network connection.
    async fn init(
        &self,
        config: TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError>;

    /// Open the connection. Idempotent: connecting while connected is a
    /// no-op.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Close the connection. Idempotent.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Subscribe to a channel on the backend.
    async fn subscribe(&self, channel: &ChannelName) -> Result<(), TransportError>;

    /// Unsubscribe from a channel so the backend stops delivering its
    /// events.
    async fn unsubscribe(&self, channel: &ChannelName) -> Result<(), TransportError>;
}
