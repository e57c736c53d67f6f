//! Core
//!
//! Sans-IO building blocks for the Riptide channel messaging client: channel
//! names and events, the listener registry, connection options, and the
//! connection state reflected from the transport.
//!
//! # Architecture
//!
//! Nothing in this crate performs I/O or depends on an async runtime. The
//! [`ChannelRegistry`] is pure bookkeeping behind a short-lived lock; options
//! and state types are plain data. The I/O layer (`riptide-client`) composes
//! these with a transport and an HTTP authorizer.
//!
//! # Components
//!
//! - [`ChannelName`] / [`ChannelEvent`]: pub/sub addressing and the unit
//!   delivered to listeners
//! - [`ChannelRegistry`]: channel name → ordered listener list, with
//!   handle-based removal
//! - [`ConnectionOptions`]: immutable client configuration with documented
//!   defaults
//! - [`ConnectionState`]: read-only reflection of the transport's reported
//!   connection state

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod channel;
mod error;
mod options;
mod registry;
mod state;

pub use channel::{ChannelEvent, ChannelName};
pub use error::{ConfigError, StateParseError};
pub use options::{
    ConnectionOptions, ConnectionOptionsBuilder, DEFAULT_ACTIVITY_TIMEOUT,
    DEFAULT_AUTHORIZER_TIMEOUT, DEFAULT_PONG_TIMEOUT,
};
pub use registry::{
    ChannelRegistry, DispatchReport, Listener, Registration, SubscriptionHandle,
    UnsubscribeOutcome,
};
pub use state::ConnectionState;
