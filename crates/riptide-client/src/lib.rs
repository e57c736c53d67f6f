//! Client
//!
//! The I/O layer of the Riptide channel messaging library: a [`Client`] that
//! owns one transport handle, multiplexes application listeners onto named
//! channels, authorizes private channels against an HTTP endpoint with
//! bounded exponential backoff, and keeps subscriptions honest across
//! application lifecycle transitions.
//!
//! # Architecture
//!
//! The transport is a vendor collaborator behind the [`Transport`] trait. It
//! pushes [`TransportEvent`]s into an mpsc channel; the client's event loop
//! drains that channel and performs synchronous registry dispatch, so vendor
//! callback threading never reaches application listeners. Authorization
//! requests carry a oneshot reply sender and are answered from a spawned
//! task, keeping slow authorizations off the dispatch path.
//!
//! # Components
//!
//! - [`Client`]: public API for init/connect/disconnect and
//!   subscribe/unsubscribe
//! - [`Authorizer`]: private-channel authorization with retry/backoff
//! - [`Transport`]: the vendor socket contract
//! - [`LifecycleReconciler`]: foreground/background reconnect workaround

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod authorizer;
mod client;
mod error;
mod reconciler;
mod transport;

pub use authorizer::{AuthorizationPayload, Authorizer, TokenProvider, TokenSource};
pub use client::{Client, ClientHandlers, ErrorHandler, StateChangeHandler};
pub use error::{AuthorizeError, ClientError};
pub use reconciler::{AppState, LifecycleReconciler, Platform};
pub use riptide_core::{
    ChannelEvent, ChannelName, ChannelRegistry, ConnectionOptions, ConnectionState, Listener,
    SubscriptionHandle,
};
pub use transport::{Transport, TransportConfig, TransportError, TransportEvent};
