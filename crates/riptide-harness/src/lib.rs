//! Harness
//!
//! Test infrastructure for the Riptide client: a [`MockTransport`] that
//! records every transport primitive call and lets tests inject
//! [`riptide_client::TransportEvent`]s, plus listener-capture and polling
//! helpers for asserting on the asynchronous event loop.
//!
//! Nothing here speaks a wire protocol; the mock stands in for the vendor
//! socket client so integration tests can script its behavior exactly.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod observe;
mod transport;

pub use observe::{collecting_listener, tagging_listener, wait_for};
pub use transport::{MockTransport, TransportCall};
