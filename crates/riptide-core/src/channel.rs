//! Channel names and the events delivered on them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix marking a channel that requires out-of-band authorization.
const PRIVATE_PREFIX: &str = "private-";

/// Prefix marking a presence channel. Presence channels carry member
/// metadata and authorize the same way private channels do.
const PRESENCE_PREFIX: &str = "presence-";

/// Name of a pub/sub channel on the messaging backend.
///
/// Channel names are plain strings; whether a channel needs authorization is
/// encoded in its prefix, following the backend's naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Create a channel name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The raw name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether subscribing to this channel requires a signed authorization
    /// payload from the auth endpoint (`private-` and `presence-` channels).
    pub fn requires_authorization(&self) -> bool {
        self.0.starts_with(PRIVATE_PREFIX) || self.0.starts_with(PRESENCE_PREFIX)
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ChannelName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// An event delivered on a channel.
///
/// `data` is the raw JSON payload as produced by the backend; its shape is
/// application-defined and opaque to this library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEvent {
    /// Channel the event arrived on.
    pub channel: ChannelName,
    /// Event name (e.g. `"update"`).
    pub name: String,
    /// Raw event payload.
    pub data: serde_json::Value,
}

impl ChannelEvent {
    /// Convenience constructor.
    pub fn new(
        channel: impl Into<ChannelName>,
        name: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self { channel: channel.into(), name: name.into(), data }
    }
}
