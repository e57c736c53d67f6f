//! Channel registry: channel name → ordered list of listeners.
//!
//! Pure bookkeeping with no I/O. The registry tells its caller when a channel
//! gains its first listener or loses its last one; acting on those signals
//! (issuing transport-level subscribe/unsubscribe) is the caller's job.
//!
//! # Invariant
//!
//! An entry exists for a channel if and only if its listener list is
//! non-empty. Removing the last listener deletes the entry and reports
//! `channel_empty` so the caller can release the transport subscription.
//!
//! # Re-entrancy
//!
//! [`ChannelRegistry::dispatch`] snapshots the listener list and releases the
//! internal lock before invoking anything, so a listener may subscribe or
//! unsubscribe (itself included) mid-dispatch without deadlocking. Listeners
//! removed during a dispatch still receive the event that was in flight.

use std::{
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, PoisonError},
};

use crate::channel::{ChannelEvent, ChannelName};

/// Callback registered by application code to receive channel events.
///
/// Listeners are invoked in registration order. Registering the same closure
/// twice yields two registrations and two invocations per event; deduplication
/// is deliberately the caller's responsibility.
pub type Listener = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

/// Token returned by [`ChannelRegistry::subscribe`], passed back to
/// [`ChannelRegistry::unsubscribe`] to remove exactly that registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    /// Channel the registration belongs to.
    pub channel: ChannelName,
    /// Registry-scoped registration id.
    id: u64,
}

/// Result of [`ChannelRegistry::subscribe`].
#[derive(Debug, Clone)]
pub struct Registration {
    /// Handle for removing this registration later.
    pub handle: SubscriptionHandle,
    /// True when this registration created the channel entry, i.e. the
    /// caller should issue a transport-level subscribe.
    pub first_for_channel: bool,
}

/// Result of [`ChannelRegistry::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsubscribeOutcome {
    /// Whether the handle referred to a live registration. Unsubscribing an
    /// unknown or already-removed handle is a no-op, not an error.
    pub removed: bool,
    /// True when the channel lost its last listener and the entry was
    /// deleted, i.e. the caller should issue a transport-level unsubscribe.
    pub channel_empty: bool,
}

/// Result of [`ChannelRegistry::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Listeners invoked for this event.
    pub delivered: usize,
    /// Listeners that panicked. A panicking listener never prevents the
    /// remaining listeners from running.
    pub panicked: usize,
}

struct RegistryInner {
    channels: HashMap<ChannelName, Vec<(u64, Listener)>>,
    next_id: u64,
}

/// Tracks which listeners are interested in which channel names.
pub struct ChannelRegistry {
    inner: Mutex<RegistryInner>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { inner: Mutex::new(RegistryInner { channels: HashMap::new(), next_id: 0 }) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        // Listeners run outside the lock, so poisoning can only come from a
        // panic inside the registry itself; recover rather than propagate.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `listener` to `channel`'s list, creating the entry if absent.
    pub fn subscribe(&self, channel: ChannelName, listener: Listener) -> Registration {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let entries = inner.channels.entry(channel.clone()).or_default();
        let first_for_channel = entries.is_empty();
        entries.push((id, listener));

        Registration { handle: SubscriptionHandle { channel, id }, first_for_channel }
    }

    /// Remove the registration identified by `handle`.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> UnsubscribeOutcome {
        let mut inner = self.lock();
        let Some(entries) = inner.channels.get_mut(&handle.channel) else {
            return UnsubscribeOutcome { removed: false, channel_empty: false };
        };

        let before = entries.len();
        entries.retain(|(id, _)| *id != handle.id);
        let removed = entries.len() < before;

        let channel_empty = entries.is_empty();
        if channel_empty {
            inner.channels.remove(&handle.channel);
        }

        UnsubscribeOutcome { removed, channel_empty: removed && channel_empty }
    }

    /// Invoke every listener currently registered for `channel`, in
    /// registration order. Dispatching to a channel with no listeners is a
    /// no-op: the transport may deliver a final event after a local
    /// unsubscribe has already cleared the entry.
    pub fn dispatch(&self, channel: &ChannelName, event: &ChannelEvent) -> DispatchReport {
        let snapshot: Vec<Listener> = {
            let inner = self.lock();
            match inner.channels.get(channel) {
                Some(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
                None => return DispatchReport::default(),
            }
        };

        let mut report = DispatchReport::default();
        for listener in snapshot {
            report.delivered += 1;
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                report.panicked += 1;
            }
        }
        report
    }

    /// Whether `channel` has at least one listener.
    pub fn contains(&self, channel: &ChannelName) -> bool {
        self.lock().channels.contains_key(channel)
    }

    /// Number of listeners registered for `channel`.
    pub fn listener_count(&self, channel: &ChannelName) -> usize {
        self.lock().channels.get(channel).map_or(0, Vec::len)
    }

    /// Names of all channels with at least one listener.
    pub fn channel_names(&self) -> Vec<ChannelName> {
        self.lock().channels.keys().cloned().collect()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
