//! Scripted in-memory transport.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use riptide_client::{
    AuthorizationPayload, AuthorizeError, Transport, TransportConfig, TransportError,
    TransportEvent,
};
use riptide_core::{ChannelEvent, ChannelName, ConnectionState};
use tokio::sync::{mpsc, oneshot};

/// One recorded transport primitive invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// `init` with the derived configuration.
    Init(TransportConfig),
    /// `connect`.
    Connect,
    /// `disconnect`.
    Disconnect,
    /// `subscribe` for a channel.
    Subscribe(ChannelName),
    /// `unsubscribe` for a channel.
    Unsubscribe(ChannelName),
}

/// Transport double that records calls and lets tests inject events.
///
/// Events emitted before `init` are discarded, mirroring a vendor client
/// that has nowhere to deliver callbacks before configuration.
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    fail_next_subscribe: Mutex<Option<String>>,
}

impl MockTransport {
    /// Create an idle mock.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    /// Every primitive call so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn count(&self, matches: impl Fn(&TransportCall) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| matches(call))
            .count()
    }

    /// Number of `connect` calls.
    pub fn connect_count(&self) -> usize {
        self.count(|call| matches!(call, TransportCall::Connect))
    }

    /// Number of `disconnect` calls.
    pub fn disconnect_count(&self) -> usize {
        self.count(|call| matches!(call, TransportCall::Disconnect))
    }

    /// Number of `subscribe` calls for `channel`.
    pub fn subscribe_count(&self, channel: &ChannelName) -> usize {
        self.count(|call| matches!(call, TransportCall::Subscribe(c) if c == channel))
    }

    /// Number of `unsubscribe` calls for `channel`.
    pub fn unsubscribe_count(&self, channel: &ChannelName) -> usize {
        self.count(|call| matches!(call, TransportCall::Unsubscribe(c) if c == channel))
    }

    /// Make the next `subscribe` call fail with the given message.
    pub fn fail_next_subscribe(&self, message: impl Into<String>) {
        *self.fail_next_subscribe.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(message.into());
    }

    /// Inject a raw transport event.
    pub async fn emit(&self, event: TransportEvent) {
        let sender = {
            self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
        };
        if let Some(sender) = sender {
            let _ = sender.send(event).await;
        }
    }

    /// Inject a connection state transition.
    pub async fn emit_state(&self, previous: ConnectionState, current: ConnectionState) {
        self.emit(TransportEvent::StateChanged { previous, current }).await;
    }

    /// Inject an inbound channel event.
    pub async fn emit_message(
        &self,
        channel: impl Into<ChannelName>,
        name: impl Into<String>,
        data: serde_json::Value,
    ) {
        self.emit(TransportEvent::Message(ChannelEvent::new(channel, name, data))).await;
    }

    /// Inject a subscription error for a channel.
    pub async fn emit_subscription_error(
        &self,
        channel: impl Into<ChannelName>,
        message: impl Into<String>,
    ) {
        self.emit(TransportEvent::SubscriptionError {
            channel: channel.into(),
            message: message.into(),
        })
        .await;
    }

    /// Ask the client for a private-channel authorization, returning the
    /// receiver the reply will arrive on.
    pub async fn request_authorization(
        &self,
        channel: impl Into<ChannelName>,
        socket_id: impl Into<String>,
    ) -> oneshot::Receiver<Result<AuthorizationPayload, AuthorizeError>> {
        let (respond, reply) = oneshot::channel();
        self.emit(TransportEvent::AuthorizationRequest {
            channel: channel.into(),
            socket_id: socket_id.into(),
            respond,
        })
        .await;
        reply
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn init(
        &self,
        config: TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        self.record(TransportCall::Init(config));
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = Some(events);
        Ok(())
    }

    async fn connect(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Connect);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Disconnect);
        Ok(())
    }

    async fn subscribe(&self, channel: &ChannelName) -> Result<(), TransportError> {
        self.record(TransportCall::Subscribe(channel.clone()));
        let scripted_failure = self
            .fail_next_subscribe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match scripted_failure {
            Some(message) => {
                Err(TransportError::Subscription { channel: channel.clone(), message })
            },
            None => Ok(()),
        }
    }

    async fn unsubscribe(&self, channel: &ChannelName) -> Result<(), TransportError> {
        self.record(TransportCall::Unsubscribe(channel.clone()));
        Ok(())
    }
}
