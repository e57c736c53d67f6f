//! Connection lifecycle controller.
//!
//! The [`Client`] is the public-facing API. It owns one transport handle,
//! delegates listener bookkeeping to the [`ChannelRegistry`], answers the
//! transport's authorization requests through the [`Authorizer`], and
//! re-dispatches inbound events to registered listeners in registration
//! order.
//!
//! The client is an explicitly constructed object: build one, share it via
//! `Arc`, and let the host application own its lifecycle (`init` ...
//! `dispose`). There is no process-wide singleton.

use std::sync::{Arc, Mutex, PoisonError};

use riptide_core::{
    ChannelName, ChannelRegistry, ConnectionOptions, ConnectionState, Listener,
    SubscriptionHandle,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    authorizer::{Authorizer, TokenSource},
    error::{AuthorizeError, ClientError},
    transport::{Transport, TransportConfig, TransportError, TransportEvent},
};

/// Depth of the transport event queue.
const TRANSPORT_EVENT_QUEUE: usize = 32;

/// Callback invoked on every connection state transition.
pub type StateChangeHandler = Arc<dyn Fn(ConnectionState, ConnectionState) + Send + Sync>;

/// Callback invoked when the transport reports a channel-level error.
pub type ErrorHandler = Arc<dyn Fn(&TransportError) + Send + Sync>;

/// Optional hooks installed at [`Client::init`], mirroring the extra
/// handlers the vendor client accepts alongside its required configuration.
#[derive(Default, Clone)]
pub struct ClientHandlers {
    /// Invoked after the reflected connection state updates.
    pub on_state_change: Option<StateChangeHandler>,
    /// Invoked on transport-reported subscription errors.
    pub on_error: Option<ErrorHandler>,
}

struct ClientInner {
    initialized: bool,
    event_loop: Option<JoinHandle<()>>,
}

/// Everything the event loop needs, detached from the `Client` so the task
/// owns its context outright.
struct EventLoopContext {
    registry: Arc<ChannelRegistry>,
    transport: Arc<dyn Transport>,
    authorizer: Option<Arc<Authorizer>>,
    state: Arc<watch::Sender<ConnectionState>>,
    handlers: ClientHandlers,
}

/// Client for a hosted publish/subscribe messaging backend.
pub struct Client {
    options: ConnectionOptions,
    transport: Arc<dyn Transport>,
    registry: Arc<ChannelRegistry>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    inner: Mutex<ClientInner>,
}

impl Client {
    /// Create a client over the given transport. No I/O happens until
    /// [`Client::init`] and [`Client::connect`].
    pub fn new(options: ConnectionOptions, transport: Arc<dyn Transport>) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Uninitialized);
        Self {
            options,
            transport,
            registry: Arc::new(ChannelRegistry::new()),
            state_tx: Arc::new(state_tx),
            state_rx,
            inner: Mutex::new(ClientInner { initialized: false, event_loop: None }),
        }
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, ClientInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_initialized(&self) -> Result<(), ClientError> {
        if self.lock_inner().initialized {
            Ok(())
        } else {
            Err(ClientError::NotInitialized)
        }
    }

    /// Configure the transport and start the event loop. Does not open the
    /// network connection.
    ///
    /// `tokens` supplies bearer tokens for private-channel authorization;
    /// when it or the configured auth URL is absent, authorization requests
    /// are answered with [`AuthorizeError::NotConfigured`]. Must be called
    /// from within a Tokio runtime.
    pub async fn init(
        &self,
        tokens: Option<TokenSource>,
        handlers: ClientHandlers,
    ) -> Result<(), ClientError> {
        {
            let mut inner = self.lock_inner();
            if inner.initialized {
                return Err(ClientError::AlreadyInitialized);
            }
            inner.initialized = true;
        }

        match self.try_init(tokens, handlers).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.lock_inner().initialized = false;
                Err(error)
            },
        }
    }

    async fn try_init(
        &self,
        tokens: Option<TokenSource>,
        handlers: ClientHandlers,
    ) -> Result<(), ClientError> {
        let authorizer = match (self.options.auth_url(), tokens) {
            (Some(url), Some(tokens)) => {
                Some(Arc::new(Authorizer::new(url, tokens, self.options.authorizer_timeout())))
            },
            _ => None,
        };

        let (events_tx, events_rx) = mpsc::channel(TRANSPORT_EVENT_QUEUE);
        self.transport.init(TransportConfig::from(&self.options), events_tx).await?;

        let context = EventLoopContext {
            registry: Arc::clone(&self.registry),
            transport: Arc::clone(&self.transport),
            authorizer,
            state: Arc::clone(&self.state_tx),
            handlers,
        };
        self.lock_inner().event_loop = Some(tokio::spawn(run_event_loop(events_rx, context)));

        Ok(())
    }

    /// Open the connection. Thin delegation; idempotency is the transport's
    /// contract.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.ensure_initialized()?;
        self.transport.connect().await?;
        Ok(())
    }

    /// Close the connection. Thin delegation; idempotent.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.ensure_initialized()?;
        self.transport.disconnect().await?;
        Ok(())
    }

    /// Register `listener` for events on `channel`.
    ///
    /// The transport-level subscribe is issued only when the channel gains
    /// its first listener, so subscribing many listeners to one channel
    /// never duplicates transport subscriptions. The returned handle is the
    /// token for [`Client::unsubscribe_from_channel`].
    pub async fn subscribe_to_channel(
        &self,
        channel: ChannelName,
        listener: Listener,
    ) -> Result<SubscriptionHandle, ClientError> {
        self.ensure_initialized()?;

        let registration = self.registry.subscribe(channel.clone(), listener);
        if registration.first_for_channel {
            if let Err(error) = self.transport.subscribe(&channel).await {
                // Keep the registry honest: a channel we never managed to
                // subscribe must not keep a listener entry alive.
                self.registry.unsubscribe(&registration.handle);
                return Err(error.into());
            }
            tracing::debug!(channel = %channel, "subscribed to channel");
        }

        Ok(registration.handle)
    }

    /// Remove the registration identified by `handle`.
    ///
    /// When the channel loses its last listener, exactly one transport-level
    /// unsubscribe is issued: no transport subscription outlives its last
    /// local listener. Unknown handles are a no-op.
    pub async fn unsubscribe_from_channel(
        &self,
        handle: &SubscriptionHandle,
    ) -> Result<(), ClientError> {
        self.ensure_initialized()?;

        let outcome = self.registry.unsubscribe(handle);
        if outcome.channel_empty {
            self.transport.unsubscribe(&handle.channel).await?;
            tracing::debug!(channel = %handle.channel, "unsubscribed from channel");
        }

        Ok(())
    }

    /// Current connection state as last reported by the transport.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch connection state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Stop the event loop and close the connection. The client may be
    /// initialized again afterwards.
    pub async fn dispose(&self) -> Result<(), ClientError> {
        let (was_initialized, event_loop) = {
            let mut inner = self.lock_inner();
            let was_initialized = inner.initialized;
            inner.initialized = false;
            (was_initialized, inner.event_loop.take())
        };

        if let Some(task) = event_loop {
            task.abort();
        }
        if was_initialized {
            self.transport.disconnect().await?;
        }
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(task) = self.lock_inner().event_loop.take() {
            task.abort();
        }
    }
}

/// Drain transport events until the transport drops its sender.
async fn run_event_loop(mut events: mpsc::Receiver<TransportEvent>, context: EventLoopContext) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::StateChanged { previous, current } => {
                tracing::debug!(%previous, %current, "connection state changed");
                let _ = context.state.send(current);
                if let Some(on_state_change) = &context.handlers.on_state_change {
                    on_state_change(previous, current);
                }
            },

            TransportEvent::Message(event) => {
                let report = context.registry.dispatch(&event.channel, &event);
                if report.panicked > 0 {
                    tracing::warn!(
                        channel = %event.channel,
                        panicked = report.panicked,
                        "listener panicked during dispatch"
                    );
                }
            },

            TransportEvent::SubscriptionError { channel, message } => {
                tracing::warn!(%channel, %message, "transport reported subscription error");
                resubscribe_if_occupied(&context, &channel).await;
                if let Some(on_error) = &context.handlers.on_error {
                    on_error(&TransportError::Subscription { channel, message });
                }
            },

            TransportEvent::AuthorizationRequest { channel, socket_id, respond } => {
                match &context.authorizer {
                    Some(authorizer) => {
                        // Answer from a task of its own: a slow authorization
                        // must not stall event dispatch, and overlapping
                        // authorizations stay independent.
                        let authorizer = Arc::clone(authorizer);
                        tokio::spawn(async move {
                            let result = authorizer.authorize(&channel, &socket_id).await;
                            if respond.send(result).is_err() {
                                tracing::debug!(
                                    %channel,
                                    "transport dropped authorization reply receiver"
                                );
                            }
                        });
                    },
                    None => {
                        let _ = respond.send(Err(AuthorizeError::NotConfigured));
                    },
                }
            },
        }
    }
    tracing::debug!("transport event channel closed, event loop stopped");
}

/// Re-attach a failed subscription while local listeners remain; covers the
/// transport's auto-retry hook after a subscription error.
async fn resubscribe_if_occupied(context: &EventLoopContext, channel: &ChannelName) {
    if !context.registry.contains(channel) {
        return;
    }
    if let Err(error) = context.transport.subscribe(channel).await {
        tracing::warn!(%channel, %error, "re-subscribe after subscription error failed");
    }
}
