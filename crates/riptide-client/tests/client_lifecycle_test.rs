//! End-to-end client tests against a scripted transport.
//!
//! These exercise the contracts the unit tests cannot: the asynchronous
//! event loop between transport and registry, the one-transport-subscribe-
//! per-channel rule, and the cleanup guarantee that no transport
//! subscription outlives its last local listener.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use riptide_client::{
    AuthorizeError, Client, ClientError, ClientHandlers, ConnectionOptions, ConnectionState,
    TokenSource,
};
use riptide_harness::{MockTransport, collecting_listener, tagging_listener, wait_for};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

fn options() -> ConnectionOptions {
    ConnectionOptions::builder("key", "mt1").build().unwrap()
}

/// Build a client over a fresh mock transport and run `init`.
async fn initialized_client(options: ConnectionOptions) -> (Arc<Client>, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let client = Arc::new(Client::new(options, transport.clone()));
    client.init(None, ClientHandlers::default()).await.unwrap();
    (client, transport)
}

#[tokio::test]
async fn subscribed_listener_receives_event_exactly_once_then_cleanup_releases_channel() {
    let (client, transport) = initialized_client(options()).await;
    let (listener, events) = collecting_listener();

    let handle = client.subscribe_to_channel("orders".into(), listener).await.unwrap();
    assert_eq!(transport.subscribe_count(&"orders".into()), 1);

    transport.emit_state(ConnectionState::Connecting, ConnectionState::Connected).await;
    transport.emit_message("orders", "update", json!({"id": 7})).await;

    assert!(wait_for(|| !events.lock().unwrap().is_empty()).await);
    tokio::time::sleep(Duration::from_millis(20)).await;
    {
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1, "listener must be invoked exactly once");
        assert_eq!(events[0].name, "update");
        assert_eq!(events[0].data, json!({"id": 7}));
    }

    client.unsubscribe_from_channel(&handle).await.unwrap();
    assert_eq!(transport.unsubscribe_count(&"orders".into()), 1);
}

#[tokio::test]
async fn many_listeners_share_one_transport_subscription() {
    let (client, transport) = initialized_client(options()).await;
    let (first, _) = collecting_listener();
    let (second, _) = collecting_listener();

    let first_handle = client.subscribe_to_channel("orders".into(), first).await.unwrap();
    let second_handle = client.subscribe_to_channel("orders".into(), second).await.unwrap();
    assert_eq!(transport.subscribe_count(&"orders".into()), 1);

    client.unsubscribe_from_channel(&first_handle).await.unwrap();
    assert_eq!(transport.unsubscribe_count(&"orders".into()), 0);

    client.unsubscribe_from_channel(&second_handle).await.unwrap();
    assert_eq!(transport.unsubscribe_count(&"orders".into()), 1);
}

#[tokio::test]
async fn events_reach_listeners_in_registration_order() {
    let (client, transport) = initialized_client(options()).await;
    let log = Arc::new(Mutex::new(Vec::new()));

    for tag in ["A", "B", "C"] {
        client
            .subscribe_to_channel("orders".into(), tagging_listener(tag, &log))
            .await
            .unwrap();
    }
    transport.emit_message("orders", "update", json!({})).await;

    assert!(wait_for(|| log.lock().unwrap().len() == 3).await);
    assert_eq!(*log.lock().unwrap(), ["A", "B", "C"]);
}

#[tokio::test]
async fn unsubscribing_an_already_removed_handle_is_a_noop() {
    let (client, transport) = initialized_client(options()).await;
    let (listener, _) = collecting_listener();

    let handle = client.subscribe_to_channel("orders".into(), listener).await.unwrap();
    client.unsubscribe_from_channel(&handle).await.unwrap();
    client.unsubscribe_from_channel(&handle).await.unwrap();

    assert_eq!(transport.unsubscribe_count(&"orders".into()), 1);
}

#[tokio::test]
async fn subscription_error_reattaches_wiring_while_listeners_remain() {
    let transport = Arc::new(MockTransport::new());
    let client = Arc::new(Client::new(options(), transport.clone()));

    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let handlers = ClientHandlers {
        on_state_change: None,
        on_error: Some(Arc::new(move |error| {
            sink.lock().unwrap().push(error.to_string());
        })),
    };
    client.init(None, handlers).await.unwrap();

    let (listener, _) = collecting_listener();
    client.subscribe_to_channel("orders".into(), listener).await.unwrap();
    assert_eq!(transport.subscribe_count(&"orders".into()), 1);

    transport.emit_subscription_error("orders", "backend hiccup").await;

    assert!(wait_for(|| transport.subscribe_count(&"orders".into()) == 2).await);
    assert!(wait_for(|| !errors.lock().unwrap().is_empty()).await);
    assert!(errors.lock().unwrap()[0].contains("backend hiccup"));
}

#[tokio::test]
async fn subscription_error_for_an_abandoned_channel_is_ignored() {
    let (_client, transport) = initialized_client(options()).await;

    transport.emit_subscription_error("ghost", "nobody cares").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(transport.subscribe_count(&"ghost".into()), 0);
}

#[tokio::test]
async fn authorization_request_without_configuration_is_rejected_immediately() {
    let (_client, transport) = initialized_client(options()).await;

    let reply = transport.request_authorization("private-cart", "81.1").await;
    let result = reply.await.unwrap();

    assert_eq!(result, Err(AuthorizeError::NotConfigured));
}

#[tokio::test]
async fn authorization_request_is_answered_from_the_configured_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/broadcasting/auth"))
        .and(body_json(json!({"socket_id": "81.1", "channel_name": "private-cart"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"auth": "key:sig"})))
        .expect(1)
        .mount(&server)
        .await;

    let options = ConnectionOptions::builder("key", "mt1")
        .auth_url(format!("{}/broadcasting/auth", server.uri()))
        .build()
        .unwrap();

    let transport = Arc::new(MockTransport::new());
    let client = Arc::new(Client::new(options, transport.clone()));
    client
        .init(Some(TokenSource::fixed("tok123")), ClientHandlers::default())
        .await
        .unwrap();

    let reply = transport.request_authorization("private-cart", "81.1").await;
    let payload = reply.await.unwrap().unwrap();

    assert_eq!(payload.body, json!({"auth": "key:sig"}));
}

#[tokio::test]
async fn connection_state_is_reflected_and_reported() {
    let transport = Arc::new(MockTransport::new());
    let client = Arc::new(Client::new(options(), transport.clone()));

    let transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&transitions);
    let handlers = ClientHandlers {
        on_state_change: Some(Arc::new(move |previous, current| {
            sink.lock().unwrap().push((previous, current));
        })),
        on_error: None,
    };
    client.init(None, handlers).await.unwrap();
    assert_eq!(client.state(), ConnectionState::Uninitialized);

    transport.emit_state(ConnectionState::Uninitialized, ConnectionState::Connecting).await;
    transport.emit_state(ConnectionState::Connecting, ConnectionState::Connected).await;

    assert!(wait_for(|| client.state() == ConnectionState::Connected).await);
    assert_eq!(
        *transitions.lock().unwrap(),
        [
            (ConnectionState::Uninitialized, ConnectionState::Connecting),
            (ConnectionState::Connecting, ConnectionState::Connected),
        ]
    );
}

#[tokio::test]
async fn operations_before_init_are_rejected() {
    let transport = Arc::new(MockTransport::new());
    let client = Client::new(options(), transport);
    let (listener, _) = collecting_listener();

    assert!(matches!(client.connect().await, Err(ClientError::NotInitialized)));
    assert!(matches!(client.disconnect().await, Err(ClientError::NotInitialized)));
    assert!(matches!(
        client.subscribe_to_channel("orders".into(), listener).await,
        Err(ClientError::NotInitialized)
    ));
}

#[tokio::test]
async fn initializing_twice_is_rejected() {
    let (client, _transport) = initialized_client(options()).await;

    let result = client.init(None, ClientHandlers::default()).await;
    assert!(matches!(result, Err(ClientError::AlreadyInitialized)));
}

#[tokio::test]
async fn failed_transport_subscribe_rolls_back_the_registration() {
    let (client, transport) = initialized_client(options()).await;
    let (listener, _) = collecting_listener();

    transport.fail_next_subscribe("boom");
    let result = client.subscribe_to_channel("orders".into(), listener).await;
    assert!(matches!(result, Err(ClientError::Transport(_))));

    // The registration was rolled back, so a fresh subscribe is again the
    // channel's first and reaches the transport.
    let (listener, _) = collecting_listener();
    client.subscribe_to_channel("orders".into(), listener).await.unwrap();
    assert_eq!(transport.subscribe_count(&"orders".into()), 2);
}

#[tokio::test]
async fn dispose_disconnects_and_requires_reinit() {
    let (client, transport) = initialized_client(options()).await;

    client.dispose().await.unwrap();
    assert_eq!(transport.disconnect_count(), 1);
    assert!(matches!(client.connect().await, Err(ClientError::NotInitialized)));

    // The lifecycle is owned by the host: a disposed client may be
    // initialized again.
    client.init(None, ClientHandlers::default()).await.unwrap();
    client.connect().await.unwrap();
    assert_eq!(transport.connect_count(), 1);
}
