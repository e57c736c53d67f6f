//! Authorization handshake tests against a mock HTTP endpoint.
//!
//! These verify the wire contract (body, headers), the retry policy (one
//! backoff step per failed attempt, cumulative-delay budget), and lazy
//! token resolution per attempt.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use riptide_client::{AuthorizeError, Authorizer, TokenProvider, TokenSource};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

const BUDGET: Duration = Duration::from_secs(60);

#[tokio::test]
async fn posts_socket_id_channel_name_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/broadcasting/auth"))
        .and(header("authorization", "Bearer tok123"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({"socket_id": "81.1", "channel_name": "private-cart"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"auth": "key:sig"})))
        .expect(1)
        .mount(&server)
        .await;

    let authorizer = Authorizer::new(
        format!("{}/broadcasting/auth", server.uri()),
        TokenSource::fixed("tok123"),
        BUDGET,
    );

    let payload = authorizer.authorize(&"private-cart".into(), "81.1").await.unwrap();
    assert_eq!(payload.body, json!({"auth": "key:sig"}));
}

#[tokio::test]
async fn transient_failure_is_retried_once_after_one_second() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"auth": "key:sig"})))
        .expect(1)
        .mount(&server)
        .await;

    let authorizer =
        Authorizer::new(server.uri(), TokenSource::fixed("tok123"), BUDGET);

    let started = Instant::now();
    let payload = authorizer.authorize(&"private-cart".into(), "81.1").await.unwrap();

    assert_eq!(payload.body, json!({"auth": "key:sig"}));
    assert!(
        started.elapsed() >= Duration::from_millis(1000),
        "the single retry must wait out the first backoff step"
    );
}

#[tokio::test]
async fn exhausted_budget_is_terminal_and_names_channel_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    // A one second budget refuses even the first 1 s backoff delay, so the
    // call fails terminally without sleeping.
    let authorizer =
        Authorizer::new(server.uri(), TokenSource::fixed("tok123"), Duration::from_secs(1));

    let started = Instant::now();
    let error = authorizer.authorize(&"private-cart".into(), "81.1").await.unwrap_err();

    assert_eq!(error, AuthorizeError::Terminal { channel: "private-cart".into(), status: 403 });
    assert!(started.elapsed() < Duration::from_millis(500), "terminal failure must not sleep");
}

/// Token provider that hands out `tok-1`, `tok-2`, ... per call.
struct RotatingTokens {
    calls: AtomicU32,
}

#[async_trait]
impl TokenProvider for RotatingTokens {
    async fn token(&self) -> Result<String, AuthorizeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("tok-{call}"))
    }
}

#[tokio::test]
async fn dynamic_token_source_is_resolved_on_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"auth": "key:sig"})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(RotatingTokens { calls: AtomicU32::new(0) });
    let dyn_provider: Arc<dyn TokenProvider> = provider.clone();
    let authorizer =
        Authorizer::new(server.uri(), TokenSource::dynamic(dyn_provider), BUDGET);

    authorizer.authorize(&"private-cart".into(), "81.1").await.unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 2, "one token per attempt, never cached");
}

#[tokio::test]
async fn malformed_success_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let authorizer = Authorizer::new(server.uri(), TokenSource::fixed("tok123"), BUDGET);

    let error = authorizer.authorize(&"private-cart".into(), "81.1").await.unwrap_err();
    assert!(matches!(error, AuthorizeError::InvalidPayload { .. }));
}

#[tokio::test]
async fn request_level_failure_is_not_retried() {
    // Nothing listens on port 1; the request fails before any HTTP status
    // exists, which is outside the retry path.
    let authorizer =
        Authorizer::new("http://127.0.0.1:1/auth", TokenSource::fixed("tok123"), BUDGET);

    let started = Instant::now();
    let error = authorizer.authorize(&"private-cart".into(), "81.1").await.unwrap_err();

    assert!(matches!(error, AuthorizeError::Request { .. }));
    assert!(started.elapsed() < Duration::from_secs(5), "request failures must not back off");
}
