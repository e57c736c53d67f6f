//! Private-channel authorization against the configured HTTP endpoint.
//!
//! One authorization call chain is one `authorize()` invocation: it POSTs
//! the socket and channel identifiers with a bearer token, retries non-2xx
//! responses with exponential backoff, and gives up once the cumulative
//! delay would breach the configured budget. The attempt counter lives on
//! the call's stack, so overlapping authorizations for different channels
//! never interfere and a later call always starts from attempt 1.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use riptide_core::ChannelName;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::error::AuthorizeError;

/// Delay before the first retry; doubles on every subsequent attempt.
const BASE_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Signed credential proving the client may subscribe to a private channel.
///
/// The shape is defined by the transport vendor; this library returns the
/// endpoint's JSON body verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationPayload {
    /// The payload exactly as returned by the auth endpoint.
    pub body: serde_json::Value,
}

/// Produces bearer tokens for the authorization request.
///
/// Implement this when tokens rotate: the provider is invoked lazily on
/// every authorization attempt, never cached.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Produce a currently-valid bearer token.
    async fn token(&self) -> Result<String, AuthorizeError>;
}

/// Where the authorizer gets its bearer token.
#[derive(Clone)]
pub enum TokenSource {
    /// A fixed token string.
    Static(String),
    /// A provider called on every attempt (supports rotating tokens).
    Dynamic(Arc<dyn TokenProvider>),
}

impl TokenSource {
    /// Token source backed by a fixed string.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// Token source backed by a provider invoked at call time.
    pub fn dynamic(provider: Arc<dyn TokenProvider>) -> Self {
        Self::Dynamic(provider)
    }

    /// Resolve the token for one attempt.
    pub async fn resolve(&self) -> Result<String, AuthorizeError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Dynamic(provider) => provider.token().await,
        }
    }
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print token material.
        match self {
            Self::Static(_) => f.write_str("TokenSource::Static(..)"),
            Self::Dynamic(_) => f.write_str("TokenSource::Dynamic(..)"),
        }
    }
}

/// Exponential backoff schedule bounded by a cumulative-delay budget.
///
/// Created fresh for every authorization call chain; never shared.
#[derive(Debug, Clone)]
struct Backoff {
    budget: Duration,
    slept: Duration,
    attempt: u32,
}

impl Backoff {
    fn new(budget: Duration) -> Self {
        Self { budget, slept: Duration::ZERO, attempt: 1 }
    }

    /// Delay to sleep before the next retry, or `None` once the cumulative
    /// delay would reach the budget and the caller must fail terminally.
    fn next_delay(&mut self) -> Option<Duration> {
        let exponent = (self.attempt - 1).min(31);
        let delay = BASE_RETRY_DELAY.saturating_mul(1u32 << exponent);

        let total = self.slept.saturating_add(delay);
        if total >= self.budget {
            return None;
        }

        self.slept = total;
        self.attempt += 1;
        Some(delay)
    }
}

#[derive(Serialize)]
struct AuthRequestBody<'a> {
    socket_id: &'a str,
    channel_name: &'a ChannelName,
}

/// Obtains signed authorization payloads for private channels.
pub struct Authorizer {
    http: reqwest::Client,
    auth_url: String,
    tokens: TokenSource,
    budget: Duration,
}

impl Authorizer {
    /// Create an authorizer for the given endpoint, token source, and
    /// cumulative backoff budget.
    pub fn new(auth_url: impl Into<String>, tokens: TokenSource, budget: Duration) -> Self {
        Self { http: reqwest::Client::new(), auth_url: auth_url.into(), tokens, budget }
    }

    /// Authorize a subscription to `channel` for the connection identified
    /// by `socket_id`.
    ///
    /// Non-2xx responses are retried with delays of 1 s, 2 s, 4 s, ... while
    /// the cumulative delay stays below the budget; exhausting the budget
    /// yields [`AuthorizeError::Terminal`] naming the channel and the last
    /// HTTP status. Request-level failures and malformed 2xx bodies are not
    /// retried.
    pub async fn authorize(
        &self,
        channel: &ChannelName,
        socket_id: &str,
    ) -> Result<AuthorizationPayload, AuthorizeError> {
        let mut backoff = Backoff::new(self.budget);

        loop {
            let token = self.tokens.resolve().await?;
            let response = self
                .http
                .post(&self.auth_url)
                .bearer_auth(token)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(&AuthRequestBody { socket_id, channel_name: channel })
                .send()
                .await
                .map_err(|e| AuthorizeError::Request { message: e.to_string() })?;

            let status = response.status();
            if status.is_success() {
                let body = response
                    .json()
                    .await
                    .map_err(|e| AuthorizeError::InvalidPayload { message: e.to_string() })?;
                return Ok(AuthorizationPayload { body });
            }

            match backoff.next_delay() {
                Some(delay) => {
                    tracing::warn!(
                        channel = %channel,
                        status = status.as_u16(),
                        delay_ms = delay.as_millis() as u64,
                        "authorization attempt failed, retrying"
                    );
                    sleep(delay).await;
                },
                None => {
                    return Err(AuthorizeError::Terminal {
                        channel: channel.clone(),
                        status: status.as_u16(),
                    });
                },
            }
        }
    }
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("auth_url", &self.auth_url)
            .field("tokens", &self.tokens)
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}
