//! Client configuration, captured once at construction.

use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Time without outbound traffic before the transport sends a ping.
pub const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Time the transport waits for a pong response.
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(30);

/// Cumulative backoff budget for one authorization call chain.
pub const DEFAULT_AUTHORIZER_TIMEOUT: Duration = Duration::from_secs(60);

/// Immutable connection configuration.
///
/// Built via [`ConnectionOptions::builder`]; defaults are merged in for
/// anything the caller leaves unset. Fields are private so an options value
/// can only exist in validated form.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    api_key: String,
    cluster: String,
    use_tls: bool,
    activity_timeout: Duration,
    pong_timeout: Duration,
    auth_url: Option<String>,
    authorizer_timeout: Duration,
}

impl ConnectionOptions {
    /// Start building options for the given application key and cluster.
    pub fn builder(
        api_key: impl Into<String>,
        cluster: impl Into<String>,
    ) -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder {
            api_key: api_key.into(),
            cluster: cluster.into(),
            use_tls: true,
            activity_timeout: DEFAULT_ACTIVITY_TIMEOUT,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            auth_url: None,
            authorizer_timeout: DEFAULT_AUTHORIZER_TIMEOUT,
        }
    }

    /// Application key issued by the messaging backend.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Cluster/region identifier.
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Whether the transport should use TLS.
    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    /// Time without outbound traffic before the transport pings.
    pub fn activity_timeout(&self) -> Duration {
        self.activity_timeout
    }

    /// Time the transport waits for a pong.
    pub fn pong_timeout(&self) -> Duration {
        self.pong_timeout
    }

    /// Endpoint returning auth signatures for private channels, if any.
    pub fn auth_url(&self) -> Option<&str> {
        self.auth_url.as_deref()
    }

    /// Cumulative backoff budget for one authorization call chain.
    pub fn authorizer_timeout(&self) -> Duration {
        self.authorizer_timeout
    }
}

/// Builder for [`ConnectionOptions`].
#[derive(Debug, Clone)]
pub struct ConnectionOptionsBuilder {
    api_key: String,
    cluster: String,
    use_tls: bool,
    activity_timeout: Duration,
    pong_timeout: Duration,
    auth_url: Option<String>,
    authorizer_timeout: Duration,
}

impl ConnectionOptionsBuilder {
    /// Use TLS for the transport connection (default: true).
    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Activity timeout (default: 30 s).
    pub fn activity_timeout(mut self, timeout: Duration) -> Self {
        self.activity_timeout = timeout;
        self
    }

    /// Activity timeout in milliseconds, matching the vendor configuration
    /// surface.
    pub fn activity_timeout_ms(self, millis: u64) -> Self {
        self.activity_timeout(Duration::from_millis(millis))
    }

    /// Pong timeout (default: 30 s).
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    /// Pong timeout in milliseconds, matching the vendor configuration
    /// surface.
    pub fn pong_timeout_ms(self, millis: u64) -> Self {
        self.pong_timeout(Duration::from_millis(millis))
    }

    /// Endpoint returning auth signatures for private channels.
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = Some(url.into());
        self
    }

    /// Authorization backoff budget (default: 60 s).
    pub fn authorizer_timeout(mut self, timeout: Duration) -> Self {
        self.authorizer_timeout = timeout;
        self
    }

    /// Authorization backoff budget in whole seconds, matching the vendor
    /// configuration surface.
    pub fn authorizer_timeout_secs(self, seconds: u64) -> Self {
        self.authorizer_timeout(Duration::from_secs(seconds))
    }

    /// Validate and produce the immutable options.
    pub fn build(self) -> Result<ConnectionOptions, ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.cluster.trim().is_empty() {
            return Err(ConfigError::MissingCluster);
        }
        if let Some(url) = &self.auth_url {
            let parsed = Url::parse(url)
                .map_err(|_| ConfigError::InvalidAuthUrl { url: url.clone() })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::InvalidAuthUrl { url: url.clone() });
            }
        }

        Ok(ConnectionOptions {
            api_key: self.api_key,
            cluster: self.cluster,
            use_tls: self.use_tls,
            activity_timeout: self.activity_timeout,
            pong_timeout: self.pong_timeout,
            auth_url: self.auth_url,
            authorizer_timeout: self.authorizer_timeout,
        })
    }
}
