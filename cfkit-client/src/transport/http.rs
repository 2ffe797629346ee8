//! Hyper-based HTTP connection.
//!
//! This module provides [`HttpConnection`], the raw transport at the bottom
//! of every pipeline, using hyper_util's legacy client.

use std::error::Error as StdError;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;

use super::connector::{build_https_connector, resolve_tls_config};
use crate::config::{DEFAULT_DIAL_TIMEOUT, TargetSettings};
use crate::{BoxFuture, Connection, ConnectionError, Request, Response};

/// Type alias for the hyper client with HTTPS connector.
type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTP connection using hyper_util's legacy client.
///
/// Supports HTTP/1.1 and HTTP/2 with TLS, connection pooling, and automatic
/// protocol negotiation via ALPN. Statuses of 400 and above are returned as
/// [`ConnectionError::Status`] with the full response attached.
///
/// # Example
///
/// ```ignore
/// use cfkit_client::{Connection, HttpConnection, Request};
///
/// let connection = HttpConnection::builder().build()?;
/// let response = connection
///     .make(Request::get("https://api.example.com/v2/info"))
///     .await?;
/// ```
#[derive(Clone)]
pub struct HttpConnection {
    client: HyperClient,
    skip_ssl_validation: bool,
    dial_timeout: Option<Duration>,
}

impl std::fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection")
            .field("skip_ssl_validation", &self.skip_ssl_validation)
            .field("dial_timeout", &self.dial_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpConnection {
    /// Create a new connection builder.
    pub fn builder() -> HttpConnectionBuilder {
        HttpConnectionBuilder::new()
    }

    /// Create a connection with default settings.
    pub fn new() -> Result<Self, ConnectionError> {
        Self::builder().build()
    }

    /// Create a connection using the TLS policy and dial timeout of `settings`.
    pub fn for_target(settings: &TargetSettings) -> Result<Self, ConnectionError> {
        Self::builder()
            .skip_ssl_validation(settings.skip_ssl_validation)
            .dial_timeout(settings.dial_timeout)
            .build()
    }

    /// Whether server certificates are accepted without validation.
    pub fn skips_ssl_validation(&self) -> bool {
        self.skip_ssl_validation
    }

    async fn send(&self, request: Request) -> Result<Response, ConnectionError> {
        let uri: http::Uri = request
            .url
            .parse()
            .map_err(|e| ConnectionError::InvalidRequest(format!("invalid URL {}: {}", request.url, e)))?;

        let mut builder = http::Request::builder().method(request.method).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            *headers = request.headers;
        }
        let http_request = builder
            .body(Full::new(request.body.unwrap_or_default()))
            .map_err(|e| ConnectionError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .request(http_request)
            .await
            .map_err(classify_send_error)?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| ConnectionError::Transport(format!("reading response body failed: {}", e)))?
            .to_bytes();

        tracing::debug!(status = %parts.status, bytes = body.len(), "received response");

        Response::new(parts.status, parts.headers, body).error_for_status()
    }
}

impl Connection for HttpConnection {
    fn make(&self, request: Request) -> BoxFuture<'_, Result<Response, ConnectionError>> {
        Box::pin(self.send(request))
    }
}

/// Map a hyper client error to a connection failure.
///
/// An expired dial timeout surfaces as an `io::ErrorKind::TimedOut` somewhere
/// in the source chain.
fn classify_send_error(err: hyper_util::client::legacy::Error) -> ConnectionError {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        let timed_out = cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut);
        if timed_out {
            return ConnectionError::Timeout(format!("request failed: {}", err));
        }
        source = cause.source();
    }

    let mut message = format!("request failed: {}", err);
    if let Some(cause) = err.source() {
        message.push_str(&format!(": {}", cause));
    }
    ConnectionError::Transport(message)
}

/// Builder for [`HttpConnection`].
///
/// # Example
///
/// ```ignore
/// use cfkit_client::HttpConnectionBuilder;
/// use std::time::Duration;
///
/// let connection = HttpConnectionBuilder::new()
///     .dial_timeout(Duration::from_secs(10))
///     .pool_idle_timeout(Duration::from_secs(90))
///     .build()?;
/// ```
pub struct HttpConnectionBuilder {
    /// Custom TLS configuration.
    tls_config: Option<ClientConfig>,
    /// Whether to accept invalid certificates.
    skip_ssl_validation: bool,
    /// Connect timeout per attempt.
    dial_timeout: Option<Duration>,
    /// Connection pool idle timeout.
    pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host.
    pool_max_idle_per_host: usize,
}

impl Default for HttpConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpConnectionBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            tls_config: None,
            skip_ssl_validation: false,
            dial_timeout: Some(DEFAULT_DIAL_TIMEOUT),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }

    /// Set a custom TLS configuration.
    ///
    /// Ignored when [`skip_ssl_validation`](Self::skip_ssl_validation) is set.
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Accept any server certificate.
    ///
    /// This makes the connection vulnerable to man-in-the-middle attacks.
    pub fn skip_ssl_validation(mut self, skip: bool) -> Self {
        self.skip_ssl_validation = skip;
        self
    }

    /// Set the time allowed for establishing each connection.
    ///
    /// Default: 5 seconds.
    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = Some(timeout);
        self
    }

    /// Remove the dial timeout.
    pub fn dial_timeout_none(mut self) -> Self {
        self.dial_timeout = None;
        self
    }

    /// Set the connection pool idle timeout.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of idle connections per host.
    ///
    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Build the connection.
    pub fn build(self) -> Result<HttpConnection, ConnectionError> {
        let tls_config = resolve_tls_config(self.tls_config, self.skip_ssl_validation)?;
        let https_connector = build_https_connector(tls_config, self.dial_timeout);

        let mut builder = Client::builder(TokioExecutor::new());

        // Required for pool_idle_timeout to work
        builder.pool_timer(TokioTimer::new());

        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);

        let client = builder.build(https_connector);

        Ok(HttpConnection {
            client,
            skip_ssl_validation: self.skip_ssl_validation,
            dial_timeout: self.dial_timeout,
        })
    }
}

impl std::fmt::Debug for HttpConnectionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnectionBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("skip_ssl_validation", &self.skip_ssl_validation)
            .field("dial_timeout", &self.dial_timeout)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}
