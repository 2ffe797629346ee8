//! The connection contract shared by the transport and every wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ConnectionError;

/// Type alias for a boxed future returning a result.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request to send through a [`Connection`].
///
/// Header names are case-insensitive and inserting a header replaces any
/// previous value.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Absolute URL, including the query string.
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    /// Create a request with no headers and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a DELETE request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header, replacing any existing value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a header from strings, failing on invalid names or values.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, ConnectionError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConnectionError::InvalidRequest(format!("invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            ConnectionError::InvalidRequest(format!("invalid header value for {}", name))
        })?;
        Ok(self.header(name, value))
    }

    /// Set the `Accept: application/json` header.
    pub fn accept_json(self) -> Self {
        self.header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    /// Set a JSON body and matching content type.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ConnectionError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ConnectionError::InvalidRequest(format!("JSON encoding failed: {}", e)))?;
        self.body = Some(Bytes::from(bytes));
        Ok(self.header(CONTENT_TYPE, HeaderValue::from_static("application/json")))
    }

    /// Set a `application/x-www-form-urlencoded` body.
    pub fn form<T: Serialize>(mut self, body: &T) -> Result<Self, ConnectionError> {
        let encoded = serde_qs::to_string(body)
            .map_err(|e| ConnectionError::InvalidRequest(format!("form encoding failed: {}", e)))?;
        self.body = Some(Bytes::from(encoded));
        Ok(self.header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        ))
    }
}

/// A response received from a [`Connection`].
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Create a new response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Convert statuses of 400 and above into [`ConnectionError::Status`].
    pub fn error_for_status(self) -> Result<Self, ConnectionError> {
        if self.status.is_client_error() || self.status.is_server_error() {
            Err(ConnectionError::status(self.status, self.headers, self.body))
        } else {
            Ok(self)
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ConnectionError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ConnectionError::InvalidResponse(format!("JSON decoding failed: {}", e)))
    }
}

/// Sends one request and returns one response.
///
/// Implemented by the HTTP transport and by every wrapper. Implementations
/// must be safe to call concurrently.
pub trait Connection: Send + Sync {
    /// Send `request` and wait for the response.
    fn make(&self, request: Request) -> BoxFuture<'_, Result<Response, ConnectionError>>;
}

impl<C: Connection + ?Sized> Connection for Arc<C> {
    fn make(&self, request: Request) -> BoxFuture<'_, Result<Response, ConnectionError>> {
        (**self).make(request)
    }
}

/// Adds behavior around an existing connection.
///
/// The returned connection must keep the [`Connection`] contract: requests
/// the wrapper does not act on are forwarded unchanged, and their results are
/// returned unchanged.
pub trait ConnectionWrapper {
    /// Wrap `inner`, returning the new outermost connection.
    fn wrap(self, inner: Arc<dyn Connection>) -> Arc<dyn Connection>;
}

impl<F> ConnectionWrapper for F
where
    F: FnOnce(Arc<dyn Connection>) -> Arc<dyn Connection>,
{
    fn wrap(self, inner: Arc<dyn Connection>) -> Arc<dyn Connection> {
        self(inner)
    }
}
