//! Connection failure types.
//!
//! This module provides [`ConnectionError`], the error type returned by every
//! [`Connection`](crate::Connection), and [`FailureKind`], the classification
//! the wrappers use to decide which failures they own.

use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::Deserialize;

/// Header carrying the platform request id.
const REQUEST_ID_HEADER: &str = "x-vcap-request-id";

/// Classification of a [`ConnectionError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The request never produced an HTTP response.
    Network,
    /// Connecting to the server took longer than the dial timeout.
    Timeout,
    /// The server answered with something that could not be understood.
    InvalidResponse,
    /// The server answered with a 5xx status.
    Server,
    /// The server rejected the request itself (4xx other than 401), or the
    /// request could not be built.
    Client,
    /// The server answered 401: the access token was missing or rejected.
    Unauthorized,
    /// Obtaining or refreshing an access token failed.
    Authentication,
    /// The connection could not be set up (TLS provider, invalid target).
    Configuration,
}

impl FailureKind {
    /// Returns whether failures of this kind may succeed on an immediate resend.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            FailureKind::Network | FailureKind::Timeout | FailureKind::Server
        )
    }
}

/// An HTTP response with a status of 400 or above.
///
/// The full response is kept so wrappers can log it and callers can inspect
/// platform error codes.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpStatusError {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Value of the `X-Vcap-Request-Id` header, if present.
    pub request_id: Option<String>,
    /// Human readable description extracted from the error body.
    pub description: Option<String>,
    /// Platform error code (e.g. `CF-InvalidAuthToken`), if present.
    pub error_code: Option<String>,
}

/// Error body shapes returned by the cloud controller and UAA.
#[derive(Deserialize, Default)]
struct ErrorBody {
    description: Option<String>,
    error_code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

impl HttpStatusError {
    /// Build a status error from raw response parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let parsed: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();
        let description = parsed
            .description
            .or(parsed.error_description)
            .or(parsed.message);
        let error_code = parsed.error_code.or(parsed.error);

        Self {
            status,
            headers,
            body,
            request_id,
            description,
            error_code,
        }
    }
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(description) = &self.description {
            write!(f, ": {}", description)?;
        }
        if let Some(code) = &self.error_code {
            write!(f, " ({})", code)?;
        }
        Ok(())
    }
}

/// Failure returned by a [`Connection`](crate::Connection).
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport-level error (connection refused, reset, DNS, TLS handshake).
    #[error("transport error: {0}")]
    Transport(String),

    /// The dial timeout expired before a connection was established.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The response could not be read or decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The server answered with a status of 400 or above.
    #[error("{0}")]
    Status(HttpStatusError),

    /// Obtaining or refreshing an access token failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The request could not be built (bad URL, header or body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The connection could not be configured.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ConnectionError {
    /// Build a status error from raw response parts.
    pub fn status(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        ConnectionError::Status(HttpStatusError::new(status, headers, body))
    }

    /// Classify this failure.
    ///
    /// Status errors map by code: 401 is `Unauthorized`, 5xx is `Server`,
    /// everything else is `Client`.
    pub fn kind(&self) -> FailureKind {
        match self {
            ConnectionError::Transport(_) => FailureKind::Network,
            ConnectionError::Timeout(_) => FailureKind::Timeout,
            ConnectionError::InvalidResponse(_) => FailureKind::InvalidResponse,
            ConnectionError::Status(err) if err.status == StatusCode::UNAUTHORIZED => {
                FailureKind::Unauthorized
            }
            ConnectionError::Status(err) if err.status.is_server_error() => FailureKind::Server,
            ConnectionError::Status(_) | ConnectionError::InvalidRequest(_) => FailureKind::Client,
            ConnectionError::Authentication(_) => FailureKind::Authentication,
            ConnectionError::Configuration(_) => FailureKind::Configuration,
        }
    }

    /// Returns whether this error indicates a transient condition that may
    /// be resolved by resending the request.
    ///
    /// # Example
    ///
    /// ```
    /// use cfkit_client::ConnectionError;
    ///
    /// let err = ConnectionError::Transport("connection reset".into());
    /// assert!(err.is_retryable());
    ///
    /// let err = ConnectionError::Authentication("refresh token expired".into());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        self.kind().is_transient()
    }

    /// Returns whether this error means the caller is not (or no longer)
    /// authenticated.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Unauthorized | FailureKind::Authentication
        )
    }

    /// Get the HTTP status code, if the server answered.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ConnectionError::Status(err) => Some(err.status),
            _ => None,
        }
    }

    /// Get the full status error, if the server answered.
    pub fn as_status(&self) -> Option<&HttpStatusError> {
        match self {
            ConnectionError::Status(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(code: u16, body: &str) -> ConnectionError {
        ConnectionError::status(
            StatusCode::from_u16(code).unwrap(),
            HeaderMap::new(),
            Bytes::from(body.to_string()),
        )
    }

    #[test]
    fn test_status_kinds() {
        assert_eq!(status_error(401, "").kind(), FailureKind::Unauthorized);
        assert_eq!(status_error(500, "").kind(), FailureKind::Server);
        assert_eq!(status_error(503, "").kind(), FailureKind::Server);
        assert_eq!(status_error(400, "").kind(), FailureKind::Client);
        assert_eq!(status_error(403, "").kind(), FailureKind::Client);
        assert_eq!(status_error(404, "").kind(), FailureKind::Client);
    }

    #[test]
    fn test_variant_kinds() {
        assert_eq!(
            ConnectionError::Transport("reset".into()).kind(),
            FailureKind::Network
        );
        assert_eq!(
            ConnectionError::Timeout("dial".into()).kind(),
            FailureKind::Timeout
        );
        assert_eq!(
            ConnectionError::InvalidResponse("bad json".into()).kind(),
            FailureKind::InvalidResponse
        );
        assert_eq!(
            ConnectionError::InvalidRequest("bad uri".into()).kind(),
            FailureKind::Client
        );
        assert_eq!(
            ConnectionError::Authentication("expired".into()).kind(),
            FailureKind::Authentication
        );
        assert_eq!(
            ConnectionError::Configuration("no tls".into()).kind(),
            FailureKind::Configuration
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(ConnectionError::Transport("reset".into()).is_retryable());
        assert!(ConnectionError::Timeout("dial".into()).is_retryable());
        assert!(status_error(502, "").is_retryable());

        assert!(!status_error(400, "").is_retryable());
        assert!(!status_error(401, "").is_retryable());
        assert!(!ConnectionError::Authentication("expired".into()).is_retryable());
        assert!(!ConnectionError::InvalidResponse("bad".into()).is_retryable());
    }

    #[test]
    fn test_is_authentication_failure() {
        assert!(status_error(401, "").is_authentication_failure());
        assert!(ConnectionError::Authentication("expired".into()).is_authentication_failure());
        assert!(!status_error(403, "").is_authentication_failure());
    }

    #[test]
    fn test_parses_cloud_controller_error_body() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, "req-123".parse().unwrap());
        let err = HttpStatusError::new(
            StatusCode::NOT_FOUND,
            headers,
            Bytes::from_static(
                br#"{"code":10000,"description":"Unknown request","error_code":"CF-NotFound"}"#,
            ),
        );

        assert_eq!(err.description.as_deref(), Some("Unknown request"));
        assert_eq!(err.error_code.as_deref(), Some("CF-NotFound"));
        assert_eq!(err.request_id.as_deref(), Some("req-123"));
        assert_eq!(
            err.to_string(),
            "HTTP 404 Not Found: Unknown request (CF-NotFound)"
        );
    }

    #[test]
    fn test_parses_uaa_error_body() {
        let err = HttpStatusError::new(
            StatusCode::UNAUTHORIZED,
            HeaderMap::new(),
            Bytes::from_static(
                br#"{"error":"invalid_token","error_description":"Invalid refresh token"}"#,
            ),
        );

        assert_eq!(err.description.as_deref(), Some("Invalid refresh token"));
        assert_eq!(err.error_code.as_deref(), Some("invalid_token"));
    }

    #[test]
    fn test_non_json_body() {
        let err = HttpStatusError::new(
            StatusCode::BAD_GATEWAY,
            HeaderMap::new(),
            Bytes::from_static(b"<html>bad gateway</html>"),
        );
        assert!(err.description.is_none());
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway");
    }
}
