//! Cloud controller and UAA client for Rust.
//!
//! This crate provides the connection pipeline used by the `cfkit` command
//! line: a raw HTTP [`Connection`] wrapped by independent layers that add
//! request tracing, bearer-token authentication and retries.
//!
//! ## Connections and wrappers
//!
//! A [`Connection`] sends one [`Request`] and returns one [`Response`] or a
//! [`ConnectionError`]. A [`ConnectionWrapper`] takes a connection and returns
//! a new one with the same contract. Wrappers are applied innermost first:
//!
//! ```ignore
//! use cfkit_client::{ClientBuilder, TargetSettings, RequestLogger, RetryRequest, UaaAuthentication};
//!
//! let mut client = ClientBuilder::new("cfkit", "1.0.0")
//!     .target(TargetSettings::new("https://api.example.com"))
//!     .await?;
//!
//! client.wrap_connection(RequestLogger::new(output));
//! client.wrap_connection(UaaAuthentication::new(uaa_client, store));
//! client.wrap_connection(RetryRequest::new(2));
//!
//! let groups = client.get_security_groups(&[Filter::name("public")]).await?;
//! ```
//!
//! Requests then flow `RetryRequest -> UaaAuthentication -> RequestLogger ->
//! HttpConnection`.
//!
//! ## Failure classes
//!
//! Every failure carries a [`FailureKind`]:
//!
//! - `Network`, `Timeout` and `Server` failures are transient and retried by
//!   [`RetryRequest`].
//! - `Unauthorized` responses are handled once by [`UaaAuthentication`], which
//!   refreshes the access token and replays the request.
//! - `Client`, `InvalidResponse`, `Authentication` and `Configuration` failures
//!   are surfaced to the caller unchanged.
//!
//! ## Token refresh
//!
//! Token refresh is single-flight: when several concurrent requests are
//! rejected with the same access token, only one refresh request reaches the
//! identity service and every caller replays with its result.
//!
//! ## TLS
//!
//! TLS uses [rustls](https://docs.rs/rustls). The `tls` feature (default)
//! enables the ring provider with native root certificates.
//! [`TargetSettings::skip_ssl_validation`] installs a verifier that accepts
//! any certificate.

pub mod cloud_controller;
pub mod config;
mod connection;
mod error;
pub mod token;
pub mod transport;
pub mod uaa;
pub mod wrapper;

#[cfg(test)]
pub(crate) mod test_support;

pub use cloud_controller::{
    ApiInfo, ClientBuilder, CloudControllerClient, Filter, SecurityGroup, SecurityGroupRule,
};
pub use config::{Backoff, InvalidRetryPolicy, RetryPolicy, TargetSettings};
pub use connection::{BoxFuture, Connection, ConnectionWrapper, Request, Response};
pub use error::{ConnectionError, FailureKind, HttpStatusError};
pub use token::{Credentials, MemoryTokenStore, StoreError, Token, TokenStore};
pub use transport::{HttpConnection, HttpConnectionBuilder};
pub use uaa::{UaaClient, UaaConfig};
pub use wrapper::{
    LoggedBody, LoggedRequest, LoggedResponse, RequestLogger, RequestLoggerOutput, RetryRequest,
    UaaAuthentication,
};

// Re-export HTTP types that appear in the public API
pub use bytes::Bytes;
pub use http::{HeaderMap, Method, StatusCode};
