//! HTTP transport for the pipeline.
//!
//! This module provides [`HttpConnection`], the innermost
//! [`Connection`](crate::Connection) of every pipeline. It uses hyper_util's
//! legacy client with rustls and supports:
//!
//! - HTTP/1.1 and HTTP/2 with automatic protocol negotiation
//! - A dial timeout bounding each connection attempt
//! - Skipping certificate validation for self-signed targets
//! - Connection pooling
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots` for convenience
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates
//!
//! # Example
//!
//! ```ignore
//! use cfkit_client::transport::HttpConnection;
//! use std::time::Duration;
//!
//! let connection = HttpConnection::builder()
//!     .dial_timeout(Duration::from_secs(5))
//!     .skip_ssl_validation(true)
//!     .build()?;
//! ```

mod connector;
mod http;

pub use connector::{
    DangerousAcceptAnyCertVerifier, build_https_connector, danger_accept_invalid_certs_config,
    default_tls_config, has_tls_support,
};
pub use http::{HttpConnection, HttpConnectionBuilder};

// Re-export rustls types that users might need for TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;
