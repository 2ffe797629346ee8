//! Target settings for a cloud controller.

use std::time::Duration;

/// Default time allowed for establishing a TCP/TLS connection.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how to connect to the cloud controller.
///
/// Immutable once a [`CloudControllerClient`](crate::CloudControllerClient)
/// has been built from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetSettings {
    /// Base URL of the API, e.g. `https://api.example.com`.
    pub url: String,
    /// Accept any server certificate.
    pub skip_ssl_validation: bool,
    /// Upper bound on each connection attempt.
    pub dial_timeout: Duration,
}

impl TargetSettings {
    /// Create settings for `url` with certificate validation and the default
    /// dial timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            skip_ssl_validation: false,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
        }
    }

    /// Set whether certificate validation is skipped.
    pub fn skip_ssl_validation(mut self, skip: bool) -> Self {
        self.skip_ssl_validation = skip;
        self
    }

    /// Set the dial timeout.
    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// The URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}
