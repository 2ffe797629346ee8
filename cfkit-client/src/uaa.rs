//! Client for the UAA identity service.
//!
//! Only the token endpoint is used: the password grant to log in and the
//! refresh-token grant used by [`UaaAuthentication`](crate::UaaAuthentication).

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use http::HeaderValue;
use http::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_DIAL_TIMEOUT;
use crate::{Connection, ConnectionError, ConnectionWrapper, HttpConnection, Request, Token};

/// OAuth client the CLI authenticates as.
pub const DEFAULT_CLIENT_ID: &str = "cf";

/// Settings for a [`UaaClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UaaConfig {
    /// Base URL of the identity service (the `token_endpoint` of `/v2/info`).
    pub url: String,
    pub skip_ssl_validation: bool,
    pub dial_timeout: Duration,
    pub client_id: String,
    pub client_secret: String,
}

impl UaaConfig {
    /// Settings for `url` using the `cf` client with an empty secret.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            skip_ssl_validation: false,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: String::new(),
        }
    }

    pub fn skip_ssl_validation(mut self, skip: bool) -> Self {
        self.skip_ssl_validation = skip;
        self
    }

    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Authenticate as a different OAuth client.
    pub fn client(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.client_id = id.into();
        self.client_secret = secret.into();
        self
    }
}

#[derive(Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
enum Grant<'a> {
    Password {
        username: &'a str,
        password: &'a str,
    },
    RefreshToken {
        refresh_token: &'a str,
    },
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Client for the identity service token endpoint.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct UaaClient {
    connection: Arc<dyn Connection>,
    url: String,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for UaaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UaaClient")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl UaaClient {
    /// Create a client with its own HTTP connection.
    pub fn new(config: UaaConfig) -> Result<Self, ConnectionError> {
        let connection = HttpConnection::builder()
            .skip_ssl_validation(config.skip_ssl_validation)
            .dial_timeout(config.dial_timeout)
            .build()?;
        Ok(Self {
            connection: Arc::new(connection),
            url: config.url.trim_end_matches('/').to_string(),
            client_id: config.client_id,
            client_secret: config.client_secret,
        })
    }

    /// Create a client sending through `connection` with the default OAuth client.
    pub fn with_connection(url: impl Into<String>, connection: Arc<dyn Connection>) -> Self {
        let url = url.into();
        Self {
            connection,
            url: url.trim_end_matches('/').to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: String::new(),
        }
    }

    /// Wrap the client's connection, e.g. with a request logger.
    pub fn wrap_connection(&mut self, wrapper: impl ConnectionWrapper) {
        self.connection = wrapper.wrap(self.connection.clone());
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Log in with a username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Token, ConnectionError> {
        tracing::debug!(url = %self.url, "requesting token with password grant");
        self.request_token(&Grant::Password { username, password }, None)
            .await
    }

    /// Exchange `refresh_token` for a new access token.
    ///
    /// When the response carries no refresh token, the one passed in is kept.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<Token, ConnectionError> {
        tracing::debug!(url = %self.url, "refreshing access token");
        self.request_token(&Grant::RefreshToken { refresh_token }, Some(refresh_token))
            .await
    }

    async fn request_token(
        &self,
        grant: &Grant<'_>,
        previous_refresh_token: Option<&str>,
    ) -> Result<Token, ConnectionError> {
        let credentials = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        let basic = HeaderValue::from_str(&format!("Basic {}", credentials))
            .map_err(|e| ConnectionError::InvalidRequest(e.to_string()))?;

        let request = Request::post(format!("{}/oauth/token", self.url))
            .form(grant)?
            .accept_json()
            .header(AUTHORIZATION, basic);

        let response: TokenResponse = self.connection.make(request).await?.json()?;
        if response.access_token.is_empty() {
            return Err(ConnectionError::InvalidResponse(
                "token response has no access_token".into(),
            ));
        }

        let refresh_token = response
            .refresh_token
            .filter(|token| !token.is_empty())
            .or_else(|| previous_refresh_token.map(str::to_string))
            .unwrap_or_default();

        let mut token = Token::new(response.access_token, refresh_token);
        if let Some(seconds) = response.expires_in {
            token = token.with_expiry(Utc::now() + chrono::Duration::seconds(seconds));
        }
        Ok(token)
    }
}
