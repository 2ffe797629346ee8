//! Access tokens and the store they are shared through.
//!
//! The [`TokenStore`] is the single piece of shared mutable state in the
//! pipeline. It is passed explicitly as an `Arc<dyn TokenStore>` to both the
//! [`UaaAuthentication`](crate::UaaAuthentication) wrapper and whatever
//! persists the CLI configuration.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An OAuth token pair issued by the identity service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer token sent with every API request (without the `bearer ` prefix).
    pub access_token: String,
    /// Long-lived token used to obtain a new access token.
    pub refresh_token: String,
    /// When the access token expires, if the identity service said so.
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// Create a token without a known expiry.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expiry: None,
        }
    }

    /// Set the expiry.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Returns true if the expiry is known and has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }

    /// Returns true if the expiry is known and has passed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub(crate) fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub(crate) fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

/// Username and password for the password grant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Failure persisting a token.
#[derive(Debug, thiserror::Error)]
#[error("failed to save token: {0}")]
pub struct StoreError(pub String);

/// Shared storage for the current token.
///
/// Implementations must be safe to call from concurrent requests;
/// [`save_token`](TokenStore::save_token) replaces the whole token atomically.
pub trait TokenStore: Send + Sync {
    /// The current token, if any.
    fn load_token(&self) -> Option<Token>;

    /// Replace the current token.
    fn save_token(&self, token: &Token) -> Result<(), StoreError>;

    /// Credentials for obtaining a token when none is stored.
    fn credentials(&self) -> Option<Credentials> {
        None
    }
}

/// A [`TokenStore`] that keeps the token in memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<Token>>,
    credentials: Option<Credentials>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `token`.
    pub fn with_token(token: Token) -> Self {
        Self {
            token: RwLock::new(Some(token)),
            credentials: None,
        }
    }

    /// Set the credentials offered to the authentication wrapper.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

impl TokenStore for MemoryTokenStore {
    fn load_token(&self) -> Option<Token> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn save_token(&self, token: &Token) -> Result<(), StoreError> {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.clone());
        Ok(())
    }

    fn credentials(&self) -> Option<Credentials> {
        self.credentials.clone()
    }
}
