//! Bearer-token authentication with transparent refresh.
//!
//! The wrapper owns the `Authorization` header of every request it forwards.
//! A 401 from the inner connection triggers one refresh of the access token
//! and one replay of the request; the replay's outcome is returned as-is.
//!
//! Refreshes are single-flight. The token state lives behind an async mutex
//! together with a generation counter that is bumped on every successful
//! refresh. Every call also notes how many token attempts had settled when it
//! started. A caller that saw a 401 while holding generation `g` takes the
//! lock and then:
//!
//! - uses the current token if the generation has moved past `g`;
//! - returns the recorded failure if an attempt failed while it was in flight;
//! - otherwise refreshes itself, while later callers wait on the lock.
//!
//! A failure is only shared with calls that overlapped the failed attempt.
//! Calls started afterwards try again.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use http::HeaderValue;
use http::header::AUTHORIZATION;
use tokio::sync::Mutex;

use crate::{
    BoxFuture, Connection, ConnectionError, ConnectionWrapper, FailureKind, Request, Response,
    Token, TokenStore, UaaClient,
};

/// Attaches the access token from a [`TokenStore`] and refreshes it through
/// a [`UaaClient`].
///
/// Refreshed tokens are written back to the store.
#[derive(Clone)]
pub struct UaaAuthentication {
    uaa: UaaClient,
    store: Arc<dyn TokenStore>,
}

impl UaaAuthentication {
    pub fn new(uaa: UaaClient, store: Arc<dyn TokenStore>) -> Self {
        Self { uaa, store }
    }
}

impl std::fmt::Debug for UaaAuthentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UaaAuthentication")
            .field("uaa", &self.uaa)
            .finish_non_exhaustive()
    }
}

impl ConnectionWrapper for UaaAuthentication {
    fn wrap(self, inner: Arc<dyn Connection>) -> Arc<dyn Connection> {
        Arc::new(UaaAuthenticationConnection {
            inner,
            uaa: self.uaa,
            store: self.store,
            state: Mutex::new(AuthState::default()),
            attempts: AtomicU64::new(0),
        })
    }
}

#[derive(Default)]
struct AuthState {
    /// Whether `token` has been read from the store.
    loaded: bool,
    /// Bumped whenever a new token is obtained.
    generation: u64,
    token: Option<Token>,
    /// The last failed attempt to obtain a token, by attempt number.
    failure: Option<(u64, ConnectionError)>,
}

impl AuthState {
    fn access_token(&self) -> Option<&Token> {
        self.token.as_ref().filter(|t| t.has_access_token())
    }

    /// The failure of attempt `attempt`, if that attempt failed.
    fn failure_for(&self, attempt: u64) -> Option<ConnectionError> {
        match &self.failure {
            Some((failed, err)) if *failed == attempt => Some(err.clone()),
            _ => None,
        }
    }
}

struct UaaAuthenticationConnection {
    inner: Arc<dyn Connection>,
    uaa: UaaClient,
    store: Arc<dyn TokenStore>,
    state: Mutex<AuthState>,
    /// Number of settled attempts to obtain a token.
    attempts: AtomicU64,
}

/// What a call saw when it picked its token.
#[derive(Clone, Copy, Debug)]
struct Observed {
    generation: u64,
    attempt: u64,
}

impl UaaAuthenticationConnection {
    async fn send(&self, request: Request) -> Result<Response, ConnectionError> {
        let (observed, token) = self.current_token().await?;

        let first = authorize(request.clone(), token.as_ref())?;
        match self.inner.make(first).await {
            Err(e) if e.kind() == FailureKind::Unauthorized => {
                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    generation = observed.generation,
                    "request unauthorized, refreshing access token"
                );
                let token = self.refresh(observed).await?;
                let replay = authorize(request, Some(&token))?;
                self.inner.make(replay).await
            }
            result => result,
        }
    }

    /// The token to send with, obtaining one first when needed.
    async fn current_token(&self) -> Result<(Observed, Option<Token>), ConnectionError> {
        // Read before locking so callers queued behind an attempt share its failure.
        let attempt = self.attempts.load(Ordering::SeqCst);
        let mut state = self.state.lock().await;
        if !state.loaded {
            state.token = self.store.load_token();
            state.loaded = true;
        }
        let observed = Observed {
            generation: state.generation,
            attempt,
        };

        if let Some(token) = state.access_token() {
            if !token.is_expired() {
                return Ok((observed, Some(token.clone())));
            }
            if let Some(err) = state.failure_for(attempt) {
                return Err(err);
            }
            tracing::debug!("access token expired, refreshing");
            let token = self.refresh_locked(&mut state).await?;
            return Ok((self.observed(&state), Some(token)));
        }

        let Some(credentials) = self.store.credentials() else {
            // Sent without a token; a 401 goes through the refresh path.
            return Ok((observed, None));
        };
        if let Some(err) = state.failure_for(attempt) {
            return Err(err);
        }

        tracing::debug!(username = %credentials.username, "no access token, logging in");
        let result = self
            .uaa
            .authenticate(&credentials.username, &credentials.password)
            .await
            .map_err(|e| ConnectionError::Authentication(format!("login failed: {}", e)));
        let token = self.settle(&mut state, result)?;
        Ok((self.observed(&state), Some(token)))
    }

    fn observed(&self, state: &AuthState) -> Observed {
        Observed {
            generation: state.generation,
            attempt: self.attempts.load(Ordering::SeqCst),
        }
    }

    /// Obtain a token newer than the one `observed`.
    async fn refresh(&self, observed: Observed) -> Result<Token, ConnectionError> {
        let mut state = self.state.lock().await;

        if state.generation != observed.generation {
            if let Some(token) = state.access_token() {
                tracing::debug!(generation = state.generation, "using token refreshed concurrently");
                return Ok(token.clone());
            }
        }
        if let Some(err) = state.failure_for(observed.attempt) {
            return Err(err);
        }

        self.refresh_locked(&mut state).await
    }

    async fn refresh_locked(&self, state: &mut AuthState) -> Result<Token, ConnectionError> {
        let refresh_token = state
            .token
            .as_ref()
            .filter(|t| t.has_refresh_token())
            .map(|t| t.refresh_token.clone());

        let result = match refresh_token {
            Some(refresh_token) => self
                .uaa
                .refresh_access_token(&refresh_token)
                .await
                .map_err(|e| {
                    ConnectionError::Authentication(format!("refreshing access token failed: {}", e))
                }),
            None => Err(ConnectionError::Authentication(
                "not logged in: no refresh token available".into(),
            )),
        };

        self.settle(state, result)
    }

    /// Record the outcome of obtaining a token. Called with the lock held.
    fn settle(
        &self,
        state: &mut AuthState,
        result: Result<Token, ConnectionError>,
    ) -> Result<Token, ConnectionError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        match result {
            Ok(token) => {
                if let Err(e) = self.store.save_token(&token) {
                    tracing::warn!(error = %e, "failed to save refreshed token");
                }
                state.generation += 1;
                state.token = Some(token.clone());
                state.failure = None;
                Ok(token)
            }
            Err(err) => {
                tracing::debug!(error = %err, attempt, "obtaining token failed");
                state.failure = Some((attempt, err.clone()));
                Err(err)
            }
        }
    }
}

impl Connection for UaaAuthenticationConnection {
    fn make(&self, request: Request) -> BoxFuture<'_, Result<Response, ConnectionError>> {
        Box::pin(self.send(request))
    }
}

/// Replace the `Authorization` header with `token`, or drop it without one.
fn authorize(mut request: Request, token: Option<&Token>) -> Result<Request, ConnectionError> {
    match token {
        Some(token) => {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
                .map_err(|_| {
                    ConnectionError::Authentication("access token is not a valid header value".into())
                })?;
            request.headers.insert(AUTHORIZATION, value);
        }
        None => {
            request.headers.remove(AUTHORIZATION);
        }
    }
    Ok(request)
}
