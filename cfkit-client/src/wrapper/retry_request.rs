//! Resending of transient failures.

use std::sync::Arc;

use crate::config::{InvalidRetryPolicy, RetryPolicy};
use crate::{BoxFuture, Connection, ConnectionError, ConnectionWrapper, Request, Response};

/// Resends a request whose failure is transient.
///
/// Only failures where [`ConnectionError::is_retryable`] holds are resent:
/// network errors, timeouts and 5xx responses. Client errors and
/// authentication failures are returned after a single attempt. When every
/// attempt fails, the last failure is returned.
///
/// The request is resent as-is, so this wrapper should only sit in front of
/// operations that are safe to repeat.
///
/// # Example
///
/// ```ignore
/// use cfkit_client::{RetryPolicy, RetryRequest};
/// use std::time::Duration;
///
/// // Two immediate resends
/// client.wrap_connection(RetryRequest::new(2));
///
/// // Three resends with backoff
/// let policy = RetryPolicy::new()
///     .max_retries(3)
///     .base_delay(Duration::from_millis(200));
/// client.wrap_connection(RetryRequest::with_policy(policy)?);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetryRequest {
    policy: RetryPolicy,
}

impl RetryRequest {
    /// Resend up to `max_retries` times after the first attempt, without delay.
    pub fn new(max_retries: u32) -> Self {
        Self {
            policy: RetryPolicy::new().max_retries(max_retries),
        }
    }

    /// Resend according to `policy`.
    pub fn with_policy(policy: RetryPolicy) -> Result<Self, InvalidRetryPolicy> {
        policy.validate()?;
        Ok(Self { policy })
    }

    /// The policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl ConnectionWrapper for RetryRequest {
    fn wrap(self, inner: Arc<dyn Connection>) -> Arc<dyn Connection> {
        Arc::new(RetryRequestConnection {
            inner,
            policy: self.policy,
        })
    }
}

struct RetryRequestConnection {
    inner: Arc<dyn Connection>,
    policy: RetryPolicy,
}

impl RetryRequestConnection {
    async fn send(&self, request: Request) -> Result<Response, ConnectionError> {
        let mut backoff = self.policy.backoff();

        loop {
            match self.inner.make(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && backoff.can_retry() => {
                    let delay = backoff.next_delay();
                    tracing::debug!(
                        error = %e,
                        method = %request.method,
                        url = %request.url,
                        attempt = backoff.attempts(),
                        delay_ms = delay.as_millis(),
                        "retrying after transient error"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Connection for RetryRequestConnection {
    fn make(&self, request: Request) -> BoxFuture<'_, Result<Response, ConnectionError>> {
        Box::pin(self.send(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeConnection, ok, status};
    use std::time::Duration;

    fn wrap(fake: &Arc<FakeConnection>, retry: RetryRequest) -> Arc<dyn Connection> {
        retry.wrap(fake.clone())
    }

    #[tokio::test]
    async fn test_success_is_passed_through() {
        let fake = FakeConnection::always(Ok(ok(r#"{"a":1}"#)));
        let connection = wrap(&fake, RetryRequest::new(2));

        let response = connection
            .make(Request::get("http://localhost/v2/info"))
            .await
            .unwrap();

        assert_eq!(response, ok(r#"{"a":1}"#));
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_server_failure_exhausts_bound() {
        let fake = FakeConnection::always(Err(status(503, "")));
        let connection = wrap(&fake, RetryRequest::new(2));

        let err = connection
            .make(Request::get("http://localhost/v2/info"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(http::StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(fake.calls(), 3);
    }

    #[tokio::test]
    async fn test_returns_last_failure() {
        let fake = FakeConnection::sequence(vec![
            Err(ConnectionError::Transport("reset".into())),
            Err(ConnectionError::Timeout("dial".into())),
            Err(status(502, "")),
        ]);
        let connection = wrap(&fake, RetryRequest::new(2));

        let err = connection
            .make(Request::get("http://localhost/v2/info"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(http::StatusCode::BAD_GATEWAY));
        assert_eq!(fake.calls(), 3);
    }

    #[tokio::test]
    async fn test_succeeds_within_bound() {
        let fake = FakeConnection::sequence(vec![
            Err(ConnectionError::Transport("reset".into())),
            Err(status(500, "")),
            Ok(ok("{}")),
        ]);
        let connection = wrap(&fake, RetryRequest::new(2));

        let response = connection
            .make(Request::get("http://localhost/v2/info"))
            .await
            .unwrap();

        assert_eq!(response.status, http::StatusCode::OK);
        assert_eq!(fake.calls(), 3);
    }

    #[tokio::test]
    async fn test_client_failure_is_not_retried() {
        let fake = FakeConnection::always(Err(status(400, "")));
        let connection = wrap(&fake, RetryRequest::new(2));

        let err = connection
            .make(Request::get("http://localhost/v2/info"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(http::StatusCode::BAD_REQUEST));
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_authentication_failures_are_not_retried() {
        let fake = FakeConnection::always(Err(status(401, "")));
        let connection = wrap(&fake, RetryRequest::new(2));
        assert!(connection.make(Request::get("http://localhost")).await.is_err());
        assert_eq!(fake.calls(), 1);

        let fake = FakeConnection::always(Err(ConnectionError::Authentication("expired".into())));
        let connection = wrap(&fake, RetryRequest::new(2));
        assert!(connection.make(Request::get("http://localhost")).await.is_err());
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_each_attempt_sends_the_same_request() {
        let fake = FakeConnection::always(Err(status(500, "")));
        let connection = wrap(&fake, RetryRequest::new(2));

        let request = Request::delete("http://localhost/v2/security_groups/abc")
            .try_header("X-Custom", "1")
            .unwrap();
        let _ = connection.make(request.clone()).await;

        let seen = fake.requests();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|r| *r == request));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_policy_sleeps_between_attempts() {
        let policy = RetryPolicy::new()
            .max_retries(2)
            .base_delay(Duration::from_secs(1))
            .multiplier(2.0);
        let fake = FakeConnection::always(Err(status(500, "")));
        let connection = wrap(&fake, RetryRequest::with_policy(policy).unwrap());

        let started = tokio::time::Instant::now();
        let _ = connection.make(Request::get("http://localhost")).await;

        assert_eq!(fake.calls(), 3);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[test]
    fn test_with_policy_rejects_invalid() {
        let policy = RetryPolicy::new().jitter(2.0);
        assert!(RetryRequest::with_policy(policy).is_err());
    }

    #[test]
    fn test_default_bound() {
        assert_eq!(RetryRequest::default().policy().max_retries, 2);
    }
}
