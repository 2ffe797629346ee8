//! Scripted connections for unit tests.

use std::future::Future;
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::{BoxFuture, Connection, ConnectionError, Request, Response};

type Handler =
    Box<dyn Fn(usize, Request) -> BoxFuture<'static, Result<Response, ConnectionError>> + Send + Sync>;

/// A connection whose answers come from a closure.
///
/// The closure receives the zero-based call index and the request. Every
/// request is recorded.
pub(crate) struct FakeConnection {
    handler: Handler,
    calls: AtomicUsize,
    requests: Mutex<Vec<Request>>,
}

impl FakeConnection {
    pub(crate) fn new<F, Fut>(handler: F) -> Arc<Self>
    where
        F: Fn(usize, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, ConnectionError>> + Send + 'static,
    {
        Arc::new(Self {
            handler: Box::new(move |index, request| Box::pin(handler(index, request))),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer every call with a clone of `result`.
    pub(crate) fn always(result: Result<Response, ConnectionError>) -> Arc<Self> {
        Self::new(move |_, _| {
            let result = result.clone();
            async move { result }
        })
    }

    /// Answer calls with `results` in order, repeating the last one.
    pub(crate) fn sequence(results: Vec<Result<Response, ConnectionError>>) -> Arc<Self> {
        Self::new(move |index, _| {
            let result = results
                .get(index)
                .or_else(|| results.last())
                .cloned()
                .unwrap_or_else(|| Ok(ok("")));
            async move { result }
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

impl Connection for FakeConnection {
    fn make(&self, request: Request) -> BoxFuture<'_, Result<Response, ConnectionError>> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(index, request)
    }
}

/// A 200 response with a JSON body.
pub(crate) fn ok(body: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("content-type", "application/json".parse().unwrap());
    Response::new(StatusCode::OK, headers, Bytes::from(body.to_string()))
}

/// A status failure as the transport would report it.
pub(crate) fn status(code: u16, body: &str) -> ConnectionError {
    ConnectionError::status(
        StatusCode::from_u16(code).unwrap(),
        HeaderMap::new(),
        Bytes::from(body.to_string()),
    )
}

/// A token endpoint response body.
pub(crate) fn token_body(access_token: &str, refresh_token: &str) -> String {
    format!(
        r#"{{"access_token":"{}","refresh_token":"{}","token_type":"bearer","expires_in":599}}"#,
        access_token, refresh_token
    )
}
