//! Diagnostic tracing of requests and responses.
//!
//! [`RequestLogger`] hands a [`LoggedRequest`] to its output before the
//! request is sent and a [`LoggedResponse`] after an HTTP response arrives.
//! Both are already redacted: the `Authorization` header and token or
//! password fields in bodies are replaced by [`PRIVATE_DATA`].
//!
//! Each request or response is one block. Blocks are written between
//! [`RequestLoggerOutput::start`] and [`RequestLoggerOutput::stop`] while the
//! logger holds a lock shared by its clones, so concurrent calls never
//! interleave inside a block.
//!
//! Output failures never fail the request. The first failure of a logger is
//! reported through [`RequestLoggerOutput::handle_internal_error`]; later
//! ones are dropped.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;

use crate::{BoxFuture, Connection, ConnectionError, ConnectionWrapper, Request, Response};

/// Replacement text for redacted values.
pub const PRIVATE_DATA: &str = "[PRIVATE DATA HIDDEN]";

/// Body fields whose values are never written to a sink.
const SENSITIVE_FIELDS: &[&str] = &[
    "access_token",
    "refresh_token",
    "token",
    "password",
    "client_secret",
];

/// Destination for traced requests.
///
/// Implemented by the CLI for the terminal and for log files.
pub trait RequestLoggerOutput: Send + Sync {
    /// Called before a block is written.
    fn start(&self) -> io::Result<()> {
        Ok(())
    }

    /// Called after a block is written, even when writing it failed.
    fn stop(&self) -> io::Result<()> {
        Ok(())
    }

    /// Write an outgoing request.
    fn display_request(&self, request: &LoggedRequest) -> io::Result<()>;

    /// Write a received response.
    fn display_response(&self, response: &LoggedResponse) -> io::Result<()>;

    /// Called with the first write failure of a logger.
    fn handle_internal_error(&self, _err: &io::Error) {}
}

/// A request body prepared for display.
#[derive(Clone, Debug, PartialEq)]
pub enum LoggedBody {
    Empty,
    /// A JSON document with sensitive fields redacted.
    Json(Value),
    /// Text, including form bodies with sensitive parameters redacted.
    Text(String),
    /// Non-UTF-8 content of the given length.
    Binary(usize),
}

impl LoggedBody {
    /// Prepare `body` for display based on its content type.
    pub fn new(headers: &HeaderMap, body: &[u8]) -> Self {
        if body.is_empty() {
            return LoggedBody::Empty;
        }

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if let Ok(mut value) = serde_json::from_slice::<Value>(body) {
            redact_json(&mut value);
            return LoggedBody::Json(value);
        }

        match std::str::from_utf8(body) {
            Ok(text) if content_type.starts_with("application/x-www-form-urlencoded") => {
                LoggedBody::Text(redact_form(text))
            }
            Ok(text) => LoggedBody::Text(text.to_string()),
            Err(_) => LoggedBody::Binary(body.len()),
        }
    }
}

impl fmt::Display for LoggedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggedBody::Empty => Ok(()),
            LoggedBody::Json(value) => {
                let pretty = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
                f.write_str(&pretty)
            }
            LoggedBody::Text(text) => f.write_str(text),
            LoggedBody::Binary(len) => write!(f, "[BINARY DATA: {} bytes]", len),
        }
    }
}

fn is_sensitive(name: &str) -> bool {
    SENSITIVE_FIELDS
        .iter()
        .any(|field| field.eq_ignore_ascii_case(name))
}

fn redact_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                if is_sensitive(key) {
                    *value = Value::String(PRIVATE_DATA.to_string());
                } else {
                    redact_json(value);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json),
        _ => {}
    }
}

fn redact_form(body: &str) -> String {
    body.split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive(key) => format!("{}={}", key, PRIVATE_DATA),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Header names in `Title-Case`, sorted, with `Authorization` redacted.
fn display_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    let mut lines: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            let shown = if name == AUTHORIZATION {
                PRIVATE_DATA.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (title_case(name.as_str()), shown)
        })
        .collect();
    lines.sort();
    lines
}

fn title_case(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn write_headers(f: &mut fmt::Formatter<'_>, headers: &[(String, String)]) -> fmt::Result {
    for (name, value) in headers {
        writeln!(f, "{}: {}", name, value)?;
    }
    Ok(())
}

/// A redacted snapshot of an outgoing request.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggedRequest {
    pub time: DateTime<Utc>,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: LoggedBody,
}

impl LoggedRequest {
    fn new(request: &Request) -> Self {
        Self {
            time: Utc::now(),
            method: request.method.clone(),
            url: request.url.clone(),
            headers: display_headers(&request.headers),
            body: LoggedBody::new(
                &request.headers,
                request.body.as_deref().unwrap_or_default(),
            ),
        }
    }

    /// Host and path-with-query of the URL.
    fn host_and_path(&self) -> (String, String) {
        match self.url.parse::<http::Uri>() {
            Ok(uri) => {
                let host = uri
                    .authority()
                    .map(|a| a.as_str().to_string())
                    .unwrap_or_default();
                let path = uri
                    .path_and_query()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_else(|| "/".to_string());
                (host, path)
            }
            Err(_) => (String::new(), self.url.clone()),
        }
    }
}

impl fmt::Display for LoggedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (host, path) = self.host_and_path();
        writeln!(
            f,
            "REQUEST: [{}]",
            self.time.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
        writeln!(f, "{} {} HTTP/1.1", self.method, path)?;
        writeln!(f, "Host: {}", host)?;
        write_headers(f, &self.headers)?;
        if self.body != LoggedBody::Empty {
            writeln!(f)?;
            writeln!(f, "{}", self.body)?;
        }
        Ok(())
    }
}

/// A redacted snapshot of a received response.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggedResponse {
    pub time: DateTime<Utc>,
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: LoggedBody,
}

impl LoggedResponse {
    fn new(status: StatusCode, headers: &HeaderMap, body: &Bytes) -> Self {
        Self {
            time: Utc::now(),
            status,
            headers: display_headers(headers),
            body: LoggedBody::new(headers, body),
        }
    }
}

impl fmt::Display for LoggedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "RESPONSE: [{}]",
            self.time.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
        writeln!(f, "HTTP/1.1 {}", self.status)?;
        write_headers(f, &self.headers)?;
        if self.body != LoggedBody::Empty {
            writeln!(f)?;
            writeln!(f, "{}", self.body)?;
        }
        Ok(())
    }
}

/// Traces every request and response to a [`RequestLoggerOutput`].
///
/// Several loggers may be stacked, one per sink; each observes the same
/// request and response.
#[derive(Clone)]
pub struct RequestLogger {
    output: Arc<dyn RequestLoggerOutput>,
    block: Arc<Mutex<()>>,
}

impl RequestLogger {
    pub fn new(output: impl RequestLoggerOutput + 'static) -> Self {
        Self::from_shared(Arc::new(output))
    }

    /// Create a logger writing to a shared output.
    ///
    /// Clone the logger rather than calling this twice with the same output,
    /// so that both copies serialize their blocks on one lock.
    pub fn from_shared(output: Arc<dyn RequestLoggerOutput>) -> Self {
        Self {
            output,
            block: Arc::new(Mutex::new(())),
        }
    }
}

impl std::fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLogger").finish_non_exhaustive()
    }
}

impl ConnectionWrapper for RequestLogger {
    fn wrap(self, inner: Arc<dyn Connection>) -> Arc<dyn Connection> {
        Arc::new(RequestLoggerConnection {
            inner,
            output: self.output,
            block: self.block,
            reported: AtomicBool::new(false),
        })
    }
}

struct RequestLoggerConnection {
    inner: Arc<dyn Connection>,
    output: Arc<dyn RequestLoggerOutput>,
    block: Arc<Mutex<()>>,
    reported: AtomicBool,
}

impl RequestLoggerConnection {
    fn report(&self, result: io::Result<()>) {
        let Err(err) = result else {
            return;
        };
        if !self.reported.swap(true, Ordering::SeqCst) {
            tracing::warn!(error = %err, "request logger output failed");
            self.output.handle_internal_error(&err);
        }
    }

    /// Write one block between `start` and `stop` under the block lock.
    fn write_block(&self, display: impl FnOnce(&dyn RequestLoggerOutput) -> io::Result<()>) {
        let result = {
            let _guard = self.block.lock().unwrap_or_else(PoisonError::into_inner);
            self.output.start().and_then(|()| {
                let written = display(self.output.as_ref());
                let stopped = self.output.stop();
                written.and(stopped)
            })
        };
        self.report(result);
    }

    async fn send(&self, request: Request) -> Result<Response, ConnectionError> {
        let logged = LoggedRequest::new(&request);
        self.write_block(|output| output.display_request(&logged));

        let result = self.inner.make(request).await;

        let logged = match &result {
            Ok(response) => Some(LoggedResponse::new(
                response.status,
                &response.headers,
                &response.body,
            )),
            Err(ConnectionError::Status(err)) => {
                Some(LoggedResponse::new(err.status, &err.headers, &err.body))
            }
            Err(_) => None,
        };
        if let Some(logged) = logged {
            self.write_block(|output| output.display_response(&logged));
        }

        result
    }
}

impl Connection for RequestLoggerConnection {
    fn make(&self, request: Request) -> BoxFuture<'_, Result<Response, ConnectionError>> {
        Box::pin(self.send(request))
    }
}
