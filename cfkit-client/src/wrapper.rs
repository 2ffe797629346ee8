//! Connection wrappers.
//!
//! Each wrapper is a small configuration value implementing
//! [`ConnectionWrapper`](crate::ConnectionWrapper). Wrapping produces a
//! connection that holds the inner connection and adds one behavior:
//!
//! - [`RequestLogger`]: writes request/response pairs to a diagnostic sink
//! - [`UaaAuthentication`]: attaches the bearer token and refreshes it once on 401
//! - [`RetryRequest`]: resends transient failures up to a bound
//!
//! The assembler applies them in that order, so `RetryRequest` ends up
//! outermost.

mod request_logger;
mod retry_request;
mod uaa_authentication;

pub use request_logger::{
    LoggedBody, LoggedRequest, LoggedResponse, RequestLogger, RequestLoggerOutput, PRIVATE_DATA,
};
pub use retry_request::RetryRequest;
pub use uaa_authentication::UaaAuthentication;
