//! Configuration modules for the client.
//!
//! This module contains connection-level configuration:
//! - [`TargetSettings`]: API URL, TLS policy and dial timeout
//! - [`RetryPolicy`]: Retry bound and backoff for [`RetryRequest`](crate::RetryRequest)

mod retry;
mod target;

pub use retry::{Backoff, InvalidRetryPolicy, RetryPolicy, defaults};
pub use target::{DEFAULT_DIAL_TIMEOUT, TargetSettings};
