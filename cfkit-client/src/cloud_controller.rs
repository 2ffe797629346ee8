//! Typed client for the cloud controller v2 API.
//!
//! [`ClientBuilder::target`] connects to a target, reads `/v2/info` and
//! returns a [`CloudControllerClient`]. Wrappers added with
//! [`CloudControllerClient::wrap_connection`] sit between the typed
//! operations and the HTTP transport.

mod client;
mod info;
mod resource;
mod security_group;

pub use client::{ClientBuilder, CloudControllerClient};
pub use info::ApiInfo;
pub use resource::Filter;
pub use security_group::{SecurityGroup, SecurityGroupRule};
